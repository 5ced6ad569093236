//! C2 Filesystem Walker (spec.md §4.2): deterministic, bounded-concurrency
//! recursive walk of a space root, feeding discovered files to a fixed pool
//! of C3 extractor workers over a bounded channel.

use crate::category::classify_extension;
use crate::model::FileRecord;
use chrono::{DateTime, Utc};
use ignore::WalkBuilder;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Directories skipped during the walk regardless of gitignore rules,
/// except the ones the index itself maintains content under.
fn is_skipped_dir(name: &str) -> bool {
    name.starts_with('.') && name != ".templates" && name != ".aicontext"
}

/// Walk `root` deterministically (lexicographic per directory), classify
/// each file by extension, and send a `FileRecord` per entry into `tx`.
///
/// Bounded by `tx`'s capacity: a slow extractor pool backpressures the walk
/// itself rather than the walker racing ahead and buffering unboundedly.
pub async fn walk_space(
    space_id: u64,
    root: Arc<std::path::PathBuf>,
    tx: mpsc::Sender<FileRecord>,
) -> usize {
    let count = Arc::new(AtomicUsize::new(0));
    let root_for_blocking = root.clone();
    let count_clone = count.clone();

    let entries = tokio::task::spawn_blocking(move || collect_entries(&root_for_blocking, space_id))
        .await
        .unwrap_or_default();

    for entry in entries {
        if tx.send(entry).await.is_err() {
            break;
        }
        count_clone.fetch_add(1, Ordering::Relaxed);
    }

    count.load(Ordering::Relaxed)
}

/// Synchronous traversal run on a blocking thread: `ignore::WalkBuilder`
/// gives us a sort_by hook for determinism. Gitignore-style filtering is
/// disabled outright — spec.md §4.2's skip rules are exhaustively
/// dot-directories, non-regular files, and root-escaping symlinks, with no
/// `.gitignore` semantics — and symlinks are followed so a link whose
/// target stays within the space root is indexed rather than skipped.
fn collect_entries(root: &Path, space_id: u64) -> Vec<FileRecord> {
    let mut out = Vec::new();

    let walker = WalkBuilder::new(root)
        .hidden(false)
        .parents(false)
        .ignore(false)
        .git_ignore(false)
        .git_global(false)
        .git_exclude(false)
        .follow_links(true)
        .sort_by_file_name(|a, b| a.cmp(b))
        .filter_entry(|entry| {
            if entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
                let name = entry.file_name().to_string_lossy();
                return !is_skipped_dir(&name);
            }
            true
        })
        .build();

    for result in walker {
        let Ok(entry) = result else { continue };
        let Some(file_type) = entry.file_type() else { continue };
        if !file_type.is_file() {
            continue;
        }

        let path = entry.path();
        // With symlinks followed, a file can be reached through a symlinked
        // ancestor directory without being a symlink itself, so containment
        // is checked against the resolved path unconditionally, not just
        // when the leaf entry is a symlink.
        match dunce::canonicalize(path) {
            Ok(resolved) if resolved.starts_with(root) => {}
            _ => continue,
        }

        let Ok(metadata) = entry.metadata() else { continue };
        let relative_path = match path.strip_prefix(root) {
            Ok(p) => p.to_string_lossy().replace('\\', "/"),
            Err(_) => continue,
        };

        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        let file_type = classify_extension(&extension);
        let modified_at: DateTime<Utc> = metadata
            .modified()
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());

        out.push(FileRecord {
            space_id,
            relative_path,
            absolute_path: path.to_path_buf(),
            size_bytes: metadata.len(),
            modified_at,
            extension,
            file_type,
        });
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn walks_nested_files_deterministically() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("b")).unwrap();
        std::fs::write(dir.path().join("a.md"), "# A").unwrap();
        std::fs::write(dir.path().join("b/c.md"), "# C").unwrap();

        let (tx, mut rx) = mpsc::channel(8);
        let root = Arc::new(dir.path().to_path_buf());
        let handle = tokio::spawn(walk_space(1, root, tx));

        let mut seen = Vec::new();
        while let Some(record) = rx.recv().await {
            seen.push(record.relative_path);
        }
        let total = handle.await.unwrap();
        assert_eq!(total, 2);
        seen.sort();
        assert_eq!(seen, vec!["a.md".to_string(), "b/c.md".to_string()]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn follows_in_root_symlinks_but_skips_escaping_ones() {
        let dir = tempfile::tempdir().unwrap();
        let outside = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("real.md"), "# Real").unwrap();
        std::fs::write(outside.path().join("secret.md"), "# Secret").unwrap();

        let root = dunce::canonicalize(dir.path()).unwrap();
        std::os::unix::fs::symlink(root.join("real.md"), root.join("linked.md")).unwrap();
        std::os::unix::fs::symlink(outside.path().join("secret.md"), root.join("escaping.md")).unwrap();

        let (tx, mut rx) = mpsc::channel(8);
        let root = Arc::new(root);
        tokio::spawn(walk_space(1, root, tx));

        let mut seen = Vec::new();
        while let Some(record) = rx.recv().await {
            seen.push(record.relative_path);
        }
        seen.sort();
        assert_eq!(seen, vec!["linked.md".to_string(), "real.md".to_string()]);
    }

    #[tokio::test]
    async fn skips_hidden_dirs_except_templates_and_aicontext() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(".git")).unwrap();
        std::fs::write(dir.path().join(".git/HEAD"), "ref: refs/heads/main").unwrap();
        std::fs::create_dir_all(dir.path().join(".templates")).unwrap();
        std::fs::write(dir.path().join(".templates/sample.md"), "# sample").unwrap();

        let (tx, mut rx) = mpsc::channel(8);
        let root = Arc::new(dir.path().to_path_buf());
        tokio::spawn(walk_space(1, root, tx));

        let mut seen = Vec::new();
        while let Some(record) = rx.recv().await {
            seen.push(record.relative_path);
        }
        assert_eq!(seen, vec![".templates/sample.md".to_string()]);
    }
}
