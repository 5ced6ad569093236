//! C3 Content Extractor (spec.md §4.3): turns a `FileRecord` into an
//! `IndexedDocument` — title/tags/body for text formats, metadata-only for
//! binary categories, with oversized files truncated rather than skipped.

use crate::category::binary_viewer_hint;
use crate::model::{FileRecord, FileType, IndexedDocument, ViewerHint};
use lazy_regex::LazyRegex;
use regex::Regex;

mod lazy_regex {
    use regex::Regex;
    use std::sync::OnceLock;

    /// A `Regex` compiled once on first use rather than on every call.
    pub struct LazyRegex(OnceLock<Regex>, &'static str);

    impl LazyRegex {
        pub const fn new(pattern: &'static str) -> Self {
            Self(OnceLock::new(), pattern)
        }

        pub fn get(&self) -> &Regex {
            self.0.get_or_init(|| Regex::new(self.1).expect("static regex"))
        }
    }
}

static FRONTMATTER_RE: LazyRegex = LazyRegex::new(r"(?s)\A---\s*\n(.*?)\n---\s*\n?");
static H1_RE: LazyRegex = LazyRegex::new(r"(?m)^#\s+(.+?)\s*$");

/// Extract an `IndexedDocument` for `record` under `space_name`, reading at
/// most `max_text_file_bytes` of file content for text-bearing categories.
pub async fn extract(
    record: &FileRecord,
    space_name: &str,
    max_text_file_bytes: usize,
) -> std::io::Result<IndexedDocument> {
    let viewer_hint = binary_viewer_hint(record.file_type);

    if let Some(hint) = viewer_hint {
        return Ok(metadata_only_document(record, space_name, hint));
    }

    let raw = tokio::fs::read(&record.absolute_path).await?;
    let truncated = raw.len() > max_text_file_bytes;
    let slice = if truncated { &raw[..max_text_file_bytes] } else { &raw[..] };

    if record.file_type == FileType::Other {
        // Only a category with no known extension: trust UTF-8 validity,
        // not a lossy decode, to decide text vs. binary (spec.md §4.3).
        return match String::from_utf8(slice.to_vec()) {
            Ok(text) => Ok(IndexedDocument {
                doc_key: record.doc_key(),
                space_id: record.space_id,
                space_name: space_name.to_string(),
                title: fallback_title(&record.relative_path),
                relative_path: record.relative_path.clone(),
                tags: Vec::new(),
                body: text,
                file_type: record.file_type,
                viewer: ViewerHint::Text,
                size_bytes: record.size_bytes,
                modified_at: record.modified_at,
            }),
            Err(_) => Ok(metadata_only_document(record, space_name, ViewerHint::Binary)),
        };
    }

    let text = String::from_utf8_lossy(slice).into_owned();

    let (title, tags, body, viewer) = match record.file_type {
        FileType::Document if record.extension == "md" => extract_markdown(&record.relative_path, &text),
        FileType::Code => (fallback_title(&record.relative_path), Vec::new(), text, ViewerHint::Code),
        _ => (fallback_title(&record.relative_path), Vec::new(), text, ViewerHint::Text),
    };

    Ok(IndexedDocument {
        doc_key: record.doc_key(),
        space_id: record.space_id,
        space_name: space_name.to_string(),
        title,
        relative_path: record.relative_path.clone(),
        tags,
        body,
        file_type: record.file_type,
        viewer,
        size_bytes: record.size_bytes,
        modified_at: record.modified_at,
    })
}

fn metadata_only_document(record: &FileRecord, space_name: &str, viewer: ViewerHint) -> IndexedDocument {
    IndexedDocument {
        doc_key: record.doc_key(),
        space_id: record.space_id,
        space_name: space_name.to_string(),
        title: fallback_title(&record.relative_path),
        relative_path: record.relative_path.clone(),
        tags: Vec::new(),
        body: String::new(),
        file_type: record.file_type,
        viewer,
        size_bytes: record.size_bytes,
        modified_at: record.modified_at,
    }
}

fn fallback_title(relative_path: &str) -> String {
    relative_path
        .rsplit('/')
        .next()
        .unwrap_or(relative_path)
        .to_string()
}

/// Parse a markdown file's YAML-ish frontmatter `tags:` line and first `#`
/// heading as the title, per spec.md §4.3; falls back to the filename.
fn extract_markdown(relative_path: &str, text: &str) -> (String, Vec<String>, String, ViewerHint) {
    let (frontmatter, rest) = split_frontmatter(text);
    let tags = frontmatter.as_deref().map(parse_tags_line).unwrap_or_default();

    let title = H1_RE
        .get()
        .captures(rest)
        .map(|c| c[1].trim().to_string())
        .unwrap_or_else(|| fallback_title(relative_path));

    (title, tags, rest.to_string(), ViewerHint::Markdown)
}

fn split_frontmatter(text: &str) -> (Option<String>, &str) {
    if let Some(m) = FRONTMATTER_RE.get().find(text) {
        let block = &text[m.start()..m.end()];
        let rest = &text[m.end()..];
        return (Some(block.to_string()), rest);
    }
    (None, text)
}

fn parse_tags_line(frontmatter: &str) -> Vec<String> {
    let tags_re = tags_line_regex();
    let Some(captures) = tags_re.captures(frontmatter) else {
        return Vec::new();
    };
    captures[1]
        .split(',')
        .map(|t| t.trim().trim_matches(|c| c == '[' || c == ']' || c == '"').to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

fn tags_line_regex() -> Regex {
    Regex::new(r"(?m)^tags:\s*(.+)$").expect("static regex")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FileType;
    use chrono::Utc;
    use std::path::PathBuf;

    fn record(ext: &str, file_type: FileType, relative_path: &str, path: PathBuf) -> FileRecord {
        FileRecord {
            space_id: 1,
            relative_path: relative_path.to_string(),
            absolute_path: path,
            size_bytes: 0,
            modified_at: Utc::now(),
            extension: ext.to_string(),
            file_type,
        }
    }

    #[tokio::test]
    async fn extracts_title_and_tags_from_markdown() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("note.md");
        tokio::fs::write(&path, "---\ntags: rust, indexing\n---\n# Hello World\n\nBody text.\n")
            .await
            .unwrap();
        let rec = record("md", FileType::Document, "note.md", path);
        let doc = extract(&rec, "Space", 2 * 1024 * 1024).await.unwrap();
        assert_eq!(doc.title, "Hello World");
        assert_eq!(doc.tags, vec!["rust".to_string(), "indexing".to_string()]);
        assert!(doc.body.contains("Body text."));
        assert_eq!(doc.viewer, ViewerHint::Markdown);
    }

    #[tokio::test]
    async fn markdown_without_heading_falls_back_to_filename() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.md");
        tokio::fs::write(&path, "just text, no heading\n").await.unwrap();
        let rec = record("md", FileType::Document, "plain.md", path);
        let doc = extract(&rec, "Space", 2 * 1024 * 1024).await.unwrap();
        assert_eq!(doc.title, "plain.md");
    }

    #[tokio::test]
    async fn binary_categories_are_metadata_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("photo.png");
        tokio::fs::write(&path, [0u8, 1, 2, 3]).await.unwrap();
        let rec = record("png", FileType::Image, "photo.png", path);
        let doc = extract(&rec, "Space", 2 * 1024 * 1024).await.unwrap();
        assert!(doc.body.is_empty());
        assert_eq!(doc.viewer, ViewerHint::Image);
    }

    #[tokio::test]
    async fn other_category_with_invalid_utf8_is_treated_as_binary() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mystery.dat");
        tokio::fs::write(&path, [0xff, 0xfe, 0x00, 0x01]).await.unwrap();
        let rec = record("dat", FileType::Other, "mystery.dat", path);
        let doc = extract(&rec, "Space", 2 * 1024 * 1024).await.unwrap();
        assert!(doc.body.is_empty());
        assert_eq!(doc.viewer, ViewerHint::Binary);
    }

    #[tokio::test]
    async fn other_category_with_valid_utf8_is_treated_as_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.cfg");
        tokio::fs::write(&path, "setting = value\n").await.unwrap();
        let rec = record("cfg", FileType::Other, "notes.cfg", path);
        let doc = extract(&rec, "Space", 2 * 1024 * 1024).await.unwrap();
        assert_eq!(doc.body, "setting = value\n");
        assert_eq!(doc.viewer, ViewerHint::Text);
    }

    #[tokio::test]
    async fn oversized_text_file_is_truncated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.txt");
        let content = "x".repeat(100);
        tokio::fs::write(&path, &content).await.unwrap();
        let rec = record("txt", FileType::Document, "big.txt", path);
        let doc = extract(&rec, "Space", 10).await.unwrap();
        assert_eq!(doc.body.len(), 10);
    }
}
