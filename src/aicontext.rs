//! C8 AI-Context Generator (spec.md §4.8): periodically summarizes each
//! folder in a space into `<folder>/.aicontext/folder-context.md` via an
//! LLM adapter. Runs on-demand or on a schedule, never concurrently with
//! itself, and skips a folder whose contents haven't changed since it was
//! last processed.

use crate::activity::ActivityStore;
use crate::error::{AppError, AppResult};
use crate::llm::LlmAdapter;
use crate::model::Space;
use crate::walker::walk_space;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

const AICONTEXT_DIRNAME: &str = ".aicontext";
const AICONTEXT_FILENAME: &str = "folder-context.md";

struct FolderFiles {
    files: Vec<String>,
    latest_modified: DateTime<Utc>,
}

pub struct AiContextManager {
    llm: Arc<dyn LlmAdapter>,
    activity: Arc<ActivityStore>,
    running: AtomicBool,
    default_endpoint: Option<String>,
    /// Last-processed timestamp per `"{spaceId}:{folder}"`, used to skip
    /// folders unchanged since their last summary (spec.md §4.8).
    last_processed: DashMap<String, DateTime<Utc>>,
}

impl AiContextManager {
    pub fn new(llm: Arc<dyn LlmAdapter>, activity: Arc<ActivityStore>, default_endpoint: Option<String>) -> Self {
        Self {
            llm,
            activity,
            running: AtomicBool::new(false),
            default_endpoint,
            last_processed: DashMap::new(),
        }
    }

    /// Generate folder context for every folder in `space`. Returns
    /// `AppError::Busy` if a generation run is already in flight — a
    /// single-flight guard, not a queue (spec.md §4.8).
    pub async fn generate_for_space(&self, space: &Space) -> AppResult<usize> {
        if self.running.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst).is_err() {
            return Err(AppError::Busy("AI context generation already in progress".to_string()));
        }
        let result = self.generate_inner(space).await;
        self.running.store(false, Ordering::SeqCst);
        result
    }

    async fn generate_inner(&self, space: &Space) -> AppResult<usize> {
        let settings = self.activity.get_ai_settings(&space.owner_id);
        if !settings.enabled {
            return Ok(0);
        }
        let endpoint = settings
            .endpoint
            .clone()
            .or_else(|| self.default_endpoint.clone())
            .ok_or_else(|| AppError::ValidationFailed("no LLM endpoint configured".to_string()))?;

        let (tx, mut rx) = mpsc::channel(64);
        let root = Arc::new(PathBuf::from(&space.root_path));
        let walk_handle = tokio::spawn(walk_space(space.id, root.clone(), tx));

        let mut by_folder: BTreeMap<String, FolderFiles> = BTreeMap::new();
        while let Some(record) = rx.recv().await {
            let folder = parent_folder(&record.relative_path);
            let entry = by_folder
                .entry(folder)
                .or_insert_with(|| FolderFiles { files: Vec::new(), latest_modified: record.modified_at });
            if record.modified_at > entry.latest_modified {
                entry.latest_modified = record.modified_at;
            }
            entry.files.push(record.relative_path.clone());
        }
        walk_handle.await.ok();

        let mut generated = 0;
        for (folder, info) in &by_folder {
            if info.files.is_empty() {
                continue;
            }

            let tracking_key = format!("{}:{folder}", space.id);
            if let Some(last) = self.last_processed.get(&tracking_key) {
                if *last >= info.latest_modified {
                    continue;
                }
            }

            let prompt = build_prompt(&space.name, folder, &info.files);
            let summary = match self.llm.complete(&endpoint, &settings.api_key, &settings.model, &prompt).await {
                Ok(summary) => summary,
                Err(err) => {
                    tracing::warn!(space = %space.name, folder, error = %err, "ai context generation failed for folder");
                    continue;
                }
            };

            if let Err(err) = write_folder_context(Path::new(&space.root_path), folder, &summary) {
                tracing::warn!(space = %space.name, folder, error = %err, "failed to write folder context file");
                continue;
            }
            self.last_processed.insert(tracking_key, info.latest_modified);
            generated += 1;
        }

        Ok(generated)
    }
}

fn parent_folder(relative_path: &str) -> String {
    match relative_path.rsplit_once('/') {
        Some((parent, _)) => parent.to_string(),
        None => String::new(),
    }
}

fn build_prompt(space_name: &str, folder: &str, files: &[String]) -> String {
    let folder_label = if folder.is_empty() { "(root)" } else { folder };
    let file_list = files.join("\n- ");
    format!(
        "Summarize the contents of folder \"{folder_label}\" in the wiki space \"{space_name}\" \
         based on its file names, for use as AI context. Files:\n- {file_list}"
    )
}

fn write_folder_context(space_root: &Path, folder: &str, summary: &str) -> std::io::Result<()> {
    let folder_dir = if folder.is_empty() { space_root.to_path_buf() } else { space_root.join(folder) };
    let context_dir = folder_dir.join(AICONTEXT_DIRNAME);
    std::fs::create_dir_all(&context_dir)?;
    std::fs::write(context_dir.join(AICONTEXT_FILENAME), summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datamanager::InMemoryDataManager;
    use crate::model::{AiSettingsUpdate, Visibility};
    use async_trait::async_trait;

    struct StubLlm;

    #[async_trait]
    impl LlmAdapter for StubLlm {
        async fn complete(&self, _endpoint: &str, _api_key: &str, _model: &str, _prompt: &str) -> AppResult<String> {
            Ok("folder summary".to_string())
        }
    }

    fn test_space(root: &Path) -> Space {
        Space {
            id: 1,
            name: "Space".to_string(),
            description: String::new(),
            root_path: root.to_string_lossy().to_string(),
            visibility: Visibility::Private,
            owner_id: "u1".to_string(),
            document_count: 0,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn writes_folder_context_file_for_each_folder() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("notes")).unwrap();
        std::fs::write(dir.path().join("notes/a.md"), "# A").unwrap();

        let activity = Arc::new(ActivityStore::new(Arc::new(InMemoryDataManager::default()), 20).unwrap());
        activity
            .set_ai_settings(
                "u1",
                AiSettingsUpdate {
                    provider: "openai".to_string(),
                    api_key: Some("key".to_string()),
                    model: "gpt".to_string(),
                    temperature: 0.7,
                    max_tokens: 256,
                    endpoint: Some("http://example".to_string()),
                    enabled: true,
                },
            )
            .unwrap();

        let manager = AiContextManager::new(Arc::new(StubLlm), activity, None);
        let space = test_space(dir.path());
        let generated = manager.generate_for_space(&space).await.unwrap();
        assert_eq!(generated, 1);
        assert!(dir.path().join("notes/.aicontext/folder-context.md").exists());
    }

    #[tokio::test]
    async fn second_run_skips_unchanged_folders() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("notes")).unwrap();
        std::fs::write(dir.path().join("notes/a.md"), "# A").unwrap();

        let activity = Arc::new(ActivityStore::new(Arc::new(InMemoryDataManager::default()), 20).unwrap());
        activity
            .set_ai_settings(
                "u1",
                AiSettingsUpdate {
                    provider: "openai".to_string(),
                    api_key: Some("key".to_string()),
                    model: "gpt".to_string(),
                    temperature: 0.7,
                    max_tokens: 256,
                    endpoint: Some("http://example".to_string()),
                    enabled: true,
                },
            )
            .unwrap();

        let manager = AiContextManager::new(Arc::new(StubLlm), activity, None);
        let space = test_space(dir.path());

        let first = manager.generate_for_space(&space).await.unwrap();
        assert_eq!(first, 1);

        let second = manager.generate_for_space(&space).await.unwrap();
        assert_eq!(second, 0, "folder untouched since last run should not be regenerated");
    }

    #[tokio::test]
    async fn disabled_settings_skip_generation() {
        let dir = tempfile::tempdir().unwrap();
        let activity = Arc::new(ActivityStore::new(Arc::new(InMemoryDataManager::default()), 20).unwrap());
        let manager = AiContextManager::new(Arc::new(StubLlm), activity, None);
        let space = test_space(dir.path());
        let generated = manager.generate_for_space(&space).await.unwrap();
        assert_eq!(generated, 0);
    }
}
