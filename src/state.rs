//! Process-wide shared state: every manager wired together behind `Arc`s,
//! the way the teacher's `AppState` holds its workspace/index/watcher trio.

use crate::activity::ActivityStore;
use crate::aicontext::AiContextManager;
use crate::config::AppConfig;
use crate::datamanager::{DataManager, JsonFileDataManager};
use crate::error::{AppError, AppResult};
use crate::extractor::extract;
use crate::index::IndexManager;
use crate::llm::{HttpLlmAdapter, LlmAdapter};
use crate::model::{IndexedDocument, Space};
use crate::spaces::SpaceRegistry;
use crate::suggest::SuggestionIndex;
use crate::walker::walk_space;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex as AsyncMutex};

const DOCUMENTS_COLLECTION: &str = "documents";

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub data_manager: Arc<dyn DataManager>,
    pub spaces: Arc<SpaceRegistry>,
    pub index: Arc<IndexManager>,
    pub suggestions: Arc<SuggestionIndex>,
    pub activity: Arc<ActivityStore>,
    pub aicontext: Arc<AiContextManager>,
    pub llm: Arc<dyn LlmAdapter>,
    pub build_stats: Arc<RwLock<BuildStats>>,
}

#[derive(Debug, Clone, Default)]
pub struct BuildStats {
    pub last_build_at: Option<DateTime<Utc>>,
    pub build_duration_ms: u64,
}

pub struct RebuildSummary {
    pub previous_document_count: usize,
    pub document_count: usize,
    pub spaces_indexed: usize,
}

impl AppState {
    pub async fn new(config: AppConfig) -> AppResult<Self> {
        let data_dir = PathBuf::from(&config.data_dir);
        tokio::fs::create_dir_all(&data_dir).await.map_err(AppError::Io)?;

        let data_manager: Arc<dyn DataManager> = Arc::new(JsonFileDataManager::new(data_dir.clone())?);
        let spaces = Arc::new(SpaceRegistry::new(data_manager.clone())?);
        let index = Arc::new(IndexManager::new());
        let suggestions = Arc::new(SuggestionIndex::new());
        let activity = Arc::new(ActivityStore::new(data_manager.clone(), config.recent_list_cap)?);
        let llm: Arc<dyn LlmAdapter> = Arc::new(HttpLlmAdapter::new(config.llm_timeout_secs));
        let aicontext = Arc::new(AiContextManager::new(llm.clone(), activity.clone(), config.llm_endpoint.clone()));
        let build_stats = Arc::new(RwLock::new(BuildStats::default()));

        // Restore the durable mirror of indexed documents, if one was
        // written by a prior run, so search works before the first rebuild
        // completes (spec.md §6/SPEC_FULL.md §E).
        if let Some(documents) = data_manager.read_collection::<Vec<IndexedDocument>>(DOCUMENTS_COLLECTION)? {
            index.rebuild(documents);
            suggestions.rebuild(&index.current());
        }

        Ok(Self { config, data_manager, spaces, index, suggestions, activity, aicontext, llm, build_stats })
    }

    /// Re-walk and re-extract every visible-or-not space and atomically
    /// publish a fresh index generation (spec.md §4.4/§5).
    pub async fn rebuild(&self) -> AppResult<RebuildSummary> {
        let started = std::time::Instant::now();
        let previous_document_count = self.index.document_count();
        let spaces = self.spaces.all();

        let mut all_documents: Vec<IndexedDocument> = Vec::new();
        let mut per_space_counts = Vec::with_capacity(spaces.len());

        for space in &spaces {
            let documents = self.extract_space(space).await;
            per_space_counts.push((space.id, documents.len()));
            all_documents.extend(documents);
        }

        let document_count = all_documents.len();
        self.data_manager.write_collection(DOCUMENTS_COLLECTION, &all_documents)?;
        self.index.rebuild(all_documents);
        self.suggestions.rebuild(&self.index.current());

        for (space_id, count) in per_space_counts {
            self.spaces.set_document_count(space_id, count);
        }

        *self.build_stats.write() =
            BuildStats { last_build_at: Some(Utc::now()), build_duration_ms: started.elapsed().as_millis() as u64 };

        Ok(RebuildSummary { previous_document_count, document_count, spaces_indexed: spaces.len() })
    }

    /// Walk `space` and extract every discovered file through a bounded pool
    /// of `config.extract_workers` workers (spec.md §4.2/§4.3, §9: "walker
    /// task feeding a bounded queue of extractor workers").
    async fn extract_space(&self, space: &Space) -> Vec<IndexedDocument> {
        let (file_tx, file_rx) = mpsc::channel(self.config.extract_queue_capacity);
        let root = Arc::new(PathBuf::from(&space.root_path));
        let walk_handle = tokio::spawn(walk_space(space.id, root, file_tx));

        let file_rx = Arc::new(AsyncMutex::new(file_rx));
        let (doc_tx, mut doc_rx) = mpsc::channel::<IndexedDocument>(self.config.extract_queue_capacity);

        let mut worker_handles = Vec::with_capacity(self.config.extract_workers);
        for _ in 0..self.config.extract_workers.max(1) {
            let file_rx = file_rx.clone();
            let doc_tx = doc_tx.clone();
            let space_name = space.name.clone();
            let max_bytes = self.config.max_text_file_bytes;

            worker_handles.push(tokio::spawn(async move {
                loop {
                    let record = {
                        let mut guard = file_rx.lock().await;
                        guard.recv().await
                    };
                    let Some(record) = record else { break };
                    match extract(&record, &space_name, max_bytes).await {
                        Ok(doc) => {
                            if doc_tx.send(doc).await.is_err() {
                                break;
                            }
                        }
                        Err(err) => {
                            tracing::warn!(
                                space = %space_name,
                                path = %record.relative_path,
                                error = %err,
                                "failed to extract file"
                            );
                        }
                    }
                }
            }));
        }
        drop(doc_tx);

        let mut documents = Vec::new();
        while let Some(doc) = doc_rx.recv().await {
            documents.push(doc);
        }

        for handle in worker_handles {
            handle.await.ok();
        }
        walk_handle.await.ok();

        documents
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Visibility;

    fn test_config(data_dir: &std::path::Path, spaces_root: &std::path::Path) -> AppConfig {
        AppConfig {
            listen_addr: "127.0.0.1:0".to_string(),
            data_dir: data_dir.to_string_lossy().to_string(),
            spaces_root_dir: spaces_root.to_string_lossy().to_string(),
            max_text_file_bytes: 2 * 1024 * 1024,
            extract_workers: 2,
            extract_queue_capacity: 16,
            max_results_default: 20,
            recent_list_cap: 20,
            rebuild_interval_secs: 0,
            aicontext_interval_secs: 0,
            llm_endpoint: None,
            llm_timeout_secs: 5,
            auth_token: None,
            strict_startup: false,
        }
    }

    #[tokio::test]
    async fn indexed_documents_survive_a_restart() {
        let data_dir = tempfile::tempdir().unwrap();
        let space_root = tempfile::tempdir().unwrap();
        std::fs::write(space_root.path().join("note.md"), "# Durable\n\nsurvives a restart\n").unwrap();

        let state = AppState::new(test_config(data_dir.path(), space_root.path())).await.unwrap();
        state.spaces.create("u1", "Space".to_string(), String::new(), Visibility::Public, &space_root.path().to_string_lossy()).unwrap();
        state.rebuild().await.unwrap();
        assert_eq!(state.index.document_count(), 1);
        drop(state);

        let restarted = AppState::new(test_config(data_dir.path(), space_root.path())).await.unwrap();
        assert_eq!(restarted.index.document_count(), 1);
    }
}
