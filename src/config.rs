use serde::{Deserialize, Serialize};

/// Maximum allowed length for search queries and suggestion prefixes (characters).
pub const MAX_SEARCH_QUERY_LENGTH: usize = 1000;

/// Default bound on `maxResults` for `GET /search` when the caller omits it.
pub const DEFAULT_MAX_RESULTS: usize = 20;

/// Per-user recent-list cap (§4.7/§8: `recentList.length <= 20`).
pub const RECENT_LIST_CAP: usize = 20;

/// Suggestion n-gram length range, `[2, 4]` — see DESIGN.md Open Question decisions.
pub const SUGGEST_NGRAM_MIN: usize = 2;
pub const SUGGEST_NGRAM_MAX: usize = 4;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub listen_addr: String,
    pub data_dir: String,
    pub spaces_root_dir: String,
    pub max_text_file_bytes: usize,
    pub extract_workers: usize,
    pub extract_queue_capacity: usize,
    pub max_results_default: usize,
    pub recent_list_cap: usize,
    pub rebuild_interval_secs: u64,
    pub aicontext_interval_secs: u64,
    pub llm_endpoint: Option<String>,
    pub llm_timeout_secs: u64,
    pub auth_token: Option<String>,
    pub strict_startup: bool,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let data_dir = std::env::var("WIKI_DATA_DIR").unwrap_or_else(|_| {
            dirs::data_local_dir()
                .map(|d| d.join("wiki-index-core").to_string_lossy().to_string())
                .unwrap_or_else(|| ".wiki-data".to_string())
        });

        let spaces_root_dir = std::env::var("WIKI_SPACES_ROOT")
            .unwrap_or_else(|_| std::path::Path::new(&data_dir).join("spaces").to_string_lossy().to_string());

        Self {
            listen_addr: std::env::var("WIKI_LISTEN_ADDR")
                .unwrap_or_else(|_| "127.0.0.1:8787".to_string()),
            data_dir,
            spaces_root_dir,
            max_text_file_bytes: env_usize("WIKI_MAX_TEXT_FILE_BYTES", 2 * 1024 * 1024),
            extract_workers: env_usize("WIKI_EXTRACT_WORKERS", 4),
            extract_queue_capacity: env_usize("WIKI_EXTRACT_QUEUE_CAPACITY", 64),
            max_results_default: env_usize("WIKI_MAX_RESULTS_DEFAULT", DEFAULT_MAX_RESULTS),
            recent_list_cap: env_usize("WIKI_RECENT_LIST_CAP", RECENT_LIST_CAP),
            rebuild_interval_secs: env_u64("WIKI_REBUILD_INTERVAL_SECS", 0),
            aicontext_interval_secs: env_u64("WIKI_AICONTEXT_INTERVAL_SECS", 0),
            llm_endpoint: std::env::var("WIKI_LLM_ENDPOINT").ok(),
            llm_timeout_secs: env_u64("WIKI_LLM_TIMEOUT_SECS", 60),
            auth_token: std::env::var("WIKI_AUTH_TOKEN").ok().filter(|t| !t.is_empty()),
            strict_startup: std::env::var("WIKI_STRICT_STARTUP").as_deref() == Ok("1"),
        }
    }
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}
