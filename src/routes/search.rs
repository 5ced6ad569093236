use crate::config::MAX_SEARCH_QUERY_LENGTH;
use crate::error::{AppError, AppResult};
use crate::model::FileType;
use crate::query::{self, QueryFilters};
use crate::state::AppState;
use axum::{extract::Query, extract::State, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashSet;

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    q: String,
    #[serde(default, rename = "fileTypes")]
    file_types: Option<String>,
    #[serde(default, rename = "spaceNames")]
    space_names: Option<String>,
    #[serde(default, rename = "spaceName")]
    space_name: Option<String>,
    #[serde(default, rename = "includeContent")]
    include_content: bool,
    #[serde(default, rename = "maxResults")]
    max_results: Option<usize>,
}

/// `GET /search` — spec.md §4.6/§6. Empty `q` returns `[]`.
pub async fn search(State(state): State<AppState>, Query(params): Query<SearchParams>) -> AppResult<Json<Value>> {
    if params.q.trim().is_empty() {
        return Ok(Json(json!([])));
    }
    if params.q.chars().count() > MAX_SEARCH_QUERY_LENGTH {
        return Err(AppError::ValidationFailed(format!(
            "query exceeds maximum length of {MAX_SEARCH_QUERY_LENGTH} characters"
        )));
    }

    let mut file_types = HashSet::new();
    if let Some(raw) = &params.file_types {
        for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let parsed = FileType::parse(part)
                .ok_or_else(|| AppError::ValidationFailed(format!("unknown fileType: {part}")))?;
            file_types.insert(parsed);
        }
    }

    let mut space_names: HashSet<String> = params
        .space_names
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect();
    if let Some(single) = params.space_name {
        space_names.insert(single);
    }

    let filters = QueryFilters { space_names, file_types, include_content: params.include_content };
    let max_results = params.max_results.unwrap_or(state.config.max_results_default);

    let generation = state.index.current();
    let hits = query::search(&generation, &params.q, &filters, max_results);
    Ok(Json(serde_json::to_value(hits).map_err(AppError::Serde)?))
}

#[derive(Debug, Deserialize)]
pub struct SuggestParams {
    #[serde(default)]
    q: String,
    limit: Option<usize>,
}

/// `GET /search/suggestions` — spec.md §4.5/§6.
pub async fn suggestions(State(state): State<AppState>, Query(params): Query<SuggestParams>) -> Json<Vec<String>> {
    Json(state.suggestions.suggest(&params.q, params.limit))
}

/// `GET /search/stats` — spec.md §6.
pub async fn stats(State(state): State<AppState>) -> Json<Value> {
    let build_stats = state.build_stats.read().clone();
    Json(json!({
        "documentCount": state.index.document_count(),
        "tokenCount": state.index.token_count(),
        "spaceCount": state.spaces.all().len(),
        "lastBuildAt": build_stats.last_build_at,
        "buildDurationMs": build_stats.build_duration_ms,
    }))
}

/// `POST /search/rebuild` — spec.md §6: returns immediately, rebuild runs
/// in the background.
pub async fn rebuild(State(state): State<AppState>) -> Json<Value> {
    tokio::spawn(async move {
        if let Err(err) = state.rebuild().await {
            tracing::error!(error = %err, "background rebuild failed");
        }
    });
    Json(json!({ "success": true, "message": "rebuild started" }))
}
