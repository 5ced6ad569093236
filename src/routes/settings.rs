use super::UserId;
use crate::model::AiSettingsUpdate;
use crate::state::AppState;
use axum::{extract::State, Json};
use serde::Serialize;
use serde_json::{json, Value};
use std::time::Instant;

#[derive(Debug, Serialize)]
pub struct AiSettingsView {
    provider: String,
    #[serde(rename = "apiKey")]
    api_key: String,
    model: String,
    temperature: f64,
    #[serde(rename = "maxTokens")]
    max_tokens: u32,
    endpoint: Option<String>,
    enabled: bool,
}

/// `GET /settings/ai` — spec.md §4.7: apiKey is masked, never the full secret.
pub async fn get_ai_settings(State(state): State<AppState>, UserId(user_id): UserId) -> Json<AiSettingsView> {
    let settings = state.activity.get_ai_settings(&user_id);
    Json(AiSettingsView {
        api_key: settings.masked_api_key(),
        provider: settings.provider,
        model: settings.model,
        temperature: settings.temperature,
        max_tokens: settings.max_tokens,
        endpoint: settings.endpoint,
        enabled: settings.enabled,
    })
}

/// `POST /settings/ai` — spec.md §4.7: a masked `apiKey` in the request
/// preserves the stored key rather than overwriting it.
pub async fn set_ai_settings(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Json(update): Json<AiSettingsUpdate>,
) -> crate::error::AppResult<Json<AiSettingsView>> {
    let settings = state.activity.set_ai_settings(&user_id, update)?;
    Ok(Json(AiSettingsView {
        api_key: settings.masked_api_key(),
        provider: settings.provider,
        model: settings.model,
        temperature: settings.temperature,
        max_tokens: settings.max_tokens,
        endpoint: settings.endpoint,
        enabled: settings.enabled,
    }))
}

/// `POST /settings/ai/test` — spec.md §6: probes the configured LLM
/// provider and reports latency, reusing the same adapter C8 calls through.
pub async fn test_ai_settings(State(state): State<AppState>, UserId(user_id): UserId) -> Json<Value> {
    let settings = state.activity.get_ai_settings(&user_id);
    let Some(endpoint) = settings.endpoint.clone() else {
        return Json(json!({ "success": false, "error": "no endpoint configured" }));
    };

    let started = Instant::now();
    match state.llm.complete(&endpoint, &settings.api_key, &settings.model, "ping").await {
        Ok(_) => Json(json!({ "success": true, "latencyMs": started.elapsed().as_millis() as u64 })),
        Err(err) => Json(json!({
            "success": false,
            "latencyMs": started.elapsed().as_millis() as u64,
            "error": err.to_string(),
        })),
    }
}
