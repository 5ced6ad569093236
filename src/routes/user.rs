use super::UserId;
use crate::error::{AppError, AppResult};
use crate::model::{UserActivity, ViewMode};
use crate::state::AppState;
use axum::{extract::State, Json};
use serde::Deserialize;
use serde_json::{json, Value};

/// `GET /user/activity` — spec.md §4.7/§6.
pub async fn get_activity(State(state): State<AppState>, UserId(user_id): UserId) -> Json<UserActivity> {
    Json(state.activity.get_activity(&user_id))
}

#[derive(Debug, Deserialize)]
pub struct VisitRequest {
    #[serde(rename = "spaceName")]
    space_name: String,
    path: String,
    #[serde(default)]
    title: String,
}

/// `POST /user/visit` — spec.md §4.7.
pub async fn record_visit(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Json(body): Json<VisitRequest>,
) -> AppResult<Json<Value>> {
    state.activity.record_visit(&user_id, &body.space_name, &body.path, &body.title)?;
    Ok(Json(json!({ "success": true })))
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StarAction {
    Star,
    Unstar,
}

#[derive(Debug, Deserialize)]
pub struct StarRequest {
    #[serde(rename = "spaceName")]
    space_name: String,
    path: String,
    #[serde(default)]
    title: String,
    action: StarAction,
}

/// `POST /user/star` — spec.md §4.7: star is idempotent, unstar removes the
/// matching entry. The store itself only knows how to toggle, so a request
/// whose `action` doesn't match the current state is a no-op.
pub async fn toggle_star(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Json(body): Json<StarRequest>,
) -> AppResult<Json<Value>> {
    let currently_starred = state
        .activity
        .get_activity(&user_id)
        .starred
        .iter()
        .any(|s| s.space_name == body.space_name && s.path == body.path);

    let wants_starred = body.action == StarAction::Star;
    if currently_starred == wants_starred {
        return Ok(Json(json!({ "success": true, "starred": currently_starred })));
    }

    let now_starred = state.activity.toggle_star(&user_id, &body.space_name, &body.path, &body.title)?;
    Ok(Json(json!({ "success": true, "starred": now_starred })))
}

/// `GET /user/folder-view-preferences` — spec.md §4.7: `spaceId -> (folderPath -> viewMode)`.
pub async fn get_folder_view_preferences(
    State(state): State<AppState>,
    UserId(user_id): UserId,
) -> Json<std::collections::HashMap<String, std::collections::HashMap<String, ViewMode>>> {
    Json(state.activity.get_preferences(&user_id).folder_view_preferences)
}

#[derive(Debug, Deserialize)]
pub struct FolderViewRequest {
    #[serde(rename = "spaceId")]
    space_id: String,
    #[serde(rename = "folderPath", default)]
    folder_path: String,
    #[serde(rename = "viewMode")]
    view_mode: String,
}

/// `POST /user/folder-view-preference` — spec.md §4.7.
pub async fn set_folder_view_preference(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Json(body): Json<FolderViewRequest>,
) -> AppResult<Json<Value>> {
    let mode = ViewMode::parse(&body.view_mode)
        .ok_or_else(|| AppError::ValidationFailed(format!("invalid viewMode: {}", body.view_mode)))?;
    state.activity.set_folder_view(&user_id, &body.space_id, &body.folder_path, mode)?;
    Ok(Json(json!({ "success": true })))
}
