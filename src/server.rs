use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
    routing::{get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::routes;
use crate::state::AppState;

const API_PREFIX: &str = "/applications/wiki/api";

pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    let public_routes = Router::new().route("/health", get(routes::health::health_check));

    let api_routes = Router::new()
        .route("/search", get(routes::search::search))
        .route("/search/suggestions", get(routes::search::suggestions))
        .route("/search/stats", get(routes::search::stats))
        .route("/search/rebuild", post(routes::search::rebuild))
        .route("/spaces", get(routes::spaces::list_spaces).post(routes::spaces::create_space))
        .route("/spaces/{id}/folders", get(routes::spaces::folders))
        .route("/spaces/{id}/templates", get(routes::spaces::templates))
        .route("/user/activity", get(routes::user::get_activity))
        .route("/user/visit", post(routes::user::record_visit))
        .route("/user/star", post(routes::user::toggle_star))
        .route(
            "/user/folder-view-preferences",
            get(routes::user::get_folder_view_preferences),
        )
        .route(
            "/user/folder-view-preference",
            post(routes::user::set_folder_view_preference),
        )
        .route(
            "/settings/ai",
            get(routes::settings::get_ai_settings).post(routes::settings::set_ai_settings),
        )
        .route("/settings/ai/test", post(routes::settings::test_ai_settings))
        .layer(axum::middleware::from_fn_with_state(state.clone(), auth_middleware));

    public_routes
        .nest(API_PREFIX, api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
        .with_state(state)
}

/// Validates `Authorization: Bearer <token>` against `WIKI_AUTH_TOKEN`. Auth
/// is skipped entirely when no token is configured — the HTTP routing/auth
/// layer proper is out of scope per spec.md §1, so this is a minimal gate,
/// not the production auth boundary.
async fn auth_middleware(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, (StatusCode, axum::Json<serde_json::Value>)> {
    let Some(expected) = state.config.auth_token.as_deref() else {
        return Ok(next.run(req).await);
    };

    let provided = req
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match provided {
        Some(token) if token == expected => Ok(next.run(req).await),
        _ => {
            tracing::warn!("rejecting request: missing or invalid bearer token");
            Err((
                StatusCode::UNAUTHORIZED,
                axum::Json(serde_json::json!({ "error": "unauthorized", "status": 401 })),
            ))
        }
    }
}
