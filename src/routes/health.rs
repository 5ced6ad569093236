use axum::Json;
use serde_json::{json, Value};
use std::sync::OnceLock;
use std::time::Instant;

static START_TIME: OnceLock<Instant> = OnceLock::new();

/// Initialize the start time (call once at startup)
pub fn init_start_time() {
    START_TIME.get_or_init(Instant::now);
}

pub async fn health_check() -> Json<Value> {
    let uptime = START_TIME.get().map(|s| s.elapsed().as_secs()).unwrap_or(0);

    Json(json!({
        "status": "ok",
        "service": "wiki-index-core",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime": uptime,
    }))
}
