use axum::{Json, extract::State};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::info;

use super::AppState;

/// `GET /` and `HEAD /`; Ollama clients poll this to detect a live server
pub async fn handle_root() -> &'static str {
    info!("Root path '/' accessed, reporting as Ollama");
    "Ollama is running"
}

/// `GET /health`
pub async fn handle_health(State(state): State<Arc<AppState>>) -> Json<Value> {
    let backend = &state.config.backend;
    let backend_available = state.backend.check_health().await;

    Json(json!({
        "status": "ok",
        "backend_available": backend_available,
        "backend_base_url": state.backend.base_url(),
        "chat_completions_url": backend.chat_completions_url(),
        "api_timeout_seconds": backend.api_timeout_secs,
        "response_timeout_seconds": backend.response_timeout_secs,
        "always_stream": backend.always_stream,
        "metrics": state.metrics.snapshot(),
    }))
}
