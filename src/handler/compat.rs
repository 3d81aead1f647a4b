//! Ollama endpoints that need no real translation: model listing, the fake
//! pull progress, the placeholder `show`, and the legacy completions stub.

use axum::{
    Json,
    body::Bytes,
    extract::State,
    response::{IntoResponse, Response},
};
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info, warn};

use super::{AppState, ensure_backend_healthy, ndjson_response};
use crate::error::{ProxyError, Result};
use crate::models::ollama::{PullStatus, ShowResponse, TagsResponse};
use crate::transform::{show_placeholder, tags_from_model_list};

/// Best-effort model name from a loosely-shaped body, for logging only
fn requested_name(body: &[u8]) -> String {
    serde_json::from_slice::<Value>(body)
        .ok()
        .and_then(|v| {
            v.get("name")
                .or_else(|| v.get("model"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| "unknown".to_string())
}

/// `GET /api/tags`
pub async fn handle_tags(State(state): State<Arc<AppState>>) -> Result<Json<TagsResponse>> {
    info!("Received /api/tags request");
    ensure_backend_healthy(&state).await?;

    let models = state.backend.list_models().await.inspect_err(|e| {
        error!("Failed to list backend models: {}", e);
        state.metrics.record_backend_failure();
    })?;

    let tags = tags_from_model_list(&models);
    info!("Returning {} models", tags.models.len());
    Ok(Json(tags))
}

/// `POST /api/pull`
///
/// Models are managed on the backend, so this always reports success without
/// contacting it.
pub async fn handle_pull(body: Bytes) -> Response {
    info!(
        "Received /api/pull request for '{}', reporting success",
        requested_name(&body)
    );

    let lines = [
        PullStatus {
            status: "pulling digest".to_string(),
        },
        PullStatus {
            status: "success".to_string(),
        },
    ];
    ndjson_response(futures::stream::iter(lines))
}

/// `POST /api/show`
pub async fn handle_show(body: Bytes) -> Json<ShowResponse> {
    info!("Received /api/show request for '{}'", requested_name(&body));
    Json(show_placeholder())
}

/// `POST /v1/completions`
pub async fn handle_unsupported_completions() -> Response {
    warn!("Rejected call to unsupported endpoint /v1/completions");
    ProxyError::UnsupportedEndpoint.into_response()
}
