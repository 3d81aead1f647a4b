use axum::{body::Bytes, extract::State, response::Response};
use std::sync::Arc;
use tracing::{Instrument, debug, info, info_span};
use uuid::Uuid;

use super::{AppState, ensure_backend_healthy, forward, parse_body};
use crate::error::Result;
use crate::models::ollama::GenerateRequest;
use crate::streaming::StreamMode;
use crate::transform::transform_generate_request;

/// `POST /api/generate`
pub async fn handle_generate(State(state): State<Arc<AppState>>, body: Bytes) -> Result<Response> {
    let request_id = Uuid::new_v4();

    async move {
        state.metrics.record_request();
        let req: GenerateRequest = parse_body(&body)?;
        info!(
            "Received /api/generate request for model: {} (stream={})",
            req.model, req.stream
        );
        debug!("Full /api/generate payload: {}", String::from_utf8_lossy(&body));

        ensure_backend_healthy(&state).await?;

        forward(state, transform_generate_request(req), StreamMode::Generate).await
    }
    .instrument(info_span!("generate", %request_id))
    .await
}
