use axum::{body::Bytes, extract::State, response::Response};
use std::sync::Arc;
use tracing::{Instrument, debug, info, info_span};
use uuid::Uuid;

use super::{AppState, ensure_backend_healthy, forward, parse_body};
use crate::error::Result;
use crate::models::ollama::ChatRequest;
use crate::streaming::StreamMode;
use crate::transform::transform_chat_request;

/// `POST /api/chat`
pub async fn handle_chat(State(state): State<Arc<AppState>>, body: Bytes) -> Result<Response> {
    let request_id = Uuid::new_v4();

    async move {
        state.metrics.record_request();
        let req: ChatRequest = parse_body(&body)?;
        info!(
            "Received /api/chat request for model: {} ({} messages, stream={})",
            req.model,
            req.messages.len(),
            req.stream
        );
        debug!("Full /api/chat payload: {}", String::from_utf8_lossy(&body));

        ensure_backend_healthy(&state).await?;

        forward(state, transform_chat_request(req), StreamMode::Chat).await
    }
    .instrument(info_span!("chat", %request_id))
    .await
}
