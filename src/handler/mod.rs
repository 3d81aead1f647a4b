use axum::{
    Json, Router,
    body::Body,
    http::header,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use bytes::{BufMut, Bytes, BytesMut};
use futures::{Stream, StreamExt};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::backend::{Backend, BackendStream};
use crate::config::ProxyConfig;
use crate::error::{ProxyError, Result};
use crate::metrics::ProxyMetrics;
use crate::models::openai::ChatCompletionRequest;
use crate::streaming::{StreamMode, collect_response, translate_stream};
use crate::transform::{chat_response_from_completion, generate_response_from_completion};

pub mod chat;
pub mod compat;
pub mod generate;
pub mod health;

pub const NDJSON_CONTENT_TYPE: &str = "application/x-ndjson";

pub struct AppState {
    pub backend: Arc<dyn Backend>,
    pub config: ProxyConfig,
    pub metrics: ProxyMetrics,
}

impl AppState {
    pub fn new(backend: Arc<dyn Backend>, config: ProxyConfig) -> Self {
        Self {
            backend,
            config,
            metrics: ProxyMetrics::new(),
        }
    }
}

/// The Ollama-compatible route set
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(health::handle_root))
        .route("/health", get(health::handle_health))
        .route("/api/generate", post(generate::handle_generate))
        .route("/api/chat", post(chat::handle_chat))
        .route("/api/tags", get(compat::handle_tags))
        .route("/api/pull", post(compat::handle_pull))
        .route("/api/show", post(compat::handle_show))
        .route("/v1/completions", post(compat::handle_unsupported_completions))
        .with_state(state)
}

/// Parse an inbound JSON body; malformed input is a `ParseFailure`
pub(crate) fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    serde_json::from_slice(body).map_err(|e| {
        error!("Failed to parse request body: {}", e);
        ProxyError::ParseFailure(e.to_string())
    })
}

/// Short-circuit with `BackendUnhealthy` when the probe fails
pub(crate) async fn ensure_backend_healthy(state: &AppState) -> Result<()> {
    if state.backend.check_health().await {
        return Ok(());
    }

    state.metrics.record_health_rejection();
    error!(
        "Backend at {} failed its health probe, not forwarding",
        state.backend.base_url()
    );
    Err(ProxyError::BackendUnhealthy(
        state.backend.base_url().to_string(),
    ))
}

/// Serialize one value as an NDJSON line
pub fn encode_line<T: Serialize>(value: &T) -> serde_json::Result<Bytes> {
    let mut buf = BytesMut::new().writer();
    serde_json::to_writer(&mut buf, value)?;
    let mut buf = buf.into_inner();
    buf.put_u8(b'\n');
    Ok(buf.freeze())
}

/// Stream values to the client as `application/x-ndjson`, one line per item
pub(crate) fn ndjson_response<S, T>(items: S) -> Response
where
    S: Stream<Item = T> + Send + 'static,
    T: Serialize,
{
    let body = items.map(|item| encode_line(&item).map_err(std::io::Error::other));
    ([(header::CONTENT_TYPE, NDJSON_CONTENT_TYPE)], Body::from_stream(body)).into_response()
}

async fn open_upstream(state: &AppState, request: ChatCompletionRequest) -> Result<BackendStream> {
    state
        .backend
        .stream_chat_completion(request)
        .await
        .inspect_err(|e| {
            error!("Failed to open backend stream: {}", e);
            state.metrics.record_backend_failure();
        })
}

/// Send a translated chat-completion request upstream and shape the reply
/// for `mode`.
///
/// Streaming requests are answered with NDJSON frames as they arrive.
/// Non-streaming requests use a single JSON call, or drain an upstream stream
/// when `always_stream` is configured.
pub(crate) async fn forward(
    state: Arc<AppState>,
    mut request: ChatCompletionRequest,
    mode: StreamMode,
) -> Result<Response> {
    let model = request.model.clone();
    debug!(
        "Backend payload: {}",
        serde_json::to_string(&request).unwrap_or_default()
    );

    if request.stream {
        let upstream = open_upstream(&state, request).await?;
        state.metrics.record_stream_start();

        let metrics_state = Arc::clone(&state);
        let frames = translate_stream(upstream, mode, model).inspect(move |frame| {
            if frame.is_done() {
                metrics_state.metrics.record_stream_end(frame.is_error());
            }
        });
        return Ok(ndjson_response(frames));
    }

    if state.config.backend.always_stream {
        request.stream = true;
        let upstream = open_upstream(&state, request).await?;
        let frame = collect_response(translate_stream(upstream, mode, model))
            .await
            .inspect_err(|e| {
                error!("Drained stream failed: {}", e);
                state.metrics.record_backend_failure();
            })?;
        info!("Returning drained stream as a single response.");
        return Ok(Json(frame).into_response());
    }

    let completion = state
        .backend
        .chat_completion(request)
        .await
        .inspect_err(|e| {
            error!("Backend call failed: {}", e);
            state.metrics.record_backend_failure();
        })?;
    debug!(?completion, "Received non-streaming response from backend");

    let response = match mode {
        StreamMode::Chat => Json(chat_response_from_completion(&completion, &model)?).into_response(),
        StreamMode::Generate => {
            Json(generate_response_from_completion(&completion, &model)?).into_response()
        }
    };
    info!("Returning non-streaming response to client.");
    Ok(response)
}
