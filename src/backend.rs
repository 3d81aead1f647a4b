use bytes::Bytes;
use futures::Stream;
use std::future::Future;
use std::pin::Pin;

use crate::error::Result;
use crate::models::openai::{ChatCompletionRequest, ChatCompletionResponse, ModelList};

/// Type alias for a streaming response body from the backend
pub type BackendStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// Type alias for the futures returned by backend calls
pub type BackendFuture<T> = Pin<Box<dyn Future<Output = Result<T>> + Send>>;

/// Trait for OpenAI-compatible chat-completion backends
///
/// Implementations must be safe to share across concurrent requests and must
/// never retry: a failed call is reported once, as a typed error.
pub trait Backend: Send + Sync {
    /// Non-streaming `POST /v1/chat/completions`
    fn chat_completion(&self, request: ChatCompletionRequest)
    -> BackendFuture<ChatCompletionResponse>;

    /// Streaming `POST /v1/chat/completions`
    ///
    /// Fails like [`Backend::chat_completion`] if the stream cannot be opened.
    /// Once opened, read errors are yielded as stream items.
    fn stream_chat_completion(&self, request: ChatCompletionRequest)
    -> BackendFuture<BackendStream>;

    /// `GET /v1/models`
    fn list_models(&self) -> BackendFuture<ModelList>;

    /// Bounded probe of the model-listing endpoint; never fails
    fn check_health(&self) -> Pin<Box<dyn Future<Output = bool> + Send>>;

    /// Base URL for diagnostics
    fn base_url(&self) -> &str;
}
