use crate::models::ollama::{ChatRequest, GenerateRequest};
use crate::models::openai::ChatCompletionRequest;

use super::{map_options, normalize_chat_messages, normalize_generate_request};

/// Build the backend chat-completion request for an `/api/generate` call
pub fn transform_generate_request(req: GenerateRequest) -> ChatCompletionRequest {
    ChatCompletionRequest {
        messages: normalize_generate_request(
            req.prompt.as_deref(),
            req.system.as_deref(),
            req.images.as_deref(),
        ),
        params: req.options.as_ref().map(map_options).unwrap_or_default(),
        stream: req.stream,
        model: req.model,
    }
}

/// Build the backend chat-completion request for an `/api/chat` call
pub fn transform_chat_request(req: ChatRequest) -> ChatCompletionRequest {
    ChatCompletionRequest {
        messages: normalize_chat_messages(&req.messages),
        params: req.options.as_ref().map(map_options).unwrap_or_default(),
        stream: req.stream,
        model: req.model,
    }
}
