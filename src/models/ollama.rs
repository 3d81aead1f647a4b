use serde::{Deserialize, Serialize};

use super::openai::{Role, StopSequences};

pub const DEFAULT_MODEL: &str = "default-model";

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

/// Ollama `/api/generate` request
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GenerateRequest {
    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default)]
    pub prompt: Option<String>,

    #[serde(default)]
    pub system: Option<String>,

    /// Base64-encoded images
    #[serde(default)]
    pub images: Option<Vec<String>>,

    #[serde(default)]
    pub options: Option<GenerationOptions>,

    #[serde(default)]
    pub stream: bool,
}

/// Ollama `/api/chat` request
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatRequest {
    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default)]
    pub messages: Vec<ChatMessage>,

    #[serde(default)]
    pub options: Option<GenerationOptions>,

    #[serde(default)]
    pub stream: bool,
}

/// Chat message with Ollama's top-level `images` list
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ChatMessage {
    pub role: Role,

    #[serde(default)]
    pub content: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
}

/// Recognized Ollama generation options; anything else is ignored
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct GenerationOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop: Option<StopSequences>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_predict: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeat_penalty: Option<f64>,
}

/// Usage counters attached to terminal frames
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct TimingStats {
    /// Nanoseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_duration: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_eval_count: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eval_count: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ResponseMessage {
    pub role: Role,
    pub content: String,
}

impl ResponseMessage {
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// `/api/chat` response body or stream frame
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ChatResponse {
    pub model: String,
    pub created_at: String,
    pub message: ResponseMessage,
    pub done: bool,

    #[serde(flatten)]
    pub stats: TimingStats,
}

/// `/api/generate` response body or stream frame
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct GenerateResponse {
    pub model: String,
    pub created_at: String,
    pub response: String,
    pub done: bool,

    /// Always empty; present on final responses for client compatibility
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Vec<i64>>,

    #[serde(flatten)]
    pub stats: TimingStats,
}

/// In-band error reported after streaming has begun
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ErrorFrame {
    pub error: String,
    pub done: bool,
}

/// One line of an outbound NDJSON stream
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum StreamFrame {
    Chat(ChatResponse),
    Generate(GenerateResponse),
    Error(ErrorFrame),
}

impl StreamFrame {
    pub fn is_done(&self) -> bool {
        match self {
            StreamFrame::Chat(frame) => frame.done,
            StreamFrame::Generate(frame) => frame.done,
            StreamFrame::Error(frame) => frame.done,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, StreamFrame::Error(_))
    }

    /// Text carried by this frame (delta for incremental frames)
    pub fn text(&self) -> &str {
        match self {
            StreamFrame::Chat(frame) => &frame.message.content,
            StreamFrame::Generate(frame) => &frame.response,
            StreamFrame::Error(_) => "",
        }
    }
}

/// `/api/pull` progress line
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct PullStatus {
    pub status: String,
}

/// `/api/tags` response body
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TagsResponse {
    pub models: Vec<ModelInfo>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ModelInfo {
    pub name: String,
    pub model: String,
    pub modified_at: String,
    pub size: u64,
    pub digest: String,
    pub details: ModelDetails,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ModelDetails {
    pub format: String,
    pub family: String,
    pub families: Option<Vec<String>>,
    pub parameter_size: String,
    pub quantization_level: String,
}

/// `/api/show` response body
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ShowResponse {
    pub modelfile: String,
    pub parameters: String,
    pub template: String,
    pub details: ModelDetails,
    pub model_info: serde_json::Map<String, serde_json::Value>,
}
