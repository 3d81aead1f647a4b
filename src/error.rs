use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("Invalid request body: {0}")]
    ParseFailure(String),

    #[error("Backend service unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Primary model service unavailable at {0}")]
    BackendUnhealthy(String),

    #[error("Backend returned HTTP {status}")]
    BackendProtocol { status: u16, body: String },

    #[error("Invalid backend response: {0}")]
    InvalidBackendResponse(String),

    #[error("{0}")]
    StreamFault(String),

    #[error("This endpoint is not supported. Please use /v1/chat/completions.")]
    UnsupportedEndpoint,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, ProxyError>;

impl ProxyError {
    /// HTTP status used when this error is reported before any body was sent
    pub fn status_code(&self) -> StatusCode {
        match self {
            ProxyError::BackendUnavailable(_)
            | ProxyError::InvalidBackendResponse(_)
            | ProxyError::StreamFault(_) => StatusCode::BAD_GATEWAY,
            ProxyError::BackendUnhealthy(_) => StatusCode::SERVICE_UNAVAILABLE,
            ProxyError::BackendProtocol { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            ProxyError::UnsupportedEndpoint => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Structured `{"error": {message, code, details?}}` body
    pub fn to_body(&self) -> Value {
        let (message, details) = match self {
            ProxyError::BackendUnavailable(details) => {
                ("Backend service unavailable".to_string(), Some(details.clone()))
            }
            ProxyError::BackendUnhealthy(base_url) => (
                "Primary model service unavailable".to_string(),
                Some(format!("Check LM Studio server at {}", base_url)),
            ),
            ProxyError::BackendProtocol { status, body } => (
                format!("Backend returned HTTP {}", status),
                Some(body.clone()),
            ),
            other => (other.to_string(), None),
        };

        let code = match self {
            ProxyError::UnsupportedEndpoint => json!("unsupported_endpoint"),
            other => json!(other.status_code().as_u16()),
        };

        let mut error = json!({
            "message": message,
            "code": code,
        });
        if let Some(details) = details {
            error["details"] = json!(details);
        }

        json!({ "error": error })
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self.to_body())).into_response()
    }
}
