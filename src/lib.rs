//! # Ollama Shim
//!
//! An Ollama-compatible HTTP server that forwards every request to an
//! OpenAI-compatible chat-completions backend such as LM Studio.
//!
//! ## Overview
//!
//! Ollama clients speak `/api/generate`, `/api/chat` and `/api/tags`. This
//! crate translates between:
//! - **Ollama API** - what clients send and expect back (NDJSON streams)
//! - **OpenAI Chat Completions API** - what the backend understands (SSE streams)
//!
//! The proxy handles:
//! - Prompt and message normalization, including inline base64 images
//! - Generation-option mapping
//! - Incremental SSE to NDJSON stream translation
//! - A health gate in front of every forwarded call
//! - Model-list reshaping and stub `pull`/`show` endpoints
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ollama_shim::{ProxyConfig, client::BackendClient, handler::{AppState, router}};
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ProxyConfig::from_env()?;
//! config.validate()?;
//!
//! let backend = Arc::new(BackendClient::new(&config.backend)?);
//! let app = router(Arc::new(AppState::new(backend, config.clone())));
//!
//! let listener = tokio::net::TcpListener::bind(&config.server.listen_addr).await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`backend`] - Backend trait seam
//! - [`client`] - HTTP client for the OpenAI-compatible backend
//! - [`config`] - Configuration loading and validation
//! - [`error`] - Error types and their HTTP rendering
//! - [`handler`] - Axum routes
//! - [`metrics`] - Request and stream counters
//! - [`models`] - Data structures for the Ollama and OpenAI APIs
//! - [`streaming`] - SSE parser and stream translator
//! - [`transform`] - Request/response transformation logic

pub mod backend;
pub mod client;
pub mod config;
pub mod error;
pub mod handler;
pub mod metrics;
pub mod models;
pub mod streaming;
pub mod transform;

pub use config::ProxyConfig;
pub use error::{ProxyError, Result};
