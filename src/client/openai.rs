use futures::{StreamExt, TryStreamExt};
use reqwest::{Client, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::backend::{Backend, BackendFuture, BackendStream};
use crate::config::BackendConfig;
use crate::error::{ProxyError, Result};
use crate::models::openai::{ChatCompletionRequest, ChatCompletionResponse, ModelList};

/// Pooled HTTP client for an OpenAI-compatible server (LM Studio and friends).
///
/// Cloning is cheap and shares the connection pool.
#[derive(Clone)]
pub struct BackendClient {
    client: Client,
    config: BackendConfig,
    api_timeout: Duration,
}

impl BackendClient {
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let api_timeout = config.api_timeout()?;
        let response_timeout = config.response_timeout()?;

        let client = Client::builder()
            .connect_timeout(api_timeout)
            .timeout(response_timeout)
            .build()
            .map_err(|e| {
                ProxyError::InternalError(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            config: config.clone(),
            api_timeout,
        })
    }

    /// POST a JSON payload and parse the JSON response
    pub async fn post_json<T, R>(&self, url: &str, payload: &T) -> Result<R>
    where
        T: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let response = self
            .client
            .post(url)
            .json(payload)
            .send()
            .await
            .map_err(|e| connect_error(url, e))?;

        read_json(url, ensure_success(response).await?).await
    }

    /// GET a JSON document
    pub async fn get_json<R>(&self, url: &str) -> Result<R>
    where
        R: DeserializeOwned,
    {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| connect_error(url, e))?;

        read_json(url, ensure_success(response).await?).await
    }

    /// POST a JSON payload and hand back the response body as a byte stream
    pub async fn open_stream<T>(&self, url: &str, payload: &T) -> Result<BackendStream>
    where
        T: Serialize + ?Sized,
    {
        let response = self
            .client
            .post(url)
            .header("Accept", "text/event-stream")
            .json(payload)
            .send()
            .await
            .map_err(|e| connect_error(url, e))?;

        let response = ensure_success(response).await?;
        info!("Backend stream opened with status: {}", response.status());

        let stream = response
            .bytes_stream()
            .map_err(|e| ProxyError::StreamFault(format!("upstream read failed: {}", e)));
        Ok(stream.boxed())
    }

    /// Probe the model-listing endpoint within the short timeout
    pub async fn check_health(&self) -> bool {
        let url = self.config.models_url();
        match self
            .client
            .get(&url)
            .timeout(self.api_timeout)
            .send()
            .await
        {
            Ok(response) => {
                if !response.status().is_success() {
                    debug!(
                        "Health probe reached {} but got status {}",
                        url,
                        response.status()
                    );
                }
                true
            }
            Err(e) => {
                warn!("Health probe against {} failed: {}", url, e);
                false
            }
        }
    }
}

fn connect_error(url: &str, e: reqwest::Error) -> ProxyError {
    let kind = if e.is_timeout() {
        "timed out"
    } else if e.is_connect() {
        "connection failed"
    } else {
        "request failed"
    };
    ProxyError::BackendUnavailable(format!("Failed to connect to {} ({}): {}", url, kind, e))
}

async fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    warn!("Backend responded with {}: {}", status, body);

    Err(ProxyError::BackendProtocol {
        status: status.as_u16(),
        body,
    })
}

async fn read_json<R: DeserializeOwned>(url: &str, response: Response) -> Result<R> {
    let body = response
        .bytes()
        .await
        .map_err(|e| connect_error(url, e))?;

    serde_json::from_slice(&body).map_err(|e| {
        ProxyError::InvalidBackendResponse(format!(
            "{}: {} - body was: {}",
            url,
            e,
            String::from_utf8_lossy(&body)
        ))
    })
}

impl Backend for BackendClient {
    fn chat_completion(
        &self,
        request: ChatCompletionRequest,
    ) -> BackendFuture<ChatCompletionResponse> {
        let this = self.clone();
        let url = self.config.chat_completions_url();

        Box::pin(async move {
            info!("Forwarding as NON-STREAMING request to {}...", url);
            this.post_json(&url, &request).await
        })
    }

    fn stream_chat_completion(&self, request: ChatCompletionRequest) -> BackendFuture<BackendStream> {
        let this = self.clone();
        let url = self.config.chat_completions_url();

        Box::pin(async move {
            info!("Forwarding as STREAMING request to {}...", url);
            this.open_stream(&url, &request).await
        })
    }

    fn list_models(&self) -> BackendFuture<ModelList> {
        let this = self.clone();
        let url = self.config.models_url();

        Box::pin(async move {
            debug!("Calling backend for models at: {}", url);
            this.get_json(&url).await
        })
    }

    fn check_health(&self) -> Pin<Box<dyn Future<Output = bool> + Send>> {
        let this = self.clone();
        Box::pin(async move { BackendClient::check_health(&this).await })
    }

    fn base_url(&self) -> &str {
        &self.config.base_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unreachable_config() -> BackendConfig {
        BackendConfig {
            // port 9 (discard) is not expected to be listening on loopback
            base_url: "http://127.0.0.1:9".to_string(),
            api_timeout_secs: 2.0,
            response_timeout_secs: 5.0,
            always_stream: false,
        }
    }

    #[test]
    fn test_rejects_invalid_timeout() {
        let mut config = unreachable_config();
        config.api_timeout_secs = -1.0;
        assert!(matches!(
            BackendClient::new(&config),
            Err(ProxyError::ConfigError(_))
        ));
    }

    #[tokio::test]
    async fn test_health_false_when_unreachable() {
        let client = BackendClient::new(&unreachable_config()).unwrap();
        assert!(!client.check_health().await);
    }

    #[tokio::test]
    async fn test_post_json_unreachable_is_backend_unavailable() {
        let config = unreachable_config();
        let client = BackendClient::new(&config).unwrap();
        let url = config.chat_completions_url();
        let result: Result<ChatCompletionResponse> =
            client.post_json(&url, &serde_json::json!({})).await;

        assert!(matches!(result, Err(ProxyError::BackendUnavailable(_))));
    }
}
