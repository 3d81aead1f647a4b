use crate::error::{ProxyError, Result};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

const LOG_LEVELS: &[&str] = &[
    "trace", "debug", "info", "warn", "warning", "error", "critical",
];

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProxyConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub logging: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:11434".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL of the OpenAI-compatible server, without the `/v1` suffix
    pub base_url: String,
    /// Bound for connecting and for health probes, in seconds
    pub api_timeout_secs: f64,
    /// Bound for a complete response (including a full stream), in seconds
    pub response_timeout_secs: f64,
    /// Serve non-streaming requests through an upstream stream that is drained
    pub always_stream: bool,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:1234".to_string(),
            api_timeout_secs: 30.0,
            response_timeout_secs: 300.0,
            always_stream: false,
        }
    }
}

impl BackendConfig {
    pub fn chat_completions_url(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/'))
    }

    pub fn models_url(&self) -> String {
        format!("{}/v1/models", self.base_url.trim_end_matches('/'))
    }

    pub fn api_timeout(&self) -> Result<Duration> {
        Duration::try_from_secs_f64(self.api_timeout_secs)
            .map_err(|e| ProxyError::ConfigError(format!("Invalid API_TIMEOUT: {}", e)))
    }

    pub fn response_timeout(&self) -> Result<Duration> {
        Duration::try_from_secs_f64(self.response_timeout_secs)
            .map_err(|e| ProxyError::ConfigError(format!("Invalid RESPONSE_TIMEOUT: {}", e)))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "INFO".to_string(),
        }
    }
}

impl LogConfig {
    /// Directive understood by `tracing_subscriber::EnvFilter`
    pub fn filter_directive(&self) -> String {
        match self.level.to_ascii_lowercase().as_str() {
            "warning" => "warn".to_string(),
            "critical" => "error".to_string(),
            other => other.to_string(),
        }
    }
}

impl ProxyConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = ProxyConfig::default();
        config.apply_env(|key| env::var(key).ok())?;
        Ok(config)
    }

    /// Load configuration from TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())
            .map_err(|e| ProxyError::ConfigError(format!("Failed to read config file: {}", e)))?;

        let mut config: ProxyConfig = toml::from_str(&contents)?;

        // Allow environment variables to override file config
        config.apply_env(|key| env::var(key).ok())?;

        Ok(config)
    }

    /// Apply overrides from a key lookup (the process environment in production)
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup("PROXY_LISTEN_ADDR") {
            self.server.listen_addr = addr;
        }
        if let Some(url) = lookup("LM_STUDIO_BASE_URL") {
            self.backend.base_url = url;
        }
        if let Some(value) = lookup("API_TIMEOUT") {
            self.backend.api_timeout_secs = parse_seconds("API_TIMEOUT", &value)?;
        }
        if let Some(value) = lookup("RESPONSE_TIMEOUT") {
            self.backend.response_timeout_secs = parse_seconds("RESPONSE_TIMEOUT", &value)?;
        }
        if let Some(value) = lookup("PROXY_ALWAYS_STREAM") {
            self.backend.always_stream = matches!(
                value.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            );
        }
        if let Some(level) = lookup("LOG_LEVEL") {
            self.logging.level = level;
        }
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.listen_addr.is_empty() {
            return Err(ProxyError::ConfigError("Listen address is empty".to_string()));
        }

        let base_url = &self.backend.base_url;
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ProxyError::ConfigError(format!(
                "Backend base URL must start with http:// or https://, got '{}'",
                base_url
            )));
        }

        let api_timeout = self.backend.api_timeout_secs;
        let response_timeout = self.backend.response_timeout_secs;
        for (name, value) in [
            ("API_TIMEOUT", api_timeout),
            ("RESPONSE_TIMEOUT", response_timeout),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ProxyError::ConfigError(format!(
                    "{} must be a positive number of seconds, got {}",
                    name, value
                )));
            }
        }
        if api_timeout > response_timeout {
            return Err(ProxyError::ConfigError(format!(
                "API_TIMEOUT ({}) must not exceed RESPONSE_TIMEOUT ({})",
                api_timeout, response_timeout
            )));
        }

        let level = self.logging.level.to_ascii_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(ProxyError::ConfigError(format!(
                "Unknown log level: {}",
                self.logging.level
            )));
        }

        Ok(())
    }
}

fn parse_seconds(name: &str, value: &str) -> Result<f64> {
    value
        .trim()
        .parse::<f64>()
        .map_err(|e| ProxyError::ConfigError(format!("Invalid {} value '{}': {}", name, value, e)))
}
