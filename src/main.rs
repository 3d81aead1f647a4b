use anyhow::Context;
use clap::Parser;
use ollama_shim::{
    ProxyConfig,
    client::BackendClient,
    handler::{AppState, router},
};
use std::{path::PathBuf, sync::Arc};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Ollama-compatible API in front of an OpenAI-compatible backend
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// TOML configuration file; environment variables still override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address, e.g. 0.0.0.0:11434
    #[arg(short, long)]
    listen: Option<String>,

    /// Backend base URL, e.g. http://localhost:1234
    #[arg(short, long)]
    backend_url: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => ProxyConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => ProxyConfig::from_env()?,
    };
    if let Some(listen) = args.listen {
        config.server.listen_addr = listen;
    }
    if let Some(url) = args.backend_url {
        config.backend.base_url = url;
    }
    config.validate()?;

    // RUST_LOG wins over the configured level
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.logging.filter_directive())),
        )
        .init();

    info!("Starting Ollama shim...");
    info!("  Listen: {}", config.server.listen_addr);
    info!("  Backend: {}", config.backend.chat_completions_url());
    info!(
        "  Timeouts: api={}s response={}s",
        config.backend.api_timeout_secs, config.backend.response_timeout_secs
    );
    if config.backend.always_stream {
        info!("  Non-streaming requests will be drained from upstream streams");
    }

    let client = BackendClient::new(&config.backend)?;
    if client.check_health().await {
        info!("Backend at {} is reachable", config.backend.base_url);
    } else {
        warn!(
            "Backend at {} is not reachable yet; requests will fail until it is",
            config.backend.base_url
        );
    }

    let state = Arc::new(AppState::new(Arc::new(client), config.clone()));
    let app = router(Arc::clone(&state));

    let listener = tokio::net::TcpListener::bind(&config.server.listen_addr)
        .await
        .with_context(|| format!("binding {}", config.server.listen_addr))?;
    info!("Proxy ready on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("{}", state.metrics.snapshot());
    info!("Ollama shim shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => warn!("Failed to install SIGTERM handler: {}", e),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("Shutdown signal received, draining connections");
}
