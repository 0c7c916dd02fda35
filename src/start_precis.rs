//! Startup helpers for the precis server.
//!
//! The summarization model is loaded once here and shared by every request.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;

use crate::llm::{ChatProxy, OllamaSummarizer};
use crate::pipeline::{PipelineConfig, SummarizationPipeline};
use crate::server::{self, AppState, ServerConfig};

/// Binary used when Ollama has to be spawned locally.
const OLLAMA_BIN: &str = "ollama";

/// Run the server (used by the `precis` and `precis-server` binaries).
///
/// # Returns
/// `ExitCode::SUCCESS` on graceful shutdown, `1` on failure.
#[must_use]
pub fn run() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("Starting precis v{}", env!("CARGO_PKG_VERSION"));

    let pipeline_config = match PipelineConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {e}");
            return ExitCode::from(1);
        }
    };
    let server_config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {e}");
            return ExitCode::from(1);
        }
    };

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("Failed to create runtime: {e}");
            return ExitCode::from(1);
        }
    };

    let state = match rt.block_on(initialize(pipeline_config, &server_config)) {
        Ok(state) => state,
        Err(e) => {
            tracing::error!("Failed to create state: {e:#}");
            return ExitCode::from(1);
        }
    };

    if let Err(e) = rt.block_on(server::run_server_with_shutdown(
        state,
        server_config.port,
        shutdown_signal(),
    )) {
        tracing::error!("Server error: {e}");
        return ExitCode::from(1);
    }

    tracing::info!("Server stopped");
    ExitCode::SUCCESS
}

/// Build the shared state: connect to the model backend, warm it up, wire the pipeline.
///
/// # Errors
/// Returns an error if the backend cannot be reached or the configuration is rejected.
pub async fn initialize(
    config: PipelineConfig,
    server_config: &ServerConfig,
) -> anyhow::Result<Arc<AppState>> {
    let backend = OllamaSummarizer::new(&config.backend, config.timeouts.call_timeout())
        .context("failed to build summarization backend")?;
    tracing::info!("Ollama endpoint: {}", backend.base_url());

    if config.backend.spawn_server {
        backend
            .ensure_server_running(OLLAMA_BIN)
            .await
            .context("failed to start Ollama")?;
    }

    backend
        .preload()
        .await
        .with_context(|| format!("failed to load model {}", config.backend.model))?;

    let pipeline = SummarizationPipeline::new(Arc::new(backend), config)
        .context("failed to build summarization pipeline")?;

    let chat = ChatProxy::new(
        server_config.chat_endpoint.clone(),
        server_config.openrouter_api_key.clone(),
    )
    .context("failed to build chat proxy")?;
    if !chat.is_configured() {
        tracing::warn!("OPENROUTER_API_KEY is not set; /api/chat will be unavailable");
    }

    Ok(AppState::new(pipeline, chat, server_config.static_dir.clone()))
}

/// Resolve when the process receives Ctrl+C.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
