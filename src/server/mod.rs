//! HTTP server for the summarization API.
//!
//! Provides REST endpoints for:
//! - Text summarization
//! - Chat completions (proxied upstream)
//! - Static files for the web client

pub mod routes;
pub mod state;

pub use routes::create_router;
pub use state::AppState;

use std::future::Future;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::pipeline::PipelineResult;
use crate::pipeline::config::parse_or;

/// Default server port.
pub const DEFAULT_PORT: u16 = 5000;

/// Default directory for static files.
pub const DEFAULT_STATIC_DIR: &str = "public";

/// Settings for the HTTP surface.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Listening port.
    pub port: u16,
    /// Directory served for unmatched routes.
    pub static_dir: PathBuf,
    /// API key for the chat proxy.
    pub openrouter_api_key: Option<String>,
    /// Chat completions endpoint.
    pub chat_endpoint: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            static_dir: PathBuf::from(DEFAULT_STATIC_DIR),
            openrouter_api_key: None,
            chat_endpoint: crate::llm::openrouter::DEFAULT_ENDPOINT.to_string(),
        }
    }
}

impl ServerConfig {
    /// Read settings from the environment, falling back to defaults.
    ///
    /// # Errors
    /// Returns an error if `PRECIS_PORT` is set but is not a valid port.
    pub fn from_env() -> PipelineResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from a variable lookup, falling back to defaults.
    ///
    /// # Errors
    /// Returns an error if `PRECIS_PORT` is set but is not a valid port.
    pub fn from_lookup<F>(lookup: F) -> PipelineResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Ok(Self {
            port: parse_or("PRECIS_PORT", lookup("PRECIS_PORT"), defaults.port)?,
            static_dir: lookup("PRECIS_STATIC_DIR").map_or(defaults.static_dir, PathBuf::from),
            openrouter_api_key: lookup("OPENROUTER_API_KEY"),
            chat_endpoint: lookup("PRECIS_CHAT_ENDPOINT").unwrap_or(defaults.chat_endpoint),
        })
    }
}

/// Start the HTTP server with graceful shutdown support.
///
/// The server will stop accepting new connections when `shutdown_signal` completes.
///
/// # Errors
/// Returns an error if the server fails to start.
pub async fn run_server_with_shutdown<F>(
    state: Arc<AppState>,
    port: u16,
    shutdown_signal: F,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
where
    F: Future<Output = ()> + Send + 'static,
{
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app: Router = create_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Precis server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_server_config() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 5000);
        assert_eq!(config.static_dir, PathBuf::from("public"));
        assert!(config.openrouter_api_key.is_none());
        assert!(config.chat_endpoint.starts_with("https://openrouter.ai/"));
    }

    #[test]
    fn test_server_config_from_lookup() {
        let config = ServerConfig::from_lookup(|key| match key {
            "PRECIS_PORT" => Some(" 8080 ".to_string()),
            "PRECIS_STATIC_DIR" => Some("site".to_string()),
            _ => None,
        })
        .unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.static_dir, PathBuf::from("site"));
        assert!(config.openrouter_api_key.is_none());
    }

    #[test]
    fn test_server_config_rejects_bad_port() {
        for raw in ["abc", "70000", "-1"] {
            let result = ServerConfig::from_lookup(|key| {
                (key == "PRECIS_PORT").then(|| raw.to_string())
            });
            let err = result.unwrap_err();
            assert_eq!(err.kind(), crate::pipeline::ErrorKind::Configuration);
            assert!(err.to_string().contains("PRECIS_PORT"));
        }
    }
}
