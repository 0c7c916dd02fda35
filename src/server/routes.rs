//! HTTP route handlers for the summarization API.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::services::ServeDir;
use tracing::{debug, error, warn};

use crate::llm::ChatProxyError;
use crate::pipeline::errors::NO_TEXT_MESSAGE;
use crate::pipeline::{ErrorKind, PipelineError};

use super::state::AppState;

/// Message returned when the chat upstream fails.
const CHAT_UPSTREAM_MESSAGE: &str = "Upstream chat service error";

/// Create the API router with all routes.
///
/// Unmatched paths fall back to the static directory.
pub fn create_router(state: Arc<AppState>) -> Router {
    let static_files = ServeDir::new(&state.static_dir);

    Router::new()
        .route("/health", get(health_check))
        .route("/summarize", post(summarize))
        .route("/api/chat", post(chat_completion))
        .fallback_service(static_files)
        .with_state(state)
}

/// Health check endpoint.
async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "precis",
        "version": env!("CARGO_PKG_VERSION"),
        "model": state.pipeline.model_name(),
    }))
}

/// Summarization request.
#[derive(Debug, Deserialize)]
pub struct SummarizeRequest {
    /// Text to summarize. Absent and `null` are both treated as no text.
    #[serde(default)]
    pub text: Option<String>,
    /// Word budget per chunk.
    pub max_tokens: Option<usize>,
    /// Maximum summary length in words.
    pub max_length: Option<u32>,
    /// Minimum summary length in words.
    pub min_length: Option<u32>,
}

/// Summarization response.
#[derive(Debug, Serialize)]
pub struct SummarizeResponse {
    /// The summary, or the no-text notice for blank input.
    pub summary: Option<String>,
    /// Safe description of a failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SummarizeResponse {
    fn from_error(err: &PipelineError) -> Self {
        match err {
            PipelineError::NoText => Self {
                summary: Some(NO_TEXT_MESSAGE.to_string()),
                error: None,
            },
            other => Self {
                summary: None,
                error: Some(other.public_message()),
            },
        }
    }
}

/// Status code for a pipeline failure.
fn status_for(err: &PipelineError) -> StatusCode {
    match err.kind() {
        ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
        ErrorKind::Backend if err.is_timeout() => StatusCode::GATEWAY_TIMEOUT,
        ErrorKind::Backend | ErrorKind::Configuration => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Handle summarization requests.
async fn summarize(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SummarizeRequest>,
) -> (StatusCode, Json<SummarizeResponse>) {
    let params = state.pipeline.default_params().with_overrides(
        request.max_tokens,
        request.max_length,
        request.min_length,
    );

    let text = request.text.as_deref().unwrap_or_default();

    match state.pipeline.summarize_with(text, params).await {
        Ok(summary) => (
            StatusCode::OK,
            Json(SummarizeResponse {
                summary: Some(summary),
                error: None,
            }),
        ),
        Err(err) => {
            if err.is_client_error() {
                warn!("Rejected summarize request: {err}");
            } else {
                error!(error = ?err, "Summarization failed: {err}");
            }
            (status_for(&err), Json(SummarizeResponse::from_error(&err)))
        }
    }
}

/// Chat proxy request.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    /// The user's question.
    #[serde(default)]
    pub message: String,
    /// Client-side profile label.
    pub profile: Option<String>,
}

/// Handle chat proxy requests.
async fn chat_completion(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<serde_json::Value>)> {
    if let Some(profile) = &request.profile {
        debug!(profile = %profile, "chat request");
    }

    state.chat.forward(&request.message).await.map(Json).map_err(|err| {
        let (status, message) = match &err {
            ChatProxyError::MissingApiKey => {
                error!("Chat proxy unavailable: {err}");
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
            ChatProxyError::EmptyMessage => (StatusCode::BAD_REQUEST, err.to_string()),
            ChatProxyError::UpstreamStatus(_) | ChatProxyError::Http(_) => {
                error!("Chat upstream error: {err}");
                (StatusCode::BAD_GATEWAY, CHAT_UPSTREAM_MESSAGE.to_string())
            }
        };
        (status, Json(serde_json::json!({ "error": message })))
    })
}
