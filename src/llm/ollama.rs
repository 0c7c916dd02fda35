//! Ollama-backed summarizer.
//!
//! Behaviour:
//! - Check whether Ollama is reachable via `GET /api/version`.
//! - Optionally spawn `ollama serve` when it is not, then wait for readiness.
//! - Preload (warm-up) the model once at startup so the first request does not pay for it.
//! - Summarize through `POST /api/generate` with greedy decoding (`temperature = 0`).

use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::pipeline::config::{BackendConfig, LengthBounds};
use crate::pipeline::errors::{PipelineError, PipelineResult};
use crate::pipeline::summarizer::{SummarizeFuture, Summarizer};

/// Default Ollama API base URL.
pub const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";

/// Target context length (tokens).
const CONTEXT_LENGTH: u32 = 8_192;

/// Warm-up prompt: minimal non-empty prompt.
const WARMUP_PROMPT: &str = " ";
/// Warm-up token budget.
const WARMUP_NUM_PREDICT: u32 = 1;

/// Startup wait settings.
const STARTUP_TIMEOUT: Duration = Duration::from_secs(15);
const STARTUP_RETRY: Duration = Duration::from_millis(250);

/// Connection timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Generated tokens allowed per summary word.
const TOKENS_PER_WORD: u32 = 2;

/// Errors produced by the Ollama client.
#[derive(Debug, Error)]
pub enum OllamaError {
    /// Failed to spawn Ollama.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Ollama did not become ready in time.
    #[error("ollama startup timed out")]
    StartupTimeout,
    /// HTTP response was not a success.
    #[error("ollama http status not ok: {0}")]
    HttpStatusNotOk(u16),
    /// The response had no generated text.
    #[error("ollama http response malformed")]
    MalformedResponse,
    /// The model returned only whitespace.
    #[error("ollama returned an empty summary")]
    EmptySummary,
    /// HTTP client error.
    #[error("http client error: {0}")]
    HttpClient(#[from] reqwest::Error),
    /// Invalid base URL.
    #[error("invalid ollama url: {0}")]
    Url(#[from] url::ParseError),
}

impl From<OllamaError> for PipelineError {
    fn from(value: OllamaError) -> Self {
        match value {
            OllamaError::Url(err) => Self::Url(err),
            other => Self::backend(other),
        }
    }
}

#[derive(Serialize)]
struct GenerateOptions {
    num_ctx: u32,
    num_predict: u32,
    temperature: f32,
    top_k: u32,
    seed: u32,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    keep_alive: &'a str,
    options: GenerateOptions,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: Option<String>,
}

/// Summarizer talking to an Ollama server over HTTP.
pub struct OllamaSummarizer {
    client: Client,
    base_url: Url,
    model: String,
    keep_alive: String,
}

impl OllamaSummarizer {
    /// Create a summarizer from backend settings.
    ///
    /// `request_timeout` bounds every HTTP request made by the client.
    ///
    /// # Errors
    /// Returns an error if the base URL is invalid or the HTTP client cannot be built.
    pub fn new(config: &BackendConfig, request_timeout: Duration) -> Result<Self, OllamaError> {
        let base_url = Url::parse(config.base_url.as_deref().unwrap_or(DEFAULT_OLLAMA_URL))?;
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(request_timeout)
            .build()?;

        Ok(Self {
            client,
            base_url,
            model: config.model.clone(),
            keep_alive: config.keep_alive.clone(),
        })
    }

    /// Base URL of the Ollama server.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Ensure Ollama is running, spawning `ollama_bin serve` if it is not.
    ///
    /// # Errors
    /// Returns an error if Ollama cannot be started or does not become ready in time.
    pub async fn ensure_server_running(&self, ollama_bin: &str) -> Result<(), OllamaError> {
        if self.is_ready().await {
            return Ok(());
        }

        info!("Ollama not reachable at {}, spawning `{ollama_bin} serve`", self.base_url);
        spawn_ollama_serve(ollama_bin)?;
        self.wait_until_ready().await
    }

    /// Load the model and keep it resident.
    ///
    /// # Errors
    /// Returns an error if the warm-up request fails.
    pub async fn preload(&self) -> Result<(), OllamaError> {
        let started = Instant::now();
        self.post_generate(WARMUP_PROMPT, WARMUP_NUM_PREDICT).await?;
        info!(
            model = %self.model,
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "model preloaded"
        );
        Ok(())
    }

    /// Whether the server answers `GET /api/version`.
    pub async fn is_ready(&self) -> bool {
        let Ok(url) = self.base_url.join("api/version") else {
            return false;
        };
        match self.client.get(url).send().await {
            Ok(response) => response.status().is_success(),
            Err(err) => {
                debug!("Ollama readiness probe failed: {err}");
                false
            }
        }
    }

    async fn wait_until_ready(&self) -> Result<(), OllamaError> {
        let deadline = Instant::now() + STARTUP_TIMEOUT;

        while Instant::now() < deadline {
            if self.is_ready().await {
                return Ok(());
            }
            tokio::time::sleep(STARTUP_RETRY).await;
        }

        Err(OllamaError::StartupTimeout)
    }

    async fn generate_summary(
        &self,
        text: &str,
        bounds: LengthBounds,
    ) -> Result<String, OllamaError> {
        let prompt = build_prompt(text, bounds);
        let num_predict = bounds.max_length.saturating_mul(TOKENS_PER_WORD);
        let response = self.post_generate(&prompt, num_predict).await?;
        let raw = response.response.ok_or(OllamaError::MalformedResponse)?;

        let summary = truncate_to_words(raw.trim(), bounds.max_length);
        if summary.is_empty() {
            return Err(OllamaError::EmptySummary);
        }
        Ok(summary)
    }

    async fn post_generate(
        &self,
        prompt: &str,
        num_predict: u32,
    ) -> Result<GenerateResponse, OllamaError> {
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            keep_alive: &self.keep_alive,
            options: GenerateOptions {
                num_ctx: CONTEXT_LENGTH,
                num_predict,
                temperature: 0.0,
                top_k: 1,
                seed: 0,
            },
        };

        let url = self.base_url.join("api/generate")?;
        let response = self.client.post(url).json(&request).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(OllamaError::HttpStatusNotOk(status.as_u16()));
        }

        Ok(response.json::<GenerateResponse>().await?)
    }
}

impl Summarizer for OllamaSummarizer {
    fn summarize<'a>(
        &'a self,
        text: &'a str,
        bounds: LengthBounds,
    ) -> SummarizeFuture<'a, PipelineResult<String>> {
        Box::pin(async move {
            self.generate_summary(text, bounds)
                .await
                .map_err(PipelineError::from)
        })
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

fn spawn_ollama_serve(ollama_bin: &str) -> Result<(), OllamaError> {
    // `ollama serve` keeps running after this process drops the handle.
    let _child = Command::new(ollama_bin)
        .arg("serve")
        .env("OLLAMA_CONTEXT_LENGTH", CONTEXT_LENGTH.to_string())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;

    Ok(())
}

/// Build the instruction sent to the model for one chunk.
fn build_prompt(text: &str, bounds: LengthBounds) -> String {
    format!(
        "Summarize the following text in {min} to {max} words. \
         Reply with the summary only, as plain prose, without preamble.\n\n\
         TEXT:\n{text}\n\nSUMMARY:",
        min = bounds.min_length,
        max = bounds.max_length,
    )
}

/// Keep at most `max_words` whitespace-delimited words.
fn truncate_to_words(text: &str, max_words: u32) -> String {
    let limit = usize::try_from(max_words).unwrap_or(usize::MAX);
    if text.split_whitespace().count() <= limit {
        return text.to_string();
    }
    text.split_whitespace()
        .take(limit)
        .collect::<Vec<_>>()
        .join(" ")
}
