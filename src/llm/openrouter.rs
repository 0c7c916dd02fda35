//! Chat proxy that forwards a single question to an OpenRouter-compatible completion API.

use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use thiserror::Error;

/// Default chat completions endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://openrouter.ai/api/v1/chat/completions";

/// Model requested upstream.
const CHAT_MODEL: &str = "deepseek/deepseek-chat";
/// Sampling temperature requested upstream.
const CHAT_TEMPERATURE: f32 = 0.7;
/// Token budget requested upstream.
const CHAT_MAX_TOKENS: u32 = 512;
/// Upstream request timeout.
const CHAT_TIMEOUT: Duration = Duration::from_secs(30);

/// Chat proxy errors.
#[derive(Debug, Error)]
pub enum ChatProxyError {
    /// No API key configured on the server.
    #[error("Server missing OPENROUTER_API_KEY")]
    MissingApiKey,
    /// The request had no message.
    #[error("Message is required")]
    EmptyMessage,
    /// The upstream answered with a non-success status.
    #[error("upstream returned status {0}")]
    UpstreamStatus(u16),
    /// Transport or decoding failure.
    #[error("upstream request failed: {0}")]
    Http(#[from] reqwest::Error),
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

/// Forwards chat questions upstream and returns the upstream JSON untouched.
pub struct ChatProxy {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl ChatProxy {
    /// Create a proxy for `endpoint`. A blank `api_key` counts as missing.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        endpoint: impl Into<String>,
        api_key: Option<String>,
    ) -> Result<Self, ChatProxyError> {
        let client = Client::builder().timeout(CHAT_TIMEOUT).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key: api_key.filter(|key| !key.trim().is_empty()),
        })
    }

    /// Whether an API key is configured.
    #[must_use]
    pub const fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Forward `message` upstream.
    ///
    /// # Errors
    /// Returns `MissingApiKey` or `EmptyMessage` before any network call, and upstream
    /// errors otherwise.
    pub async fn forward(&self, message: &str) -> Result<serde_json::Value, ChatProxyError> {
        let api_key = self.api_key.as_deref().ok_or(ChatProxyError::MissingApiKey)?;
        if message.trim().is_empty() {
            return Err(ChatProxyError::EmptyMessage);
        }

        let request = ChatCompletionRequest {
            model: CHAT_MODEL,
            messages: vec![ChatMessage {
                role: "user",
                content: format!("Question: {message}\nAnswer:"),
            }],
            temperature: CHAT_TEMPERATURE,
            max_tokens: CHAT_MAX_TOKENS,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ChatProxyError::UpstreamStatus(status.as_u16()));
        }

        Ok(response.json::<serde_json::Value>().await?)
    }
}
