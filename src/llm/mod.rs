//! Clients for the external language-model services.

pub mod ollama;
pub mod openrouter;

pub use ollama::{OllamaError, OllamaSummarizer};
pub use openrouter::{ChatProxy, ChatProxyError};
