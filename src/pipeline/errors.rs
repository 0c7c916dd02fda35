//! Error types for the summarization pipeline.

use std::time::Duration;

use thiserror::Error;

/// Message returned to callers when no usable text was submitted.
pub const NO_TEXT_MESSAGE: &str = "No text provided.";

/// Message returned to callers when the backend failed.
const BACKEND_FAILURE_MESSAGE: &str = "Summarization failed. Please try again later.";

/// Message returned to callers when the request ran out of time.
const TIMEOUT_MESSAGE: &str = "Summarization timed out. Please try again with a shorter text.";

/// Message returned to callers when the server is misconfigured.
const CONFIG_FAILURE_MESSAGE: &str = "Summarization service is not configured correctly.";

/// Pipeline error type.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Text was empty or whitespace-only.
    #[error("no text provided")]
    NoText,
    /// Request-level parameters are out of range.
    #[error("invalid parameters: {0}")]
    InvalidParams(String),
    /// The summarization backend failed.
    #[error("summarization backend error: {0}")]
    Backend(String),
    /// A single summarization call exceeded its timeout.
    #[error("summarization call timed out after {0:?}")]
    CallTimeout(Duration),
    /// The whole request exceeded its deadline.
    #[error("request deadline of {0:?} exceeded")]
    DeadlineExceeded(Duration),
    /// Invalid configuration or unsupported values.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// URL parse error.
    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),
    /// Regex compilation error.
    #[error("regex error: {0}")]
    Regex(#[from] regex::Error),
}

/// Which side of the request an error is attributed to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// The caller sent something unusable.
    InvalidInput,
    /// The summarization backend failed or timed out.
    Backend,
    /// The service itself is misconfigured.
    Configuration,
}

impl PipelineError {
    /// Build a backend error from any displayable error.
    pub fn backend(err: impl std::fmt::Display) -> Self {
        Self::Backend(err.to_string())
    }

    /// Classify the error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NoText | Self::InvalidParams(_) => ErrorKind::InvalidInput,
            Self::Backend(_) | Self::CallTimeout(_) | Self::DeadlineExceeded(_) => {
                ErrorKind::Backend
            }
            Self::InvalidConfig(_) | Self::Url(_) | Self::Regex(_) => ErrorKind::Configuration,
        }
    }

    /// Whether the error was caused by the caller.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(self.kind(), ErrorKind::InvalidInput)
    }

    /// Whether the error is a timeout of any kind.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::CallTimeout(_) | Self::DeadlineExceeded(_))
    }

    /// A stable message that is safe to show to external callers.
    ///
    /// Backend and configuration details never leak through this message; they are
    /// only logged server-side.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::NoText => NO_TEXT_MESSAGE.to_string(),
            Self::InvalidParams(reason) => format!("Invalid parameters: {reason}"),
            Self::CallTimeout(_) | Self::DeadlineExceeded(_) => TIMEOUT_MESSAGE.to_string(),
            Self::Backend(_) => BACKEND_FAILURE_MESSAGE.to_string(),
            Self::InvalidConfig(_) | Self::Url(_) | Self::Regex(_) => {
                CONFIG_FAILURE_MESSAGE.to_string()
            }
        }
    }
}

/// Convenience result alias for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        assert_eq!(PipelineError::NoText.kind(), ErrorKind::InvalidInput);
        assert_eq!(
            PipelineError::InvalidParams("x".to_string()).kind(),
            ErrorKind::InvalidInput
        );
        assert_eq!(PipelineError::backend("boom").kind(), ErrorKind::Backend);
        assert_eq!(
            PipelineError::CallTimeout(Duration::from_secs(1)).kind(),
            ErrorKind::Backend
        );
        assert_eq!(
            PipelineError::InvalidConfig("x".to_string()).kind(),
            ErrorKind::Configuration
        );
    }

    #[test]
    fn test_public_message_hides_backend_details() {
        let err = PipelineError::backend("connection refused at 10.0.0.3:11434");
        let message = err.public_message();
        assert!(!message.contains("10.0.0.3"));
        assert!(err.to_string().contains("10.0.0.3"));
    }

    #[test]
    fn test_no_text_message() {
        assert_eq!(PipelineError::NoText.public_message(), "No text provided.");
        assert!(PipelineError::NoText.is_client_error());
    }

    #[test]
    fn test_is_timeout() {
        assert!(PipelineError::DeadlineExceeded(Duration::from_secs(5)).is_timeout());
        assert!(!PipelineError::backend("x").is_timeout());
    }
}
