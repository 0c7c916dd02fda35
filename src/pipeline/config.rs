//! Configuration for the summarization pipeline.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::pipeline::errors::{PipelineError, PipelineResult};

/// Default word budget per chunk.
pub const DEFAULT_MAX_TOKENS: usize = 900;
/// Default upper bound on summary length.
pub const DEFAULT_MAX_LENGTH: u32 = 130;
/// Default lower bound on summary length.
pub const DEFAULT_MIN_LENGTH: u32 = 30;

/// Top-level configuration for the pipeline.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Per-request defaults.
    pub params: SummaryParams,
    /// Reduction settings.
    pub reduction: ReductionConfig,
    /// Timeout settings.
    pub timeouts: TimeoutConfig,
    /// Summarization backend settings.
    pub backend: BackendConfig,
}

impl PipelineConfig {
    /// Load configuration from `PRECIS_*` environment variables, falling back to defaults.
    ///
    /// # Errors
    /// Returns an error if a variable is set but cannot be parsed, or if the result is invalid.
    pub fn from_env() -> PipelineResult<Self> {
        let defaults = Self::default();
        let config = Self {
            params: SummaryParams {
                max_tokens: env_or("PRECIS_MAX_TOKENS", defaults.params.max_tokens)?,
                max_length: env_or("PRECIS_MAX_LENGTH", defaults.params.max_length)?,
                min_length: env_or("PRECIS_MIN_LENGTH", defaults.params.min_length)?,
            },
            reduction: ReductionConfig {
                strategy: if env_or("PRECIS_RECURSIVE_REDUCTION", false)? {
                    ReductionStrategy::Recursive
                } else {
                    ReductionStrategy::Single
                },
                max_depth: env_or("PRECIS_MAX_REDUCTION_DEPTH", defaults.reduction.max_depth)?,
                max_concurrency: env_or(
                    "PRECIS_MAX_CONCURRENCY",
                    defaults.reduction.max_concurrency,
                )?,
            },
            timeouts: TimeoutConfig {
                call_timeout_secs: env_or(
                    "PRECIS_CALL_TIMEOUT_SECS",
                    defaults.timeouts.call_timeout_secs,
                )?,
                request_timeout_secs: env_or(
                    "PRECIS_REQUEST_TIMEOUT_SECS",
                    defaults.timeouts.request_timeout_secs,
                )?,
            },
            backend: BackendConfig {
                base_url: std::env::var("PRECIS_OLLAMA_URL").ok(),
                model: std::env::var("PRECIS_MODEL").unwrap_or(defaults.backend.model),
                keep_alive: std::env::var("PRECIS_KEEP_ALIVE")
                    .unwrap_or(defaults.backend.keep_alive),
                spawn_server: env_or("PRECIS_SPAWN_OLLAMA", defaults.backend.spawn_server)?,
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration invariants.
    ///
    /// # Errors
    /// Returns an error if any values are out of range or invalid.
    pub fn validate(&self) -> PipelineResult<()> {
        self.params
            .validate()
            .map_err(|e| PipelineError::InvalidConfig(e.to_string()))?;

        if self.reduction.max_concurrency == 0 {
            return Err(PipelineError::InvalidConfig(
                "reduction.max_concurrency must be > 0".to_string(),
            ));
        }

        if self.reduction.max_depth == 0 {
            return Err(PipelineError::InvalidConfig(
                "reduction.max_depth must be > 0".to_string(),
            ));
        }

        if self.timeouts.call_timeout_secs == 0 {
            return Err(PipelineError::InvalidConfig(
                "timeouts.call_timeout_secs must be > 0".to_string(),
            ));
        }

        if self.timeouts.request_timeout_secs == 0 {
            return Err(PipelineError::InvalidConfig(
                "timeouts.request_timeout_secs must be > 0".to_string(),
            ));
        }

        if self.backend.model.trim().is_empty() {
            return Err(PipelineError::InvalidConfig(
                "backend.model must not be empty".to_string(),
            ));
        }

        if let Some(base_url) = &self.backend.base_url {
            Url::parse(base_url)?;
        }

        Ok(())
    }
}

/// Length bounds applied to one summarization request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryParams {
    /// Word budget per chunk.
    pub max_tokens: usize,
    /// Maximum summary length in words.
    pub max_length: u32,
    /// Minimum summary length in words.
    pub min_length: u32,
}

impl Default for SummaryParams {
    fn default() -> Self {
        Self {
            max_tokens: DEFAULT_MAX_TOKENS,
            max_length: DEFAULT_MAX_LENGTH,
            min_length: DEFAULT_MIN_LENGTH,
        }
    }
}

impl SummaryParams {
    /// Length bounds handed to the summarization backend.
    #[must_use]
    pub const fn bounds(&self) -> LengthBounds {
        LengthBounds {
            max_length: self.max_length,
            min_length: self.min_length,
        }
    }

    /// Replace any of the bounds supplied by a caller.
    #[must_use]
    pub fn with_overrides(
        self,
        max_tokens: Option<usize>,
        max_length: Option<u32>,
        min_length: Option<u32>,
    ) -> Self {
        Self {
            max_tokens: max_tokens.unwrap_or(self.max_tokens),
            max_length: max_length.unwrap_or(self.max_length),
            min_length: min_length.unwrap_or(self.min_length),
        }
    }

    /// Validate the bounds.
    ///
    /// # Errors
    /// Returns `InvalidParams` if a bound is zero or `min_length > max_length`.
    pub fn validate(&self) -> PipelineResult<()> {
        if self.max_tokens == 0 {
            return Err(PipelineError::InvalidParams(
                "max_tokens must be > 0".to_string(),
            ));
        }

        if self.min_length == 0 {
            return Err(PipelineError::InvalidParams(
                "min_length must be > 0".to_string(),
            ));
        }

        if self.min_length > self.max_length {
            return Err(PipelineError::InvalidParams(format!(
                "min_length ({}) must not exceed max_length ({})",
                self.min_length, self.max_length
            )));
        }

        Ok(())
    }
}

/// Length bounds for one summarization call, in words.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LengthBounds {
    /// Maximum summary length.
    pub max_length: u32,
    /// Minimum summary length.
    pub min_length: u32,
}

impl Default for LengthBounds {
    fn default() -> Self {
        SummaryParams::default().bounds()
    }
}

/// How partial summaries are condensed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReductionStrategy {
    /// One reduction call over the joined partials, whatever their length.
    #[default]
    Single,
    /// Re-segment the joined partials and repeat until a single chunk remains.
    Recursive,
}

/// Reduction settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReductionConfig {
    /// Reduction strategy.
    pub strategy: ReductionStrategy,
    /// Maximum number of recursive rounds before a final forced reduction.
    pub max_depth: usize,
    /// Maximum number of chunk summaries in flight at once.
    pub max_concurrency: usize,
}

impl Default for ReductionConfig {
    fn default() -> Self {
        Self {
            strategy: ReductionStrategy::Single,
            max_depth: 4,
            max_concurrency: 1,
        }
    }
}

/// Timeout settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Timeout for a single summarization call, in seconds.
    pub call_timeout_secs: u64,
    /// Deadline for a whole request, in seconds.
    pub request_timeout_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            call_timeout_secs: 120,
            request_timeout_secs: 600,
        }
    }
}

impl TimeoutConfig {
    /// Per-call timeout.
    #[must_use]
    pub const fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    /// Whole-request deadline.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Summarization backend settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Optional base URL override for Ollama.
    pub base_url: Option<String>,
    /// Model name.
    pub model: String,
    /// How long Ollama keeps the model resident.
    pub keep_alive: String,
    /// Spawn `ollama serve` at startup if the server is unreachable.
    pub spawn_server: bool,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            model: "mistral:7b-instruct-q8_0".to_string(),
            keep_alive: "1h".to_string(),
            spawn_server: false,
        }
    }
}

/// Read and parse an environment variable, or return `default` when unset.
fn env_or<T: FromStr>(key: &str, default: T) -> PipelineResult<T> {
    parse_or(key, std::env::var(key).ok(), default)
}

/// Parse a raw setting, falling back to `default` when it is absent.
///
/// A value that is present but unparseable is an `InvalidConfig` error, never a silent default.
pub(crate) fn parse_or<T: FromStr>(
    key: &str,
    raw: Option<String>,
    default: T,
) -> PipelineResult<T> {
    match raw {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| PipelineError::InvalidConfig(format!("{key} has invalid value {raw:?}"))),
        None => Ok(default),
    }
}
