//! Chunking and hierarchical summarization pipeline.
//!
//! A document is split into sentence-preserving chunks under a word budget, each chunk
//! is summarized, and the partial summaries are condensed into one final summary.

pub mod config;
pub mod errors;
pub mod segmenter;
pub mod summarizer;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{LengthBounds, PipelineConfig, ReductionStrategy, SummaryParams};
pub use errors::{ErrorKind, PipelineError, PipelineResult};
pub use segmenter::Segmenter;
pub use summarizer::{HierarchicalSummarizer, SummarizeFuture, Summarizer};

use std::sync::Arc;
use std::time::Instant;

use tracing::{Instrument, info, info_span};
use uuid::Uuid;

/// Entry point used by callers: validates input, segments, then summarizes.
pub struct SummarizationPipeline {
    segmenter: Segmenter,
    summarizer: HierarchicalSummarizer,
    config: PipelineConfig,
}

impl SummarizationPipeline {
    /// Create a pipeline around a shared summarization backend.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid.
    pub fn new(backend: Arc<dyn Summarizer>, config: PipelineConfig) -> PipelineResult<Self> {
        config.validate()?;
        let segmenter = Segmenter::new()?;
        let summarizer = HierarchicalSummarizer::new(
            backend,
            segmenter.clone(),
            config.reduction.clone(),
            config.timeouts.call_timeout(),
        );

        Ok(Self {
            segmenter,
            summarizer,
            config,
        })
    }

    /// Default per-request parameters.
    #[must_use]
    pub const fn default_params(&self) -> SummaryParams {
        self.config.params
    }

    /// Name of the model used for summarization.
    #[must_use]
    pub fn model_name(&self) -> &str {
        self.summarizer.backend().model_name()
    }

    /// Summarize `text` with the configured default parameters.
    ///
    /// # Errors
    /// See [`Self::summarize_with`].
    pub async fn summarize(&self, text: &str) -> PipelineResult<String> {
        self.summarize_with(text, self.config.params).await
    }

    /// Summarize `text` with explicit parameters.
    ///
    /// Blank text is rejected with `NoText` before the backend is touched. The whole run
    /// is bounded by the request deadline.
    ///
    /// # Errors
    /// Returns `NoText` for blank text, `InvalidParams` for out-of-range parameters,
    /// and backend or timeout errors from any summarization call.
    pub async fn summarize_with(&self, text: &str, params: SummaryParams) -> PipelineResult<String> {
        if text.trim().is_empty() {
            return Err(PipelineError::NoText);
        }
        params.validate()?;

        let request_id = Uuid::new_v4();
        let span = info_span!("summarize", %request_id, chars = text.len());
        let deadline = self.config.timeouts.request_timeout();

        async move {
            let started = Instant::now();
            let chunks = self.segmenter.segment(text, params.max_tokens);
            if chunks.is_empty() {
                return Err(PipelineError::NoText);
            }
            info!(chunks = chunks.len(), max_tokens = params.max_tokens, "segmented document");

            let summary = tokio::time::timeout(deadline, self.summarizer.summarize(&chunks, params))
                .await
                .map_err(|_| PipelineError::DeadlineExceeded(deadline))??;

            info!(
                elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
                summary_chars = summary.len(),
                "summary produced"
            );
            Ok(summary)
        }
        .instrument(span)
        .await
    }
}
