//! Hierarchical (map then reduce) summarization over ordered chunks.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::debug;

use crate::pipeline::config::{LengthBounds, ReductionConfig, ReductionStrategy, SummaryParams};
use crate::pipeline::errors::{PipelineError, PipelineResult};
use crate::pipeline::segmenter::{Segmenter, count_words};

/// Boxed future type for summarizer operations.
pub type SummarizeFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Trait abstraction over the external summarization capability.
///
/// Implementations are built once per process and shared by every request, so they
/// must hold no per-request state. Decoding is expected to be deterministic.
pub trait Summarizer: Send + Sync {
    /// Summarize `text` within `bounds`.
    ///
    /// # Errors
    /// Returns an error if the backend fails; a sentinel string is never returned instead.
    fn summarize<'a>(
        &'a self,
        text: &'a str,
        bounds: LengthBounds,
    ) -> SummarizeFuture<'a, PipelineResult<String>>;

    /// Name of the model behind this summarizer.
    fn model_name(&self) -> &str;
}

/// Condenses an ordered chunk sequence into one summary.
#[derive(Clone)]
pub struct HierarchicalSummarizer {
    backend: Arc<dyn Summarizer>,
    segmenter: Segmenter,
    reduction: ReductionConfig,
    call_timeout: Duration,
}

impl HierarchicalSummarizer {
    /// Create a new hierarchical summarizer.
    #[must_use]
    pub fn new(
        backend: Arc<dyn Summarizer>,
        segmenter: Segmenter,
        reduction: ReductionConfig,
        call_timeout: Duration,
    ) -> Self {
        Self {
            backend,
            segmenter,
            reduction,
            call_timeout,
        }
    }

    /// The backend used for every call.
    #[must_use]
    pub fn backend(&self) -> &Arc<dyn Summarizer> {
        &self.backend
    }

    /// Summarize every chunk, then reduce the partial summaries when there is more than one.
    ///
    /// A single chunk costs one backend call. N chunks cost N+1 calls with the default
    /// `ReductionStrategy::Single`; the last call receives the partials joined by a space.
    ///
    /// # Errors
    /// Returns `NoText` for an empty chunk sequence, or the first backend failure or
    /// timeout. No partial result is returned on failure.
    pub async fn summarize(
        &self,
        chunks: &[String],
        params: SummaryParams,
    ) -> PipelineResult<String> {
        let bounds = params.bounds();
        let mut partials = self.summarize_chunks(chunks, bounds).await?;

        if partials.len() <= 1 {
            return partials.pop().ok_or(PipelineError::NoText);
        }

        let mut joined = partials.join(" ");

        if self.reduction.strategy == ReductionStrategy::Recursive {
            for depth in 1..=self.reduction.max_depth {
                let regrouped = self.segmenter.segment(&joined, params.max_tokens);
                if regrouped.len() <= 1 {
                    break;
                }
                debug!(depth, chunks = regrouped.len(), "re-segmenting partial summaries");
                joined = self.summarize_chunks(&regrouped, bounds).await?.join(" ");
            }
        }

        debug!(partials = partials.len(), "reducing partial summaries");
        self.call(&joined, bounds).await
    }

    /// Summarize each chunk, keeping results in chunk order.
    async fn summarize_chunks(
        &self,
        chunks: &[String],
        bounds: LengthBounds,
    ) -> PipelineResult<Vec<String>> {
        // The stream must not own a borrowing closure, or the future is no longer `Send`.
        let calls: Vec<_> = chunks.iter().map(|chunk| self.call(chunk, bounds)).collect();
        stream::iter(calls)
            .buffered(self.reduction.max_concurrency.max(1))
            .try_collect()
            .await
    }

    async fn call(&self, text: &str, bounds: LengthBounds) -> PipelineResult<String> {
        debug!(words = count_words(text), "summarization call");
        tokio::time::timeout(self.call_timeout, self.backend.summarize(text, bounds))
            .await
            .map_err(|_| PipelineError::CallTimeout(self.call_timeout))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::testing::ScriptedSummarizer;

    fn hierarchical(
        backend: Arc<ScriptedSummarizer>,
        reduction: ReductionConfig,
    ) -> HierarchicalSummarizer {
        HierarchicalSummarizer::new(
            backend,
            Segmenter::new().unwrap(),
            reduction,
            Duration::from_secs(5),
        )
    }

    fn chunks(items: &[&str]) -> Vec<String> {
        items.iter().map(ToString::to_string).collect()
    }

    #[tokio::test]
    async fn test_single_chunk_skips_reduction() {
        let backend = Arc::new(ScriptedSummarizer::new());
        let summarizer = hierarchical(backend.clone(), ReductionConfig::default());

        let summary = summarizer
            .summarize(&chunks(&["only chunk"]), SummaryParams::default())
            .await
            .unwrap();

        assert_eq!(summary, "summary 0");
        assert_eq!(backend.calls(), vec!["only chunk".to_string()]);
    }

    #[tokio::test]
    async fn test_multi_chunk_reduces_once() {
        let backend = Arc::new(ScriptedSummarizer::new());
        let summarizer = hierarchical(backend.clone(), ReductionConfig::default());

        let summary = summarizer
            .summarize(&chunks(&["A.", "B.", "C."]), SummaryParams::default())
            .await
            .unwrap();

        let calls = backend.calls();
        assert_eq!(calls.len(), 4);
        assert_eq!(&calls[..3], &["A.", "B.", "C."]);
        assert_eq!(calls[3], "summary 0 summary 1 summary 2");
        assert_eq!(summary, "summary 3");
    }

    #[tokio::test]
    async fn test_bounds_forwarded_to_backend() {
        let backend = Arc::new(ScriptedSummarizer::new());
        let summarizer = hierarchical(backend.clone(), ReductionConfig::default());
        let params = SummaryParams::default().with_overrides(None, Some(60), Some(10));

        summarizer
            .summarize(&chunks(&["x.", "y."]), params)
            .await
            .unwrap();

        assert!(backend.bounds().iter().all(|b| b.max_length == 60 && b.min_length == 10));
    }

    #[tokio::test]
    async fn test_failure_on_chunk_aborts() {
        let backend = Arc::new(ScriptedSummarizer::failing_on(1));
        let summarizer = hierarchical(backend.clone(), ReductionConfig::default());

        let result = summarizer
            .summarize(&chunks(&["a.", "b.", "c."]), SummaryParams::default())
            .await;

        assert!(matches!(result, Err(PipelineError::Backend(_))));
        assert_eq!(backend.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_failure_on_reduction_aborts() {
        let backend = Arc::new(ScriptedSummarizer::failing_on(2));
        let summarizer = hierarchical(backend.clone(), ReductionConfig::default());

        let result = summarizer
            .summarize(&chunks(&["a.", "b."]), SummaryParams::default())
            .await;

        assert!(matches!(result, Err(PipelineError::Backend(_))));
        assert_eq!(backend.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_empty_chunks_rejected() {
        let backend = Arc::new(ScriptedSummarizer::new());
        let summarizer = hierarchical(backend.clone(), ReductionConfig::default());

        let result = summarizer.summarize(&[], SummaryParams::default()).await;

        assert!(matches!(result, Err(PipelineError::NoText)));
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_map_preserves_order() {
        let backend = Arc::new(
            ScriptedSummarizer::new()
                .with_echo_output()
                .with_descending_delays(Duration::from_millis(10)),
        );
        let reduction = ReductionConfig {
            max_concurrency: 4,
            ..ReductionConfig::default()
        };
        let summarizer = hierarchical(backend.clone(), reduction);

        summarizer
            .summarize(
                &chunks(&["one.", "two.", "three.", "four."]),
                SummaryParams::default(),
            )
            .await
            .unwrap();

        let calls = backend.calls();
        let reduction_input = calls.last().unwrap();
        assert_eq!(reduction_input, "echo one. echo two. echo three. echo four.");
    }

    #[tokio::test]
    async fn test_call_timeout() {
        let backend = Arc::new(ScriptedSummarizer::new().with_delay(Duration::from_secs(5)));
        let summarizer = HierarchicalSummarizer::new(
            backend,
            Segmenter::new().unwrap(),
            ReductionConfig::default(),
            Duration::from_millis(20),
        );

        let result = summarizer
            .summarize(&chunks(&["slow."]), SummaryParams::default())
            .await;

        assert!(matches!(result, Err(PipelineError::CallTimeout(_))));
    }

    #[tokio::test]
    async fn test_recursive_reduction_regroups_partials() {
        let backend = Arc::new(ScriptedSummarizer::new());
        let reduction = ReductionConfig {
            strategy: ReductionStrategy::Recursive,
            ..ReductionConfig::default()
        };
        let summarizer = hierarchical(backend.clone(), reduction);
        let params = SummaryParams::default().with_overrides(Some(4), None, None);

        let summary = summarizer
            .summarize(&chunks(&["a.", "b.", "c.", "d."]), params)
            .await
            .unwrap();

        // 4 chunk calls, then "summary 0 summary 1 summary 2 summary 3" has no sentence
        // boundary so it stays one chunk and goes straight to the final call.
        assert_eq!(backend.calls().len(), 5);
        assert_eq!(summary, "summary 4");
    }

    #[tokio::test]
    async fn test_recursive_reduction_runs_extra_round() {
        let backend = Arc::new(ScriptedSummarizer::new().with_sentence_output());
        let reduction = ReductionConfig {
            strategy: ReductionStrategy::Recursive,
            ..ReductionConfig::default()
        };
        let summarizer = hierarchical(backend.clone(), reduction);
        let params = SummaryParams::default().with_overrides(Some(4), None, None);

        summarizer
            .summarize(&chunks(&["a.", "b.", "c.", "d."]), params)
            .await
            .unwrap();

        // Round one: 4 calls yielding "Summary 0." .. "Summary 3." (8 words, 2 chunks).
        // Round two: 2 calls yielding "Summary 4." "Summary 5." (4 words, 1 chunk).
        // Final reduction: 1 call.
        let calls = backend.calls();
        assert_eq!(calls.len(), 7);
        assert_eq!(calls[4], "Summary 0. Summary 1.");
        assert_eq!(calls[5], "Summary 2. Summary 3.");
        assert_eq!(calls[6], "Summary 4. Summary 5.");
    }
}
