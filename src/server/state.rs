//! Application state shared across all request handlers.

use std::path::PathBuf;
use std::sync::Arc;

use crate::llm::ChatProxy;
use crate::pipeline::SummarizationPipeline;

/// Shared application state.
pub struct AppState {
    /// Summarization pipeline around the process-wide model handle.
    pub pipeline: SummarizationPipeline,
    /// Chat completion proxy.
    pub chat: ChatProxy,
    /// Directory served for unmatched routes.
    pub static_dir: PathBuf,
}

impl AppState {
    /// Bundle the shared services.
    #[must_use]
    pub fn new(
        pipeline: SummarizationPipeline,
        chat: ChatProxy,
        static_dir: impl Into<PathBuf>,
    ) -> Arc<Self> {
        Arc::new(Self {
            pipeline,
            chat,
            static_dir: static_dir.into(),
        })
    }
}
