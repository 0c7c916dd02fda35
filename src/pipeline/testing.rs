//! In-memory summarizer double for tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::pipeline::config::LengthBounds;
use crate::pipeline::errors::{PipelineError, PipelineResult};
use crate::pipeline::summarizer::{SummarizeFuture, Summarizer};

#[derive(Clone, Copy, Debug)]
enum Output {
    /// `summary {n}` where `n` is the call index.
    Numbered,
    /// `Summary {n}.`, which the segmenter sees as a sentence.
    Sentence,
    /// `echo {input}`.
    Echo,
}

/// Records every call and answers with predictable summaries.
pub struct ScriptedSummarizer {
    calls: Mutex<Vec<String>>,
    bounds: Mutex<Vec<LengthBounds>>,
    counter: AtomicUsize,
    output: Output,
    fail_on: Option<usize>,
    delay: Option<Duration>,
    descending_delays: bool,
}

impl ScriptedSummarizer {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            bounds: Mutex::new(Vec::new()),
            counter: AtomicUsize::new(0),
            output: Output::Numbered,
            fail_on: None,
            delay: None,
            descending_delays: false,
        }
    }

    /// Fail the call with index `n` (zero-based).
    pub fn failing_on(n: usize) -> Self {
        Self {
            fail_on: Some(n),
            ..Self::new()
        }
    }

    pub fn with_sentence_output(mut self) -> Self {
        self.output = Output::Sentence;
        self
    }

    pub fn with_echo_output(mut self) -> Self {
        self.output = Output::Echo;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Earlier calls sleep longer than later ones, so they finish out of order.
    pub fn with_descending_delays(mut self, step: Duration) -> Self {
        self.delay = Some(step);
        self.descending_delays = true;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn bounds(&self) -> Vec<LengthBounds> {
        self.bounds.lock().unwrap().clone()
    }
}

impl Summarizer for ScriptedSummarizer {
    fn summarize<'a>(
        &'a self,
        text: &'a str,
        bounds: LengthBounds,
    ) -> SummarizeFuture<'a, PipelineResult<String>> {
        Box::pin(async move {
            let n = self.counter.fetch_add(1, Ordering::SeqCst);
            self.calls.lock().unwrap().push(text.to_string());
            self.bounds.lock().unwrap().push(bounds);

            if let Some(delay) = self.delay {
                let delay = if self.descending_delays {
                    delay * u32::try_from(10_usize.saturating_sub(n)).unwrap()
                } else {
                    delay
                };
                tokio::time::sleep(delay).await;
            }

            if self.fail_on == Some(n) {
                return Err(PipelineError::backend(format!("scripted failure on call {n}")));
            }

            Ok(match self.output {
                Output::Numbered => format!("summary {n}"),
                Output::Sentence => format!("Summary {n}."),
                Output::Echo => format!("echo {text}"),
            })
        })
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}
