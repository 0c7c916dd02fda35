//! Sentence-preserving text segmentation.
//!
//! Text is cut into sentences with a punctuation heuristic, then sentences are packed
//! greedily into chunks whose word count stays under a budget. A sentence is never split:
//! a sentence longer than the budget becomes a chunk of its own.

use regex::Regex;

use crate::pipeline::errors::PipelineResult;

/// Sentence-ending punctuation followed by a run of spaces.
const SENTENCE_BOUNDARY: &str = r"[.!?] +";

/// Splits documents into word-bounded chunks.
#[derive(Clone, Debug)]
pub struct Segmenter {
    boundary: Regex,
}

impl Segmenter {
    /// Create a segmenter with the default sentence boundary heuristic.
    ///
    /// # Errors
    /// Returns an error if the boundary pattern fails to compile.
    pub fn new() -> PipelineResult<Self> {
        Ok(Self {
            boundary: Regex::new(SENTENCE_BOUNDARY)?,
        })
    }

    /// Split text into sentences.
    ///
    /// The punctuation stays with the sentence it ends and the following spaces are
    /// dropped. Whatever follows the last boundary is the final sentence, so the result
    /// is never empty (an empty text yields one empty sentence).
    #[must_use]
    pub fn split_sentences<'a>(&self, text: &'a str) -> Vec<&'a str> {
        let mut sentences = Vec::new();
        let mut start = 0;

        for boundary in self.boundary.find_iter(text) {
            // The punctuation mark is a single ASCII byte.
            let end = boundary.start() + 1;
            sentences.push(&text[start..end]);
            start = boundary.end();
        }
        sentences.push(&text[start..]);

        sentences
    }

    /// Split text into ordered chunks of at most `max_tokens` words.
    ///
    /// Chunks are trimmed and never empty. Only a chunk holding exactly one sentence may
    /// exceed the budget.
    #[must_use]
    pub fn segment(&self, text: &str, max_tokens: usize) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut buffer = String::new();
        let mut buffer_words = 0_usize;

        for sentence in self.split_sentences(text) {
            let words = count_words(sentence);

            if buffer_words + words > max_tokens {
                if buffer_words == 0 {
                    push_trimmed(&mut chunks, sentence);
                    buffer.clear();
                } else {
                    push_trimmed(&mut chunks, &buffer);
                    buffer.clear();
                    buffer.push_str(sentence);
                    buffer_words = words;
                }
            } else {
                buffer.push(' ');
                buffer.push_str(sentence);
                buffer_words += words;
            }
        }

        push_trimmed(&mut chunks, &buffer);
        chunks
    }
}

impl Default for Segmenter {
    /// Creates a segmenter with the default boundary heuristic.
    ///
    /// # Panics
    /// Panics if the boundary pattern is invalid (it is a constant).
    #[allow(clippy::expect_used)]
    fn default() -> Self {
        Self::new().expect("sentence boundary pattern should be valid")
    }
}

/// Number of whitespace-delimited words in `text`.
#[must_use]
pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

fn push_trimmed(chunks: &mut Vec<String>, text: &str) {
    let trimmed = text.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}
