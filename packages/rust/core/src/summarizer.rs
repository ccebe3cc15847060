//! Document summarizer with an extractive fallback.

use std::sync::Arc;

use tracing::{debug, warn};

use pagewise_shared::{DefaultsConfig, Outline};
use pagewise_text::{char_len, truncate_chars, word_set};

use crate::backend::InferenceBackend;
use crate::pipeline::ProgressReporter;
use crate::summarize::{SectionSummaries, summarize_sections_with_progress};

/// Maximum characters sent to the backend per summarization call.
pub const DEFAULT_INPUT_CHARS: usize = 1024;

/// Cap of the extractive summary before the ellipsis.
pub const DEFAULT_FALLBACK_CHARS: usize = 300;

/// Words that mark a sentence as worth keeping in an extractive summary.
const SUMMARY_KEYWORDS: [&str; 6] = ["important", "key", "main", "significant", "crucial", "essential"];

/// Sentences taken from the start of the text when none carry a keyword.
const LEADING_SENTENCES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SummaryOptions {
    pub input_chars: usize,
    pub fallback_chars: usize,
}

impl Default for SummaryOptions {
    fn default() -> Self {
        Self {
            input_chars: DEFAULT_INPUT_CHARS,
            fallback_chars: DEFAULT_FALLBACK_CHARS,
        }
    }
}

impl From<&DefaultsConfig> for SummaryOptions {
    fn from(defaults: &DefaultsConfig) -> Self {
        Self {
            input_chars: defaults.summary_input_chars,
            fallback_chars: defaults.fallback_summary_chars,
        }
    }
}

/// Summarizes text through an optional inference backend.
///
/// Never fails: a missing or failing backend degrades to
/// [`extractive_summary`].
pub struct DocumentSummarizer {
    backend: Option<Arc<dyn InferenceBackend>>,
    options: SummaryOptions,
}

impl DocumentSummarizer {
    pub fn new(backend: Option<Arc<dyn InferenceBackend>>, options: SummaryOptions) -> Self {
        Self { backend, options }
    }

    /// A summarizer that only uses the extractive fallback.
    pub fn extractive(options: SummaryOptions) -> Self {
        Self::new(None, options)
    }

    pub fn has_backend(&self) -> bool {
        self.backend.is_some()
    }

    pub fn summarize(&self, text: &str) -> String {
        if text.trim().is_empty() {
            return String::new();
        }

        let Some(backend) = &self.backend else {
            return extractive_summary(text, self.options.fallback_chars);
        };

        let input = truncate_chars(text, self.options.input_chars);
        match backend.summarize(input) {
            Ok(summary) => {
                debug!(input_chars = char_len(input), summary_chars = char_len(&summary), "backend summary");
                summary
            }
            Err(e) => {
                warn!(error = %e, "summarization backend failed, using extractive fallback");
                extractive_summary(text, self.options.fallback_chars)
            }
        }
    }

    /// Summarize each section of the outline.
    pub fn summarize_by_sections(
        &self,
        full_text: &str,
        outline: &Outline,
        progress: &dyn ProgressReporter,
    ) -> SectionSummaries {
        summarize_sections_with_progress(
            full_text,
            outline,
            |section| Ok(self.summarize(section)),
            self.options.fallback_chars,
            progress,
        )
    }
}

/// Model-free summary: keyword-bearing sentences, or the leading sentences
/// when none carry a keyword, capped at `max_chars` plus `"..."`.
pub fn extractive_summary(text: &str, max_chars: usize) -> String {
    let sentences: Vec<&str> = text
        .split('.')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    if sentences.is_empty() {
        return String::new();
    }

    let keyed: Vec<&str> = sentences
        .iter()
        .copied()
        .filter(|s| {
            let words = word_set(s);
            SUMMARY_KEYWORDS.iter().any(|k| words.contains(*k))
        })
        .collect();

    let chosen = if keyed.is_empty() {
        &sentences[..sentences.len().min(LEADING_SENTENCES)]
    } else {
        &keyed[..]
    };

    let summary = format!("{}.", chosen.join(". "));
    if char_len(&summary) > max_chars {
        format!("{}...", truncate_chars(&summary, max_chars))
    } else {
        summary
    }
}
