//! Section-aware summarization driver.
//!
//! Segments the document by its outline and summarizes each section with a
//! caller-supplied function. A failing call only affects its own section.

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use pagewise_shared::{Outline, Result};

use crate::pipeline::{ProgressReporter, SilentProgress};
use crate::sections::sections_for;
use crate::summarizer::{DEFAULT_FALLBACK_CHARS, extractive_summary};

/// Key used when the document has no outline.
pub const WHOLE_DOCUMENT_KEY: &str = "full_document";

/// One heading's summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionSummary {
    pub heading: String,
    pub summary: String,
}

/// Summaries keyed by heading text, in outline order.
///
/// Inserting a heading text that is already present replaces the earlier
/// summary and keeps its original slot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SectionSummaries {
    entries: Vec<SectionSummary>,
}

impl SectionSummaries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, heading: impl Into<String>, summary: impl Into<String>) {
        let heading = heading.into();
        let summary = summary.into();
        match self.entries.iter_mut().find(|e| e.heading == heading) {
            Some(existing) => existing.summary = summary,
            None => self.entries.push(SectionSummary { heading, summary }),
        }
    }

    pub fn get(&self, heading: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.heading == heading)
            .map(|e| e.summary.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|e| (e.heading.as_str(), e.summary.as_str()))
    }
}

/// Summarize every section of `full_text` as bounded by `outline`.
///
/// With an empty outline the whole document is summarized under
/// [`WHOLE_DOCUMENT_KEY`].
pub fn summarize_sections<F>(full_text: &str, outline: &Outline, summarize_fn: F) -> SectionSummaries
where
    F: FnMut(&str) -> Result<String>,
{
    summarize_sections_with_progress(
        full_text,
        outline,
        summarize_fn,
        DEFAULT_FALLBACK_CHARS,
        &SilentProgress,
    )
}

/// [`summarize_sections`], reporting each finished section to `progress`.
///
/// Sections whose `summarize_fn` call fails get an extractive summary capped
/// at `fallback_chars`.
#[instrument(skip_all, fields(headings = outline.len(), text_len = full_text.len()))]
pub fn summarize_sections_with_progress<F>(
    full_text: &str,
    outline: &Outline,
    mut summarize_fn: F,
    fallback_chars: usize,
    progress: &dyn ProgressReporter,
) -> SectionSummaries
where
    F: FnMut(&str) -> Result<String>,
{
    let mut summaries = SectionSummaries::new();

    if outline.is_empty() {
        let summary = summarize_or_fallback(&mut summarize_fn, WHOLE_DOCUMENT_KEY, full_text, fallback_chars);
        summaries.insert(WHOLE_DOCUMENT_KEY, summary);
        progress.section_summarized(WHOLE_DOCUMENT_KEY, 1, 1);
        return summaries;
    }

    let sections = sections_for(outline, full_text);
    let total = sections.len();
    for (i, section) in sections.iter().enumerate() {
        if !section.is_found() {
            debug!(heading = %section.heading.text, "heading not found in text, section is empty");
        }
        let text = section.text(full_text);
        let summary = summarize_or_fallback(&mut summarize_fn, &section.heading.text, text, fallback_chars);
        summaries.insert(section.heading.text.as_str(), summary);
        progress.section_summarized(&section.heading.text, i + 1, total);
    }

    summaries
}

fn summarize_or_fallback<F>(
    summarize_fn: &mut F,
    key: &str,
    text: &str,
    fallback_chars: usize,
) -> String
where
    F: FnMut(&str) -> Result<String>,
{
    match summarize_fn(text) {
        Ok(summary) => summary,
        Err(e) => {
            warn!(section = %key, error = %e, "section summary failed, using extractive fallback");
            extractive_summary(text, fallback_chars)
        }
    }
}
