//! Word sets and sentence fragments.
//!
//! Relevance scoring, reference attribution and the model-free fallbacks all
//! compare texts by the overlap of their lower-cased word sets.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

/// Lower-cased words of `text`, with leading/trailing punctuation removed.
pub fn word_set(text: &str) -> HashSet<String> {
    text.split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
        .filter(|w| !w.is_empty())
        .collect()
}

/// Number of words shared by two word sets.
pub fn overlap(a: &HashSet<String>, b: &HashSet<String>) -> usize {
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    small.iter().filter(|w| large.contains(*w)).count()
}

/// Split text into sentence fragments on runs of `.`, `!` and `?`.
///
/// Fragments are returned untrimmed and may be empty.
pub fn split_sentences(text: &str) -> impl Iterator<Item = &str> {
    static SENTENCE_END_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"[.!?]+").expect("valid regex"));

    SENTENCE_END_RE.split(text)
}

/// Length in characters.
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// The first `max_chars` characters of `text`.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
