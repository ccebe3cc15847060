//! Context selector.
//!
//! Shrinks a document to an inference backend's context budget by keeping the
//! sentences that share the most words with the query.

use std::cmp::Reverse;

use tracing::{debug, instrument};

use pagewise_text::{char_len, overlap, split_sentences, truncate_chars, word_set};

/// Fragments shorter than this (in characters) are ignored.
pub const MIN_FRAGMENT_CHARS: usize = 10;

/// Appended after every selected fragment.
pub const FRAGMENT_TERMINATOR: &str = ". ";

/// A scored sentence fragment. Discarded once the context is assembled.
#[derive(Debug)]
struct RankedSentence<'a> {
    text: &'a str,
    relevance_score: usize,
    source_order: usize,
}

/// Select at most `budget` characters of `text` relevant to `query`.
///
/// Text that already fits is returned unchanged. Otherwise sentence fragments
/// are ranked by word overlap with the query (earlier fragments win ties) and
/// concatenated until the next one would overflow the budget. The result
/// never exceeds `budget` by more than one [`FRAGMENT_TERMINATOR`]. When no
/// fragment overlaps the query, the first `budget` characters are returned.
#[instrument(skip_all, fields(text_len = text.len(), budget))]
pub fn select(query: &str, text: &str, budget: usize) -> String {
    if char_len(text) <= budget {
        return text.to_string();
    }

    let query_words = word_set(query);
    let mut ranked: Vec<RankedSentence<'_>> = split_sentences(text)
        .map(str::trim)
        .enumerate()
        .filter(|(_, fragment)| char_len(fragment) >= MIN_FRAGMENT_CHARS)
        .map(|(source_order, fragment)| RankedSentence {
            text: fragment,
            relevance_score: overlap(&query_words, &word_set(fragment)),
            source_order,
        })
        .filter(|sentence| sentence.relevance_score > 0)
        .collect();

    ranked.sort_by_key(|s| (Reverse(s.relevance_score), s.source_order));

    let mut context = String::new();
    let mut context_len = 0usize;
    for sentence in &ranked {
        let len = char_len(sentence.text);
        if context_len + len > budget {
            break;
        }
        context.push_str(sentence.text);
        context.push_str(FRAGMENT_TERMINATOR);
        context_len += len + FRAGMENT_TERMINATOR.len();
    }

    if context.is_empty() {
        debug!("no relevant fragments fit, using leading text");
        return truncate_chars(text, budget).to_string();
    }

    debug!(
        candidates = ranked.len(),
        selected_len = context_len,
        "context selected"
    );
    context
}
