//! Reference attribution: which headings an answer appears to come from.

use pagewise_shared::{Heading, Outline};
use pagewise_text::word_set;

/// Maximum number of headings cited for one answer.
pub const MAX_REFERENCES: usize = 3;

/// Headings sharing at least one word with `answer`, in outline order,
/// capped at [`MAX_REFERENCES`].
pub fn attribute<'a>(answer: &str, outline: &'a Outline) -> Vec<&'a Heading> {
    if answer.trim().is_empty() || outline.is_empty() {
        return Vec::new();
    }

    let answer_words = word_set(answer);
    outline
        .iter()
        .filter(|heading| {
            word_set(&heading.text)
                .iter()
                .any(|word| answer_words.contains(word))
        })
        .take(MAX_REFERENCES)
        .collect()
}
