//! Outline builder.
//!
//! Runs the heading classifier over the lines of the full text and turns each
//! match into a [`Heading`] with a fresh id, a dense position and a page
//! number derived from cumulative page offsets.

use tracing::{debug, instrument};

use pagewise_shared::{Heading, HeadingId, Outline, PageText};
use pagewise_text::{PAGE_DELIMITER, page_end_offsets};

use crate::classifier;

/// Build the outline of a document.
///
/// `page_texts` must be the pages `full_text` was joined from. When it is
/// empty every heading lands on page 1.
#[instrument(skip_all, fields(text_len = full_text.len(), pages = page_texts.len()))]
pub fn build_outline(full_text: &str, page_texts: &[PageText]) -> Outline {
    let lines = lines_with_offsets(full_text);
    let line_texts: Vec<&str> = lines.iter().map(|(_, line)| *line).collect();
    let page_ends = page_end_offsets(page_texts);

    let headings: Vec<Heading> = classifier::classify(&line_texts)
        .into_iter()
        .enumerate()
        .map(|(position, found)| {
            let (line_start, line) = lines[found.line_index];
            let offset = line_start + (line.len() - line.trim_start().len());
            Heading {
                id: HeadingId::new(),
                text: line.trim().to_string(),
                level: found.level,
                page: page_for_offset(offset, &page_ends),
                position,
                offset: Some(offset),
            }
        })
        .collect();

    debug!(headings = headings.len(), "outline built");
    Outline::new(headings)
}

/// Page number for a byte offset, given each page's exclusive end offset.
fn page_for_offset(offset: usize, page_ends: &[usize]) -> u32 {
    if page_ends.is_empty() {
        return 1;
    }
    let index = page_ends
        .iter()
        .position(|&end| end >= offset)
        .unwrap_or(page_ends.len() - 1);
    index as u32 + 1
}

/// Split text into lines on `\n` and the page delimiter, keeping each line's
/// starting byte offset.
fn lines_with_offsets(text: &str) -> Vec<(usize, &str)> {
    let mut lines = Vec::new();
    let mut start = 0;

    for (i, c) in text.char_indices() {
        if c == '\n' || c == PAGE_DELIMITER {
            lines.push((start, &text[start..i]));
            start = i + c.len_utf8();
        }
    }
    lines.push((start, &text[start..]));

    lines
}
