//! Section segmenter.
//!
//! A heading at level `L` owns the text from its own start up to the start of
//! the next heading with level `<= L`. Deeper sub-headings are folded into the
//! parent's section. The whole outline is segmented in one left-to-right pass
//! so that heading-text lookups only move forward through the document.

use std::ops::Range;

use tracing::{debug, instrument};

use pagewise_shared::{Heading, Outline};

/// A heading together with the byte span it owns in the full text.
///
/// Only valid for the full text it was computed against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section<'a> {
    pub heading: &'a Heading,
    /// `None` when the heading text could not be located.
    pub span: Option<Range<usize>>,
}

impl Section<'_> {
    /// The section text, or `""` if the heading was not found.
    pub fn text<'t>(&self, full_text: &'t str) -> &'t str {
        self.span
            .clone()
            .and_then(|span| full_text.get(span))
            .unwrap_or("")
    }

    pub fn is_found(&self) -> bool {
        self.span.is_some()
    }
}

/// Segment `full_text` into one section per outline heading, in outline order.
#[instrument(skip_all, fields(headings = outline.len(), text_len = full_text.len()))]
pub fn sections_for<'a>(outline: &'a Outline, full_text: &str) -> Vec<Section<'a>> {
    let headings = outline.headings();
    let starts = resolve_starts(headings, full_text);
    let successors = bounding_successors(headings);

    let sections: Vec<Section<'a>> = headings
        .iter()
        .enumerate()
        .map(|(i, heading)| {
            let span = starts[i].map(|start| {
                let end = section_end(i, headings, &starts, &successors)
                    .unwrap_or(full_text.len());
                start..end
            });
            Section { heading, span }
        })
        .collect();

    debug!(
        missing = sections.iter().filter(|s| !s.is_found()).count(),
        "sections resolved"
    );
    sections
}

/// Text of the section owned by `heading`, or `""` if it is not part of
/// `outline` or its text cannot be found.
pub fn section_for<'t>(heading: &Heading, outline: &Outline, full_text: &'t str) -> &'t str {
    sections_for(outline, full_text)
        .into_iter()
        .find(|section| section.heading.id == heading.id)
        .map(|section| section.text(full_text))
        .unwrap_or("")
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Locate each heading's start offset, searching strictly after the previous
/// resolved heading.
fn resolve_starts(headings: &[Heading], full_text: &str) -> Vec<Option<usize>> {
    let mut cursor = 0usize;

    headings
        .iter()
        .map(|heading| {
            let start = locate(heading, full_text, cursor);
            match start {
                Some(start) => cursor = start + heading.text.len(),
                None => debug!(heading = %heading.text, "heading text not found in full text"),
            }
            start
        })
        .collect()
}

/// Find a heading at or after `cursor`, preferring its recorded offset.
fn locate(heading: &Heading, full_text: &str, cursor: usize) -> Option<usize> {
    if heading.text.is_empty() {
        return None;
    }

    if let Some(offset) = heading.offset {
        let matches = offset >= cursor
            && full_text
                .get(offset..)
                .is_some_and(|rest| rest.starts_with(&heading.text));
        if matches {
            return Some(offset);
        }
    }

    full_text
        .get(cursor..)?
        .find(&heading.text)
        .map(|i| cursor + i)
}

/// For each heading, the index of the next heading whose level is `<=` its own.
fn bounding_successors(headings: &[Heading]) -> Vec<Option<usize>> {
    let mut successors = vec![None; headings.len()];
    let mut open: Vec<usize> = Vec::new();

    for (j, heading) in headings.iter().enumerate() {
        while let Some(&i) = open.last() {
            if heading.level <= headings[i].level {
                successors[i] = Some(j);
                open.pop();
            } else {
                break;
            }
        }
        open.push(j);
    }

    successors
}

/// End offset of section `i`: the start of its bounding successor, or of the
/// next located heading at the same or a shallower level if the successor
/// itself was not found.
fn section_end(
    i: usize,
    headings: &[Heading],
    starts: &[Option<usize>],
    successors: &[Option<usize>],
) -> Option<usize> {
    let first = successors[i]?;
    let level = headings[i].level;

    (first..headings.len())
        .filter(|&k| headings[k].level <= level)
        .find_map(|k| starts[k])
}
