//! Page segmentation of extracted document text.
//!
//! Extractors emit one form feed between consecutive pages. The full text used
//! everywhere else in the pipeline is the page texts joined with that same
//! delimiter, so byte offsets into the full text map back onto pages exactly.

use tracing::{debug, instrument};

use pagewise_shared::PageText;

use crate::cleanup;

/// Page-boundary marker between consecutive pages in the full text.
pub const PAGE_DELIMITER: char = '\x0c';

/// Extracted text of one document: the full text plus its per-page view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedDocument {
    pub full_text: String,
    pub pages: Vec<PageText>,
}

impl ExtractedDocument {
    /// Split raw extractor output into pages, clean each page, and rebuild the
    /// full text from the cleaned pages.
    #[instrument(skip_all, fields(raw_len = raw.len()))]
    pub fn from_raw(raw: &str) -> Self {
        let pages: Vec<PageText> = split_pages(raw)
            .into_iter()
            .map(|p| PageText {
                page: p.page,
                text: cleanup::run_pipeline(&p.text),
            })
            .collect();

        let doc = Self::from_pages(pages);
        debug!(
            pages = doc.pages.len(),
            full_len = doc.full_text.len(),
            "document extracted"
        );
        doc
    }

    /// Assemble a document from already-extracted pages.
    pub fn from_pages(pages: Vec<PageText>) -> Self {
        let full_text = join_pages(&pages);
        Self { full_text, pages }
    }
}

/// Split raw text on [`PAGE_DELIMITER`], numbering pages from 1.
///
/// A trailing empty page after a final delimiter is dropped, and empty input
/// yields no pages.
pub fn split_pages(raw: &str) -> Vec<PageText> {
    if raw.is_empty() {
        return Vec::new();
    }

    let mut parts: Vec<&str> = raw.split(PAGE_DELIMITER).collect();
    if parts.len() > 1 && parts.last().is_some_and(|p| p.trim().is_empty()) {
        parts.pop();
    }

    parts
        .into_iter()
        .enumerate()
        .map(|(i, text)| PageText {
            page: i as u32 + 1,
            text: text.to_string(),
        })
        .collect()
}

/// Join pages with [`PAGE_DELIMITER`], in the given order.
pub fn join_pages(pages: &[PageText]) -> String {
    let mut out = String::with_capacity(pages.iter().map(|p| p.text.len() + 1).sum());
    for (i, page) in pages.iter().enumerate() {
        if i > 0 {
            out.push(PAGE_DELIMITER);
        }
        out.push_str(&page.text);
    }
    out
}

/// Cumulative exclusive end offset of each page in the joined full text.
///
/// Delimiter bytes are counted, so page `k` spans
/// `ends[k-1] + 1 .. ends[k]` in the text produced by [`join_pages`].
pub fn page_end_offsets(pages: &[PageText]) -> Vec<usize> {
    let delimiter_len = PAGE_DELIMITER.len_utf8();
    let mut offsets = Vec::with_capacity(pages.len());
    let mut cursor = 0usize;

    for (i, page) in pages.iter().enumerate() {
        if i > 0 {
            cursor += delimiter_len;
        }
        cursor += page.text.len();
        offsets.push(cursor);
    }

    offsets
}
