//! Text-level primitives shared by the pagewise pipeline.
//!
//! - [`pages`] splits extractor output into pages and rebuilds the full text
//! - a cleanup pipeline normalizes whitespace, control characters and
//!   hyphenated line breaks per page
//! - [`words`] provides the lower-cased word sets and sentence splitting used
//!   for relevance scoring and attribution

mod cleanup;
pub mod pages;
pub mod words;

pub use pages::{ExtractedDocument, PAGE_DELIMITER, join_pages, page_end_offsets, split_pages};
pub use words::{char_len, overlap, split_sentences, truncate_chars, word_set};
