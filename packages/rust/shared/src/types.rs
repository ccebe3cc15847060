//! Core domain types: headings, outlines, pages, and document records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper for heading identifiers (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HeadingId(pub Uuid);

impl HeadingId {
    /// Generate a new heading identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for HeadingId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for HeadingId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A UUID v7 wrapper for processed document identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(pub Uuid);

impl DocumentId {
    /// Generate a new document identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Heading / Outline
// ---------------------------------------------------------------------------

/// A detected heading.
///
/// `position` is the dense, zero-based ordinal in document order and is the
/// only ordering key used for "next heading" queries. `level` is a relative
/// nesting depth in `1..=6`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heading {
    pub id: HeadingId,
    /// Trimmed line content.
    pub text: String,
    pub level: u8,
    /// 1-based page number.
    pub page: u32,
    pub position: usize,
    /// Byte offset of `text` in the full text it was detected in.
    ///
    /// Absent for outlines supplied from outside; the segmenter then locates
    /// the heading by searching for its text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<usize>,
}

/// Ordered sequence of headings, sorted by `position`.
///
/// Built once per document and never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Heading>", into = "Vec<Heading>")]
pub struct Outline {
    headings: Vec<Heading>,
}

impl Outline {
    /// Build an outline, ordering the headings by `position`.
    pub fn new(mut headings: Vec<Heading>) -> Self {
        headings.sort_by_key(|h| h.position);
        Self { headings }
    }

    pub fn headings(&self) -> &[Heading] {
        &self.headings
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Heading> {
        self.headings.iter()
    }

    pub fn len(&self) -> usize {
        self.headings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headings.is_empty()
    }

    /// Find the heading with the given text, in position order.
    pub fn find_by_text(&self, text: &str) -> Option<&Heading> {
        let text = text.trim();
        self.headings.iter().find(|h| h.text == text)
    }
}

impl From<Vec<Heading>> for Outline {
    fn from(headings: Vec<Heading>) -> Self {
        Self::new(headings)
    }
}

impl From<Outline> for Vec<Heading> {
    fn from(outline: Outline) -> Self {
        outline.headings
    }
}

impl<'a> IntoIterator for &'a Outline {
    type Item = &'a Heading;
    type IntoIter = std::slice::Iter<'a, Heading>;

    fn into_iter(self) -> Self::IntoIter {
        self.headings.iter()
    }
}

// ---------------------------------------------------------------------------
// PageText
// ---------------------------------------------------------------------------

/// Text of one physical page, as produced by the extractor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageText {
    /// 1-based page number.
    pub page: u32,
    pub text: String,
}

// ---------------------------------------------------------------------------
// QA / document records
// ---------------------------------------------------------------------------

/// An answer to a question about a document, with the headings it cites.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QaAnswer {
    pub answer: String,
    /// Confidence in `[0, 1]`.
    pub confidence: f32,
    pub references: Vec<Heading>,
}

/// A fully processed document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRecord {
    pub id: DocumentId,
    pub filename: String,
    pub text: String,
    pub headings: Outline,
    pub summary: String,
    /// Number of pages.
    pub pages: usize,
    /// Size of the raw input in bytes.
    pub size: usize,
    /// SHA-256 of the raw input.
    pub content_hash: String,
    pub upload_date: DateTime<Utc>,
}

/// SHA-256 hex digest of some content.
pub fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn heading(text: &str, level: u8, position: usize) -> Heading {
        Heading {
            id: HeadingId::new(),
            text: text.into(),
            level,
            page: 1,
            position,
            offset: None,
        }
    }

    #[test]
    fn outline_orders_by_position() {
        let outline = Outline::new(vec![
            heading("Methods", 1, 2),
            heading("Introduction", 1, 0),
            heading("Background", 2, 1),
        ]);
        let texts: Vec<_> = outline.iter().map(|h| h.text.as_str()).collect();
        assert_eq!(texts, ["Introduction", "Background", "Methods"]);
    }

    #[test]
    fn outline_serializes_as_plain_array() {
        let outline = Outline::new(vec![heading("# Overview", 1, 0)]);
        let json = serde_json::to_string(&outline).expect("serialize");
        assert!(json.starts_with('['));
        assert!(!json.contains("offset"));

        let parsed: Outline = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed, outline);
    }

    #[test]
    fn outline_accepts_external_heading_shape() {
        let json = r#"[
            {"id":"6f1c1c52-3a5e-4a53-9f0e-5d3f7f1b2a10","text":"2. Methods","level":1,"page":3,"position":1},
            {"id":"0b8a6a2e-54c5-4d59-a2b8-73e0b5a6c9d1","text":"1. Introduction","level":1,"page":1,"position":0}
        ]"#;
        let outline: Outline = serde_json::from_str(json).expect("deserialize");
        assert_eq!(outline.len(), 2);
        assert_eq!(outline.headings()[0].text, "1. Introduction");
        assert_eq!(outline.headings()[0].offset, None);
    }

    #[test]
    fn find_by_text_trims_query() {
        let outline = Outline::new(vec![heading("Results", 2, 0)]);
        assert!(outline.find_by_text("  Results ").is_some());
        assert!(outline.find_by_text("Discussion").is_none());
    }

    #[test]
    fn content_hash_is_stable() {
        assert_eq!(content_hash("hello"), content_hash("hello"));
        assert_ne!(content_hash("hello"), content_hash("hello!"));
        assert_eq!(content_hash("").len(), 64);
    }

    #[test]
    fn document_record_uses_camel_case() {
        let record = DocumentRecord {
            id: DocumentId::new(),
            filename: "paper.txt".into(),
            text: String::new(),
            headings: Outline::default(),
            summary: String::new(),
            pages: 1,
            size: 0,
            content_hash: content_hash(""),
            upload_date: Utc::now(),
        };
        let json = serde_json::to_string(&record).expect("serialize");
        assert!(json.contains("\"uploadDate\""));
        assert!(json.contains("\"contentHash\""));
    }
}
