//! Line-local heading classifier.
//!
//! Each non-trivial line is tested against a fixed, ordered table of
//! heading-shape rules. The first rule that matches decides the level; rules
//! are never combined. Numbered and marker-based structure therefore
//! outranks casing heuristics.

use std::sync::LazyLock;

use regex::Regex;

/// Lines shorter than this (in characters, after trimming) are body text.
pub const MIN_HEADING_CHARS: usize = 3;

/// Lines longer than this (in characters, after trimming) are body text.
pub const MAX_HEADING_CHARS: usize = 100;

/// Deepest heading level.
pub const MAX_LEVEL: u8 = 6;

/// The rule that recognized a heading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadingShape {
    /// `#`, `##`, ... prefixed lines.
    PrefixMarker,
    /// `2.3.1 Title`
    DecimalNumbered,
    /// `Chapter 4`, `Section 2 Scope`, `Part IV`
    Labeled,
    /// `RESULTS AND DISCUSSION`
    AllCaps,
    /// `Related Work:`
    TitleCase,
    /// `12. Capitalized text, even when sentence-like.`
    NumberedSentence,
}

/// A heading found at `line_index` of the classified input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub line_index: usize,
    pub level: u8,
    pub shape: HeadingShape,
}

/// One entry of the rule table: a shape and how to compute its level.
struct HeadingRule {
    shape: HeadingShape,
    level: fn(&str) -> Option<u8>,
}

/// Rules in priority order. The first match wins.
static RULES: [HeadingRule; 6] = [
    HeadingRule {
        shape: HeadingShape::PrefixMarker,
        level: prefix_marker_level,
    },
    HeadingRule {
        shape: HeadingShape::DecimalNumbered,
        level: decimal_numbered_level,
    },
    HeadingRule {
        shape: HeadingShape::Labeled,
        level: labeled_level,
    },
    HeadingRule {
        shape: HeadingShape::AllCaps,
        level: all_caps_level,
    },
    HeadingRule {
        shape: HeadingShape::TitleCase,
        level: title_case_level,
    },
    HeadingRule {
        shape: HeadingShape::NumberedSentence,
        level: numbered_sentence_level,
    },
];

/// Classify a sequence of lines, returning the headings in line order.
pub fn classify<S: AsRef<str>>(lines: &[S]) -> Vec<Classification> {
    lines
        .iter()
        .enumerate()
        .filter_map(|(line_index, line)| {
            classify_line(line.as_ref()).map(|(shape, level)| Classification {
                line_index,
                level,
                shape,
            })
        })
        .collect()
}

/// Classify a single line. Returns `None` for body text.
pub fn classify_line(line: &str) -> Option<(HeadingShape, u8)> {
    let line = line.trim();
    let len = line.chars().count();
    if !(MIN_HEADING_CHARS..=MAX_HEADING_CHARS).contains(&len) {
        return None;
    }

    RULES.iter().find_map(|rule| {
        (rule.level)(line).map(|level| (rule.shape, level.clamp(1, MAX_LEVEL)))
    })
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

fn prefix_marker_level(line: &str) -> Option<u8> {
    static PREFIX_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"^(#+)\s*[^#\s]").expect("valid regex"));

    let caps = PREFIX_RE.captures(line)?;
    Some(clamp_count(caps[1].len()))
}

fn decimal_numbered_level(line: &str) -> Option<u8> {
    static DECIMAL_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"^(\d+(?:\.\d+)*)\.?\s+(\S.*)$").expect("valid regex")
    });

    let caps = DECIMAL_RE.captures(line)?;
    let title = &caps[2];
    if title.starts_with(|c: char| c.is_lowercase()) || ends_like_sentence(title) {
        return None;
    }
    Some(clamp_count(caps[1].split('.').count()))
}

fn labeled_level(line: &str) -> Option<u8> {
    static LABELED_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?i)^(chapter|section|part|article)\s+(\d+|[ivxlcdm]+)\b")
            .expect("valid regex")
    });

    LABELED_RE.is_match(line).then_some(1)
}

fn all_caps_level(line: &str) -> Option<u8> {
    let letters: Vec<char> = line.chars().filter(|c| c.is_alphabetic()).collect();

    (letters.len() >= MIN_HEADING_CHARS && letters.iter().all(|c| c.is_uppercase())).then_some(2)
}

fn title_case_level(line: &str) -> Option<u8> {
    // Connector words that may stay lowercase inside a title.
    const MINOR_WORDS: &[&str] = &[
        "a", "an", "and", "as", "at", "by", "for", "from", "in", "of", "on", "or", "the", "to",
        "vs", "with",
    ];

    let body = line.strip_suffix(':').unwrap_or(line);
    if body.contains(['.', '!', '?', ';']) || body.ends_with(',') {
        return None;
    }

    let mut words = body.split_whitespace();
    let first = words.next()?;
    if !first.starts_with(|c: char| c.is_uppercase()) {
        return None;
    }

    let capitalized = words.all(|word| {
        match word.chars().find(|c| c.is_alphanumeric()) {
            Some(c) if c.is_uppercase() || c.is_ascii_digit() => true,
            Some(_) => MINOR_WORDS.contains(&word.to_lowercase().as_str()),
            None => true,
        }
    });

    capitalized.then_some(3)
}

fn numbered_sentence_level(line: &str) -> Option<u8> {
    static NUMBERED_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"^\d+\.\s+\p{Lu}").expect("valid regex"));

    NUMBERED_RE.is_match(line).then_some(2)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn ends_like_sentence(text: &str) -> bool {
    text.trim_end().ends_with(['.', '!', '?', ';', ','])
}

fn clamp_count(count: usize) -> u8 {
    count.min(MAX_LEVEL as usize) as u8
}
