//! Per-page cleanup pipeline for extracted text.
//!
//! Each cleanup pass is a function `&str -> String` applied in sequence.
//! Line structure is preserved: headings are detected line by line later on.

use std::sync::LazyLock;

use regex::Regex;

/// Run the full cleanup pipeline on the text of one page.
pub(crate) fn run_pipeline(text: &str) -> String {
    let mut result = text.to_string();

    result = normalize_line_endings(&result);
    result = strip_control_chars(&result);
    result = join_hyphenated_breaks(&result);
    result = trim_trailing_whitespace(&result);
    result = collapse_blank_lines(&result);

    result
}

// ---------------------------------------------------------------------------
// Pass 1: Line endings
// ---------------------------------------------------------------------------

/// Convert `\r\n` and lone `\r` to `\n`.
fn normalize_line_endings(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

// ---------------------------------------------------------------------------
// Pass 2: Control characters
// ---------------------------------------------------------------------------

/// Drop control characters other than newline and tab.
fn strip_control_chars(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect()
}

// ---------------------------------------------------------------------------
// Pass 3: Hyphenation
// ---------------------------------------------------------------------------

/// Re-join words split across lines with a hyphen (`exam-\nple` → `example`).
fn join_hyphenated_breaks(text: &str) -> String {
    static HYPHEN_BREAK_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(\p{Ll})-[ \t]*\n[ \t]*(\p{Ll})").expect("valid regex"));

    HYPHEN_BREAK_RE.replace_all(text, "$1$2").to_string()
}

// ---------------------------------------------------------------------------
// Pass 4: Trailing whitespace
// ---------------------------------------------------------------------------

/// Trim trailing whitespace from every line.
fn trim_trailing_whitespace(text: &str) -> String {
    text.lines().map(str::trim_end).collect::<Vec<_>>().join("\n")
}

// ---------------------------------------------------------------------------
// Pass 5: Blank lines
// ---------------------------------------------------------------------------

/// Collapse runs of 2+ blank lines into exactly one.
fn collapse_blank_lines(text: &str) -> String {
    static MULTI_BLANK_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

    MULTI_BLANK_RE.replace_all(text, "\n\n").to_string()
}
