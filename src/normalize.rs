//! Canonical identifiers for headers, location names and category codes
//!
//! Reference tables are authored by hand, so the same column or city shows up
//! as `"Tensão (V)"`, `"tensao"` or `" TENSAO "`. Everything that is compared
//! goes through one of these functions first.

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Canonicalize free-form text: annotations in parentheses are dropped,
/// accents removed, case folded, and whitespace runs become `_`.
pub fn normalize(text: &str) -> String {
    collapse(&fold(text), char::is_whitespace)
}

/// Like [`normalize`], but any run of non-alphanumeric characters becomes a
/// single `_`, with no leading or trailing `_`. Used for table headers.
pub fn normalize_strict(text: &str) -> String {
    collapse(&fold(text), |c| !c.is_alphanumeric())
        .trim_matches('_')
        .to_string()
}

/// Strip annotations, lower-case, then remove combining marks.
/// Lower-casing first keeps the result stable when folding itself
/// introduces marks (e.g. `İ`).
fn fold(text: &str) -> String {
    strip_parenthesized(text)
        .to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .trim()
        .to_string()
}

fn strip_parenthesized(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut depth = 0usize;
    for c in text.chars() {
        match c {
            '(' => depth += 1,
            ')' if depth > 0 => depth -= 1,
            _ if depth == 0 => out.push(c),
            _ => {}
        }
    }
    // Unbalanced "(" swallowed the tail; keep the original instead.
    if depth > 0 { text.to_string() } else { out }
}

fn collapse(text: &str, is_separator: impl Fn(char) -> bool) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_run = false;
    for c in text.chars() {
        if is_separator(c) {
            if !in_run {
                out.push('_');
                in_run = true;
            }
        } else {
            out.push(c);
            in_run = false;
        }
    }
    out
}
