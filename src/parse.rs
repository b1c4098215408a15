//! Numeric extraction from reference-table cells
//!
//! Cells such as `"5,1 - 10"` or `"12,5 kWp"` are written for humans.
//! Parsing never fails: unusable text degrades to a sentinel (`LoadRange::UNSET`)
//! or to `None`.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::models::LoadRange;

static RANGE_SPLIT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([0-9]+(?:\.[0-9]+)?)\s*(?:[-–—]|\ba\b|\bto\b)\s*([0-9]+(?:\.[0-9]+)?)\s*$")
        .expect("range pattern is valid")
});

static BARE_NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([0-9]+(?:\.[0-9]+)?)\s*$").expect("number pattern is valid")
});

static UNIT_SUFFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s*(kwp|kw|wp|w)\s*$").expect("unit pattern is valid"));

static NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9]+(?:[.,][0-9]+)?").expect("number token pattern is valid"));

/// Dash-only or blank cells mean "not supplied".
fn is_placeholder(text: &str) -> bool {
    let trimmed = text.trim();
    trimmed.is_empty() || trimmed.chars().all(|c| matches!(c, '-' | '–' | '—'))
}

/// Parse a load interval like `"5,1 - 10"` into an inclusive range.
///
/// A bare number is a degenerate range `(v, v)`. Bounds are kept in the order
/// written, even if reversed. Anything unusable yields [`LoadRange::UNSET`].
pub fn parse_range(text: &str) -> LoadRange {
    if is_placeholder(text) {
        return LoadRange::UNSET;
    }

    let text = strip_unit(text).replace(',', ".");

    if let Some(cap) = RANGE_SPLIT_RE.captures(&text) {
        if let (Ok(min), Ok(max)) = (cap[1].parse::<f64>(), cap[2].parse::<f64>()) {
            return LoadRange::new(min, max);
        }
    }

    if let Some(v) = parse_bound(&text) {
        return LoadRange::new(v, v);
    }

    debug!(text = %text, "unparseable load range, treating as unset");
    LoadRange::UNSET
}

/// A single load bound such as `"10,1"` or `"15 kW"`.
///
/// `None` for blank, dash-only or non-numeric cells, never zero.
pub fn parse_bound(text: &str) -> Option<f64> {
    if is_placeholder(text) {
        return None;
    }
    let text = strip_unit(text).replace(',', ".");
    BARE_NUMBER_RE
        .captures(&text)
        .and_then(|cap| cap[1].parse::<f64>().ok())
}

/// Extract the magnitude from a power cell like `"12,5 kWp"`.
///
/// Returns `None` for placeholders and text without a number; that is
/// "no ceiling", which is different from a ceiling of zero.
pub fn parse_power(text: &str) -> Option<f64> {
    if is_placeholder(text) {
        return None;
    }

    let stripped = strip_unit(text);
    let value = NUMBER_RE
        .find(&stripped)
        .and_then(|m| m.as_str().replace(',', ".").parse::<f64>().ok());

    if value.is_none() {
        debug!(text = %text, "no numeric power value");
    }
    value
}

fn strip_unit(text: &str) -> String {
    UNIT_SUFFIX_RE.replace(text.trim(), "").into_owned()
}
