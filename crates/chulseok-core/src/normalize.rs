//! Week-number and identity extraction from scraped text.
//!
//! Posts follow the board's convention of tagging a submission with
//! "N주차" ("week N"), sometimes written as "*N주차" or "N 주차". Author
//! names carry decorations such as "김상현(반장)" that must be removed
//! before names can be compared.

use std::sync::LazyLock;

use regex::Regex;

use crate::model::WeekNumber;

/// Suffix marking a week number.
pub const WEEK_MARKER: &str = "주차";

static WEEK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*?(\d+)\s*주차").expect("week pattern compiles"));

static DIGIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d$").expect("digit pattern compiles"));

static PAREN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\([^)]*\)").expect("paren pattern compiles"));

/// First week number in `text`, or `None` if no digits are followed by the marker.
///
/// Any Unicode decimal digits are accepted ("３주차" is week 3). A value too
/// large for [`WeekNumber`] saturates to `WeekNumber::MAX`, which the
/// validation gate rejects as out of range.
pub fn extract_week_number(text: &str) -> Option<WeekNumber> {
    let caps = WEEK_RE.captures(text)?;
    Some(week_value(caps.get(1)?.as_str()))
}

fn week_value(digits: &str) -> WeekNumber {
    digits
        .chars()
        .filter_map(digit_value)
        .fold(0, |acc: WeekNumber, d| acc.saturating_mul(10).saturating_add(d))
}

/// Numeric value of a decimal digit in any script.
///
/// Unicode encodes every decimal digit set as a contiguous 0..=9 run, so the
/// value is the distance from the start of the run, modulo 10.
fn digit_value(c: char) -> Option<u32> {
    if let Some(d) = c.to_digit(10) {
        return Some(d);
    }
    let is_digit = |c: char| DIGIT_RE.is_match(c.encode_utf8(&mut [0; 4]));
    if !is_digit(c) {
        return None;
    }
    let mut start = c;
    while let Some(prev) = (start as u32).checked_sub(1).and_then(char::from_u32)
        && is_digit(prev)
    {
        start = prev;
    }
    Some((c as u32 - start as u32) % 10)
}

/// Strip parenthesized segments and surrounding whitespace.
///
/// An empty result means the raw value held no usable identity.
pub fn normalize_identity(raw: &str) -> String {
    PAREN_RE.replace_all(raw.trim(), "").trim().to_string()
}

/// Split a fragment such as "*3주차 김상현" into `(Some(3), "김상현")`.
///
/// Without a week marker the whole trimmed fragment is returned.
pub fn parse_week_and_identity(fragment: &str) -> (Option<WeekNumber>, String) {
    let Some(caps) = WEEK_RE.captures(fragment) else {
        return (None, fragment.trim().to_string());
    };
    let Some(whole) = caps.get(0) else {
        return (None, fragment.trim().to_string());
    };
    let week = caps.get(1).map(|m| week_value(m.as_str()));
    let mut rest = String::with_capacity(fragment.len());
    rest.push_str(&fragment[..whole.start()]);
    rest.push_str(&fragment[whole.end()..]);
    (week, rest.trim().to_string())
}

/// Canonical header label for a week column.
pub fn week_label(week: WeekNumber) -> String {
    format!("{week}{WEEK_MARKER}")
}
