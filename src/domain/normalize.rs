// src/domain/normalize.rs
//
// Text canonicalization shared by the matcher and the business rules.
// Everything here is total: bad input degrades to None or an empty string.

use chrono::NaiveDate;

/// Canonicalize a postal address for similarity testing (never for display):
/// lowercase, drop everything outside `[a-z0-9 ]`, collapse whitespace runs.
pub fn normalize_address(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_space = false;
    for c in raw.chars() {
        let c = c.to_ascii_lowercase();
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.push(c);
        } else {
            // whitespace and punctuation both act as separators
            pending_space = true;
        }
    }
    out
}

/// Convert a currency string to whole dollars, truncating cents.
/// `"$426,100.00"` -> `Some(426100)`; `"TBD"` and `""` -> `None`.
pub fn money_to_integer(text: &str) -> Option<i64> {
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    if !cleaned.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    let int_part: String = cleaned
        .split('.')
        .next()
        .unwrap_or("")
        .chars()
        .filter(|c| c.is_ascii_digit())
        .collect();
    if int_part.is_empty() {
        // only fractional digits, e.g. ".99" — truncates to zero
        return Some(0);
    }
    int_part.parse().ok()
}

/// Strict parse of the sheet date format "Oct 27, 2025". Tolerates extra
/// interior whitespace (a double space before the day shows up in scraped
/// text). Empty input is "no date", not an error.
pub fn parse_fixed_date(text: &str) -> Option<NaiveDate> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(d) = NaiveDate::parse_from_str(trimmed, "%b %d, %Y") {
        return Some(d);
    }
    let collapsed = trimmed.split_whitespace().collect::<Vec<_>>().join(" ");
    NaiveDate::parse_from_str(&collapsed, "%b %d, %Y").ok()
}

/// Remove a weekday prefix: "Monday, Oct 27, 2025" -> "Oct 27, 2025".
/// If the token before the first comma is not purely alphabetic (as in
/// "Oct 27, 2025" itself), the input is returned unchanged.
pub fn strip_weekday_prefix(text: &str) -> &str {
    let s = text.trim();
    if let Some((first, rest)) = s.split_once(',') {
        let token = first.trim();
        if !token.is_empty() && token.chars().all(|c| c.is_alphabetic()) {
            return rest.trim();
        }
    }
    s
}

/// Weekday-tolerant date parse used for the "Auction Start Date" column.
pub fn parse_auction_date(text: &str) -> Option<NaiveDate> {
    parse_fixed_date(strip_weekday_prefix(text))
}
