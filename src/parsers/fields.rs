//! Scalar field parsing: ratings, air dates, whitespace.

use chrono::NaiveDate;

use super::ParseError;

/// Day, abbreviated month, year: `17 Apr 2011` (after dots are removed).
pub const AIR_DATE_FORMAT: &str = "%d %b %Y";

/// Same layout with the month spelled out: `3 June 2012`.
const AIR_DATE_FORMAT_LONG: &str = "%d %B %Y";

/// Collapse runs of whitespace into single spaces and trim.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parse a rating; anything non-numeric or outside [0, 10] is absent.
pub fn parse_rating(text: &str) -> Option<f64> {
    let value: f64 = text.trim().parse().ok()?;
    if value.is_finite() && (0.0..=10.0).contains(&value) {
        Some(value)
    } else {
        None
    }
}

/// Parse an air date written as day, month name, year.
///
/// Listing pages abbreviate most months with a trailing dot (`17 Apr. 2011`)
/// but not short ones (`22 May 2011`); dots are dropped before parsing.
/// Full month names are accepted as well.
pub fn parse_air_date(text: &str) -> Result<NaiveDate, ParseError> {
    let cleaned = collapse_whitespace(&text.replace('.', ""));
    NaiveDate::parse_from_str(&cleaned, AIR_DATE_FORMAT)
        .or_else(|_| NaiveDate::parse_from_str(&cleaned, AIR_DATE_FORMAT_LONG))
        .map_err(|_| ParseError::AirDate {
            value: collapse_whitespace(text),
            format: AIR_DATE_FORMAT,
        })
}
