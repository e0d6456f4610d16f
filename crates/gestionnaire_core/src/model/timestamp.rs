//! Timestamp stamping and lenient calendar parsing.
//!
//! # Invariants
//! - Stamped values are UTC RFC 3339 with millisecond precision and `Z`.
//! - Parsing never converts between zones: the calendar fields written in
//!   the stored string are the ones reported.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};

const NAIVE_DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
];
const NAIVE_DATE_FORMAT: &str = "%Y-%m-%d";

/// Returns the current time in the stored `created_at` format.
pub fn now_iso8601() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parses an ISO-8601 date or date-time into its calendar date.
///
/// Returns `None` for anything unparseable; callers decide whether that is
/// an error or a skipped record.
pub fn parse_calendar_date(value: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(with_offset) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(with_offset.date_naive());
    }
    for format in NAIVE_DATE_TIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(naive.date());
        }
    }
    NaiveDate::parse_from_str(trimmed, NAIVE_DATE_FORMAT).ok()
}
