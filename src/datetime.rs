//! Date/time utilities for filevault.
//!
//! Timestamps are persisted as UTC text in `YYYY-MM-DD HH:MM:SS` form and
//! exposed to API clients as `DateTime<Utc>` (RFC 3339 on the wire).

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Storage format for timestamps.
pub const DB_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Format a UTC timestamp for storage.
pub fn to_db(dt: &DateTime<Utc>) -> String {
    dt.format(DB_DATETIME_FORMAT).to_string()
}

/// Current time formatted for storage.
pub fn now_db() -> String {
    to_db(&Utc::now())
}

/// Parse a stored timestamp.
///
/// Accepts the storage format and RFC 3339. Returns `None` if neither matches.
pub fn from_db(datetime_str: &str) -> Option<DateTime<Utc>> {
    if let Ok(naive) = NaiveDateTime::parse_from_str(datetime_str, DB_DATETIME_FORMAT) {
        return Some(naive.and_utc());
    }
    DateTime::parse_from_rfc3339(datetime_str)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Parse a calendar date in `YYYY-MM-DD` form.
pub fn parse_date(date_str: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(date_str.trim(), "%Y-%m-%d").ok()
}
