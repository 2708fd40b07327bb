//! Timestamp helpers.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};

use crate::error::{AppError, Result};

/// Parse an RFC 3339 timestamp, as stored and as accepted on the command line.
///
/// Without an offset (`2024-01-31T08:00:00`) the value is taken as UTC, and a
/// bare date (`2024-01-31`) as midnight UTC.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(naive.and_utc());
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .ok_or_else(|| AppError::validation(format!("Invalid timestamp: {value:?}")))
}

/// Render a timestamp the way it is stored.
///
/// Fixed precision and a `Z` suffix, so stored values order lexicographically.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}
