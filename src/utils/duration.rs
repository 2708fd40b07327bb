// src/utils/duration.rs

//! ISO 8601 duration parsing (`PT1H2M3S`).

use std::sync::OnceLock;

use regex::Regex;

fn duration_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^P(?:(\d+)W)?(?:(\d+)D)?(?:T(?:(\d+)H)?(?:(\d+)M)?(?:(\d+)S)?)?$").ok()
    })
    .as_ref()
}

/// Parse an ISO 8601 duration into whole seconds.
///
/// Supports weeks, days, hours, minutes and seconds. Returns `None` for
/// anything else (years/months are not used for media lengths).
pub fn parse_iso8601_duration(value: &str) -> Option<u64> {
    let caps = duration_regex()?.captures(value.trim())?;
    const UNITS: [u64; 5] = [7 * 86_400, 86_400, 3_600, 60, 1];

    let mut total = 0u64;
    for (idx, unit) in UNITS.iter().enumerate() {
        if let Some(m) = caps.get(idx + 1) {
            let n: u64 = m.as_str().parse().ok()?;
            total = total.checked_add(n.checked_mul(*unit)?)?;
        }
    }
    Some(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_common_durations() {
        assert_eq!(parse_iso8601_duration("PT45S"), Some(45));
        assert_eq!(parse_iso8601_duration("PT4M13S"), Some(253));
        assert_eq!(parse_iso8601_duration("PT1H2M3S"), Some(3723));
        assert_eq!(parse_iso8601_duration("P1DT1S"), Some(86_401));
        assert_eq!(parse_iso8601_duration("P0D"), Some(0));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(parse_iso8601_duration(""), None);
        assert_eq!(parse_iso8601_duration("4:13"), None);
        assert_eq!(parse_iso8601_duration("P1Y"), None);
    }
}
