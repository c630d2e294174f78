//! Calendar helpers over caller-supplied local timestamps.
//!
//! All comparisons use the local calendar of the timestamp as given; nothing
//! here reads a clock.

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime};

const ISO_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Calendar day of a timestamp.
pub fn day_of(ts: NaiveDateTime) -> NaiveDate {
    ts.date()
}

/// Same calendar day, regardless of how many hours apart.
pub fn same_day(a: NaiveDateTime, b: NaiveDateTime) -> bool {
    a.date() == b.date()
}

/// Same calendar month of the same year.
pub fn same_month(a: NaiveDateTime, b: NaiveDateTime) -> bool {
    a.year() == b.year() && a.month() == b.month()
}

/// Format as `YYYY-MM-DDTHH:MM:SS[.fff]`.
pub fn to_iso8601(ts: NaiveDateTime) -> String {
    ts.format(ISO_FORMAT).to_string()
}

/// Parse `YYYY-MM-DDTHH:MM:SS[.fff]`, the same with a space separator,
/// or a bare `YYYY-MM-DD` (midnight).
pub fn parse_iso8601(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    NaiveDateTime::parse_from_str(s, ISO_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .map(|d| d.and_time(NaiveTime::MIN))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[test]
    fn test_same_day_ignores_hours() {
        assert!(same_day(at(2025, 3, 1, 1, 0), at(2025, 3, 1, 21, 0)));
    }

    #[test]
    fn test_midnight_boundary() {
        assert!(!same_day(at(2025, 3, 1, 23, 59), at(2025, 3, 2, 0, 1)));
    }

    #[test]
    fn test_same_month() {
        assert!(same_month(at(2025, 3, 1, 0, 0), at(2025, 3, 31, 23, 59)));
        assert!(!same_month(at(2025, 3, 31, 23, 59), at(2025, 4, 1, 0, 0)));
        assert!(!same_month(at(2024, 3, 10, 0, 0), at(2025, 3, 10, 0, 0)));
    }

    #[test]
    fn test_iso_format() {
        assert_eq!(to_iso8601(at(2026, 2, 21, 7, 5)), "2026-02-21T07:05:00");
    }

    #[test]
    fn test_parse_variants() {
        let expected = at(2026, 2, 21, 7, 5);
        assert_eq!(parse_iso8601("2026-02-21T07:05:00"), Some(expected));
        assert_eq!(parse_iso8601("2026-02-21 07:05:00"), Some(expected));
        assert_eq!(parse_iso8601("2026-02-21"), Some(at(2026, 2, 21, 0, 0)));
        assert_eq!(parse_iso8601("yesterday"), None);
    }

    #[test]
    fn test_parse_keeps_fraction() {
        let ts = at(2026, 2, 21, 7, 5) + chrono::Duration::milliseconds(250);
        assert_eq!(parse_iso8601(&to_iso8601(ts)), Some(ts));
    }
}
