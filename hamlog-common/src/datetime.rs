//! Lenient parsing of the date and time columns served by the log API.
//!
//! The server hands out whatever its database driver produced: plain
//! `YYYY-MM-DD`, an HTTP date such as `Sat, 17 Oct 2026 00:00:00 GMT`,
//! or an RFC 3339 timestamp. Times come as `HH:MM:SS`, `H:MM:SS` or `HH:MM`.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

pub const DATE_WIRE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_WIRE_FORMAT: &str = "%H:%M";

/// Parse a record date into a calendar date, dropping any time component.
pub fn parse_record_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(date) = NaiveDate::parse_from_str(raw, DATE_WIRE_FORMAT) {
        return Some(date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.date());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Some(dt.date());
    }

    None
}

/// Parse a record time, truncated to whole minutes.
pub fn parse_record_time(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    let parsed = NaiveTime::parse_from_str(raw, "%H:%M:%S%.f")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .or_else(|_| NaiveTime::parse_from_str(raw, TIME_WIRE_FORMAT))
        .ok()?;

    truncate_to_minute(parsed)
}

pub fn truncate_to_minute(time: NaiveTime) -> Option<NaiveTime> {
    NaiveTime::from_hms_opt(time.hour(), time.minute(), 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_record_date_formats() {
        assert_eq!(parse_record_date("2026-10-17"), Some(ymd(2026, 10, 17)));
        assert_eq!(parse_record_date("Sat, 17 Oct 2026 00:00:00 GMT"), Some(ymd(2026, 10, 17)));
        assert_eq!(parse_record_date("2026-10-17T08:30:00+08:00"), Some(ymd(2026, 10, 17)));
        assert_eq!(parse_record_date("2026-10-17 23:59:59"), Some(ymd(2026, 10, 17)));
        assert_eq!(parse_record_date("  "), None);
        assert_eq!(parse_record_date("yesterday"), None);
    }

    #[test]
    fn test_parse_record_time_truncates_seconds() {
        let hm = |h, m| NaiveTime::from_hms_opt(h, m, 0).unwrap();
        assert_eq!(parse_record_time("13:45:59"), Some(hm(13, 45)));
        assert_eq!(parse_record_time("9:05:00"), Some(hm(9, 5)));
        assert_eq!(parse_record_time("07:30"), Some(hm(7, 30)));
        assert_eq!(parse_record_time("25:00"), None);
        assert_eq!(parse_record_time(""), None);
    }
}
