//! Timestamp utilities

use chrono::{DateTime, Datelike, Local, NaiveDate, TimeZone, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Parse an RFC 3339 timestamp stored as TEXT into UTC
pub fn parse_rfc3339(value: &str) -> crate::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| crate::Error::Internal(format!("Failed to parse timestamp '{}': {}", value, e)))
}

/// Calendar month (year, month) a UTC instant falls into on the local clock
pub fn local_month_of(instant: DateTime<Utc>) -> (i32, u32) {
    let local = instant.with_timezone(&Local);
    (local.year(), local.month())
}

/// The calendar month preceding `(year, month)`
pub fn previous_month(year: i32, month: u32) -> (i32, u32) {
    if month == 1 {
        (year - 1, 12)
    } else {
        (year, month - 1)
    }
}

/// First instant of a local calendar month, expressed in UTC
///
/// Returns `None` for an invalid month or a local midnight that does not exist.
pub fn local_month_start(year: i32, month: u32) -> Option<DateTime<Utc>> {
    let date = NaiveDate::from_ymd_opt(year, month, 1)?;
    let midnight = date.and_hms_opt(0, 0, 0)?;
    Local
        .from_local_datetime(&midnight)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_returns_valid_timestamp() {
        let timestamp = now();
        // After 2000-01-01 00:00:00 UTC
        assert!(timestamp.timestamp() > 946_684_800);
    }

    #[test]
    fn test_parse_rfc3339_roundtrip() {
        let ts = now();
        let parsed = parse_rfc3339(&ts.to_rfc3339()).unwrap();
        assert_eq!(parsed, ts);
    }

    #[test]
    fn test_parse_rfc3339_rejects_garbage() {
        assert!(parse_rfc3339("yesterday").is_err());
    }

    #[test]
    fn test_previous_month_wraps_year() {
        assert_eq!(previous_month(2025, 1), (2024, 12));
        assert_eq!(previous_month(2025, 7), (2025, 6));
    }

    #[test]
    fn test_local_month_start_is_in_that_month() {
        let start = local_month_start(2025, 3).unwrap();
        assert_eq!(local_month_of(start), (2025, 3));
    }

    #[test]
    fn test_local_month_start_invalid_month() {
        assert!(local_month_start(2025, 13).is_none());
    }
}
