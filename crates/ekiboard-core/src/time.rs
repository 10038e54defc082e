//! Wall-clock helpers.
//!
//! All scheduling runs on local naive time: the upstream transit site and
//! the display both speak local HH:MM, so there is no UTC round trip.

use chrono::{Local, NaiveDateTime, NaiveTime};

use crate::error::{CoreError, Result};

/// Format used for every persisted timestamp (`last_updated`, `last_fetched`).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// Current local wall-clock time.
pub fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// Parse a displayed clock time such as `06:50`, `6:50` or `06:50発`.
///
/// Arrival/departure markers and surrounding whitespace are ignored.
pub fn parse_clock(raw: &str) -> Result<NaiveTime> {
    let trimmed = raw
        .trim()
        .trim_end_matches(['発', '着'])
        .trim();
    NaiveTime::parse_from_str(trimmed, "%H:%M")
        .map_err(|_| CoreError::InvalidTime(raw.to_string()))
}

/// Normalise a displayed clock time to `HH:MM`, or return it trimmed when it
/// does not look like a clock time at all.
pub fn normalize_clock(raw: &str) -> String {
    match parse_clock(raw) {
        Ok(t) => t.format("%H:%M").to_string(),
        Err(_) => raw.trim().to_string(),
    }
}

pub fn format_timestamp(at: NaiveDateTime) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a persisted timestamp. Accepts both the fractional and whole-second
/// forms so hand-edited snapshot files still work.
pub fn parse_timestamp(raw: &str) -> Result<NaiveDateTime> {
    raw.trim()
        .parse::<NaiveDateTime>()
        .map_err(|_| CoreError::InvalidTime(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn parse_clock_plain() {
        assert_eq!(
            parse_clock("06:50").unwrap(),
            NaiveTime::from_hms_opt(6, 50, 0).unwrap()
        );
    }

    #[test]
    fn parse_clock_strips_markers() {
        assert_eq!(
            parse_clock(" 23:58発 ").unwrap(),
            NaiveTime::from_hms_opt(23, 58, 0).unwrap()
        );
        assert_eq!(
            parse_clock("0:12着").unwrap(),
            NaiveTime::from_hms_opt(0, 12, 0).unwrap()
        );
    }

    #[test]
    fn parse_clock_rejects_garbage() {
        assert!(parse_clock("").is_err());
        assert!(parse_clock("--:--").is_err());
        assert!(parse_clock("25:00").is_err());
    }

    #[test]
    fn normalize_clock_pads_hour() {
        assert_eq!(normalize_clock("6:05発"), "06:05");
        assert_eq!(normalize_clock("n/a"), "n/a");
    }

    #[test]
    fn timestamp_round_trips() {
        let at = NaiveDate::from_ymd_opt(2025, 11, 7)
            .unwrap()
            .and_hms_micro_opt(3, 4, 5, 123_456)
            .unwrap();
        assert_eq!(parse_timestamp(&format_timestamp(at)).unwrap(), at);
    }

    #[test]
    fn timestamp_accepts_whole_seconds() {
        let parsed = parse_timestamp("2025-11-07T03:00:00").unwrap();
        assert_eq!(parsed.format("%H:%M").to_string(), "03:00");
    }

    #[test]
    fn timestamp_rejects_garbage() {
        assert!(parse_timestamp("yesterday").is_err());
    }
}
