//! Calendar-day helpers for date-scoped record queries.

use chrono::{Days, NaiveDate};

use crate::ValidationError;

/// Longest day range a single request may scan: one query per day.
pub const MAX_DAY_COUNT: u32 = 366;

/// Parse a `YYYY-MM-DD` day as accepted at the request boundary.
///
/// Exactly ten characters, zero-padded, and a real calendar date.
/// "2019-10-01" is accepted; "2019-1-1", "2019-10-01 12:00" and
/// "2019-02-30" are not.
pub fn parse_day(s: &str) -> Result<NaiveDate, ValidationError> {
    let invalid = || ValidationError::InvalidDate(s.to_string());

    let bytes = s.as_bytes();
    let shape_ok = bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        });
    if !shape_ok {
        return Err(invalid());
    }

    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| invalid())
}

/// The `n` most recent calendar days ending at `today`, newest first.
///
/// `recent_days(d, 3)` yields `[d, d-1, d-2]`; `n == 0` yields nothing.
pub fn recent_days(today: NaiveDate, n: u32) -> Vec<NaiveDate> {
    (0..u64::from(n))
        .map_while(|back| today.checked_sub_days(Days::new(back)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn parses_padded_day() {
        assert_eq!(parse_day("2019-10-01").unwrap(), day("2019-10-01"));
    }

    #[test]
    fn rejects_unpadded() {
        assert!(matches!(
            parse_day("2019-1-1"),
            Err(ValidationError::InvalidDate(_))
        ));
    }

    #[test]
    fn rejects_time_suffix() {
        assert!(parse_day("2019-10-01 12:00").is_err());
    }

    #[test]
    fn rejects_impossible_date() {
        assert!(parse_day("2019-02-30").is_err());
    }

    #[test]
    fn rejects_empty() {
        assert!(parse_day("").is_err());
    }

    #[test]
    fn recent_days_newest_first() {
        let days = recent_days(day("2026-03-02"), 3);
        assert_eq!(days, vec![day("2026-03-02"), day("2026-03-01"), day("2026-02-28")]);
    }

    #[test]
    fn recent_days_zero() {
        assert!(recent_days(day("2026-03-02"), 0).is_empty());
    }

    #[test]
    fn recent_days_single_is_today() {
        assert_eq!(recent_days(day("2026-10-18"), 1), vec![day("2026-10-18")]);
    }
}
