//! Portal date and period strings.

use std::sync::LazyLock;

use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Utc};
use regex::Regex;

use crate::error::{AppError, Result};
use crate::models::{CanonicalDate, Period};

/// `year/month/day` with loose zero padding, ASCII digits only.
static DATE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9]{1,4})/([0-9]{1,2})/([0-9]{1,2})$").expect("valid date pattern")
});

const PERIOD_SEPARATOR: &str = " - ";

/// Portal local time, UTC+9.
const PORTAL_OFFSET_SECS: i32 = 9 * 3600;

/// Parse `2025/1/4` into `2025-01-04`.
pub fn parse_date(s: &str) -> Result<CanonicalDate> {
    let caps = DATE_PATTERN
        .captures(s)
        .ok_or_else(|| AppError::format(format!("invalid date string: {s:?}")))?;

    let part = |i: usize| -> Result<u32> {
        caps[i]
            .parse()
            .map_err(|e| AppError::format(format!("invalid date string {s:?}: {e}")))
    };

    Ok(CanonicalDate::from_parts(part(1)?, part(2)?, part(3)?))
}

/// Parse `2025/12/23 - 2026/1/23` into a start/end pair.
pub fn parse_period(s: &str) -> Result<Period> {
    let parts: Vec<&str> = s.split(PERIOD_SEPARATOR).collect();
    match parts.as_slice() {
        [start, end] if !start.is_empty() && !end.is_empty() => Ok(Period {
            start: parse_date(start)?,
            end: parse_date(end)?,
        }),
        _ => Err(AppError::format(format!("invalid period string: {s:?}"))),
    }
}

/// Midnight of `date` in portal local time, as a UTC instant.
pub fn to_utc_instant(date: &CanonicalDate) -> Result<DateTime<Utc>> {
    let naive = NaiveDate::parse_from_str(date.as_str(), "%Y-%m-%d")
        .map_err(|e| AppError::format(format!("not a calendar date {date}: {e}")))?;
    let offset = FixedOffset::east_opt(PORTAL_OFFSET_SECS)
        .ok_or_else(|| AppError::format("portal offset out of range"))?;

    offset
        .from_local_datetime(&naive.and_time(chrono::NaiveTime::MIN))
        .single()
        .map(|local| local.with_timezone(&Utc))
        .ok_or_else(|| AppError::format(format!("ambiguous local midnight for {date}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date_pads() {
        assert_eq!(parse_date("2025/12/4").unwrap().as_str(), "2025-12-04");
        assert_eq!(parse_date("2026/1/23").unwrap().as_str(), "2026-01-23");
        assert_eq!(parse_date("2026/01/03").unwrap().as_str(), "2026-01-03");
        assert_eq!(parse_date("99/1/1").unwrap().as_str(), "0099-01-01");
    }

    #[test]
    fn test_parse_date_rejects_malformed() {
        for bad in [
            "2025-12-04",
            "2025/12",
            "2025/12/04/01",
            "2025/ab/04",
            " 2025/12/04",
            "20255/1/1",
            "2025/123/1",
            "",
            "２０２５/1/1",
        ] {
            let err = parse_date(bad).unwrap_err();
            assert!(matches!(err, AppError::Format(_)), "accepted {bad:?}");
        }
    }

    #[test]
    fn test_parse_period() {
        let period = parse_period("2025/12/23 - 2026/1/23").unwrap();
        assert_eq!(period.start.as_str(), "2025-12-23");
        assert_eq!(period.end.as_str(), "2026-01-23");
    }

    #[test]
    fn test_parse_period_requires_one_separator() {
        assert!(parse_period("2025/12/23").is_err());
        assert!(parse_period("2025/12/23 -2026/1/23").is_err());
        assert!(parse_period("2025/12/23 - ").is_err());
        assert!(parse_period(" - 2026/1/23").is_err());
        assert!(parse_period("2025/1/1 - 2025/1/2 - 2025/1/3").is_err());
    }

    #[test]
    fn test_parse_period_propagates_date_errors() {
        assert!(matches!(
            parse_period("2025/12/23 - soon"),
            Err(AppError::Format(_))
        ));
    }

    #[test]
    fn test_to_utc_instant_is_previous_day_15h() {
        let date = parse_date("2025/12/4").unwrap();
        let instant = to_utc_instant(&date).unwrap();
        assert_eq!(instant.to_rfc3339(), "2025-12-03T15:00:00+00:00");
    }

    #[test]
    fn test_to_utc_instant_rejects_impossible_dates() {
        let date = parse_date("2025/2/30").unwrap();
        assert!(to_utc_instant(&date).is_err());
    }
}
