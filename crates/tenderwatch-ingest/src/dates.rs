//! Registry date format (`dd.mm.yyyy`)

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate};
use thiserror::Error;

/// UTC offset the registry publishes its dates in (Moscow time as served
/// by the export, UTC+4).
pub const REGISTRY_UTC_OFFSET_SECS: i32 = 4 * 60 * 60;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DateError {
    #[error("date is empty")]
    Empty,

    #[error("'{0}' is not in dd.mm.yyyy format")]
    Format(String),

    #[error("'{0}' is not a calendar date")]
    OutOfRange(String),
}

fn registry_offset() -> Option<FixedOffset> {
    FixedOffset::east_opt(REGISTRY_UTC_OFFSET_SECS)
}

/// Parse `dd.mm.yyyy` as midnight in the registry's time zone
pub fn parse_rus_date(value: &str) -> Result<DateTime<FixedOffset>, DateError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(DateError::Empty);
    }

    let mut parts = value.splitn(3, '.');
    let (Some(day), Some(month), Some(year)) = (parts.next(), parts.next(), parts.next()) else {
        return Err(DateError::Format(value.to_string()));
    };

    let format_err = || DateError::Format(value.to_string());
    let day: u32 = day.parse().map_err(|_| format_err())?;
    let month: u32 = month.parse().map_err(|_| format_err())?;
    let year: i32 = year.parse().map_err(|_| format_err())?;

    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .zip(registry_offset())
        .and_then(|(midnight, offset)| midnight.and_local_timezone(offset).single())
        .ok_or_else(|| DateError::OutOfRange(value.to_string()))
}

/// Render a date back in the registry's `dd.mm.yyyy` form
pub fn format_rus_date(date: &DateTime<FixedOffset>) -> String {
    format!("{:02}.{:02}.{:04}", date.day(), date.month(), date.year())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_parse_rus_date() {
        let date = parse_rus_date("05.03.2014").unwrap();
        assert_eq!((date.day(), date.month(), date.year()), (5, 3, 2014));
        assert_eq!(date.hour(), 0);
        assert_eq!(date.offset().local_minus_utc(), REGISTRY_UTC_OFFSET_SECS);
    }

    #[test]
    fn test_parse_rus_date_rejects_garbage() {
        assert_eq!(parse_rus_date(""), Err(DateError::Empty));
        assert!(matches!(parse_rus_date("2014-03-05"), Err(DateError::Format(_))));
        assert!(matches!(parse_rus_date("05.03"), Err(DateError::Format(_))));
        assert!(matches!(parse_rus_date("05.03.2014 10:00"), Err(DateError::Format(_))));
    }

    #[test]
    fn test_parse_rus_date_rejects_impossible_day() {
        assert!(matches!(parse_rus_date("31.02.2014"), Err(DateError::OutOfRange(_))));
    }

    #[test]
    fn test_format_round_trip() {
        let date = parse_rus_date("1.2.2015").unwrap();
        assert_eq!(format_rus_date(&date), "01.02.2015");
    }
}
