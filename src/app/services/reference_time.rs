//! Reference time resolution.
//!
//! Observation times in the output are stored as offsets from a reference
//! time. The reference is the first canonical analysis hour (00, 06, 12 or
//! 18Z) strictly after the earliest selected message. Timestamps travel as
//! integers of the form YYYYMMDDHH, so the earliest message is simply the
//! minimum integer.

use crate::constants::SYNOPTIC_HOURS;
use crate::{Error, Result};
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Timelike};
use std::fmt;

/// An analysis time, held at hour precision
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ReferenceTime {
    datetime: NaiveDateTime,
}

impl ReferenceTime {
    pub fn datetime(&self) -> NaiveDateTime {
        self.datetime
    }

    /// Integer YYYYMMDDHH form
    pub fn yyyymmddhh(&self) -> i64 {
        format_yyyymmddhh(self.datetime)
    }

    /// Units string for offsets from this time
    pub fn time_units(&self) -> String {
        format!(
            "seconds since {:04}-{:02}-{:02} {:02}:00 UTC",
            self.datetime.year(),
            self.datetime.month(),
            self.datetime.day(),
            self.datetime.hour()
        )
    }

    /// Seconds from this reference to `time` (negative when earlier)
    pub fn seconds_until(&self, time: NaiveDateTime) -> f64 {
        (time - self.datetime).num_milliseconds() as f64 / 1000.0
    }
}

impl fmt::Display for ReferenceTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.yyyymmddhh())
    }
}

/// Split a YYYYMMDDHH integer into a calendar time
pub fn parse_yyyymmddhh(value: i64) -> Result<NaiveDateTime> {
    if !(1_000_000_000..=9_999_999_999).contains(&value) {
        return Err(Error::invalid_timestamp(value, "expected 10 digits YYYYMMDDHH"));
    }

    let year = (value / 1_000_000) as i32;
    let month = (value / 10_000 % 100) as u32;
    let day = (value / 100 % 100) as u32;
    let hour = (value % 100) as u32;

    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| Error::invalid_timestamp(value, "no such calendar date"))?
        .and_hms_opt(hour, 0, 0)
        .ok_or_else(|| Error::invalid_timestamp(value, "hour out of range"))
}

/// Join a calendar time back into YYYYMMDDHH
pub fn format_yyyymmddhh(datetime: NaiveDateTime) -> i64 {
    i64::from(datetime.year()) * 1_000_000
        + i64::from(datetime.month()) * 10_000
        + i64::from(datetime.day()) * 100
        + i64::from(datetime.hour())
}

/// Next analysis time strictly after `earliest`
///
/// Subtracting the start hour from {0, 6, 12, 18, 24} leaves at least one
/// positive difference (24 stands for 00Z of the following day); the first
/// positive one is the increment. Adding it as a duration carries into the
/// next day, month or year.
pub fn resolve_reference_time(earliest: i64) -> Result<ReferenceTime> {
    let start = parse_yyyymmddhh(earliest)?;
    let start_hour = i64::from(start.hour());

    let increment = SYNOPTIC_HOURS
        .iter()
        .map(|&h| i64::from(h) - start_hour)
        .find(|&diff| diff > 0)
        .unwrap_or(24 - start_hour);

    Ok(ReferenceTime {
        datetime: start + Duration::hours(increment),
    })
}

/// [`resolve_reference_time`] on the integer form
pub fn resolve(earliest: i64) -> Result<i64> {
    resolve_reference_time(earliest).map(|r| r.yyyymmddhh())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_within_day() {
        assert_eq!(resolve(2023010105).unwrap(), 2023010106);
        assert_eq!(resolve(2023010106).unwrap(), 2023010112);
        assert_eq!(resolve(2023010111).unwrap(), 2023010112);
        assert_eq!(resolve(2023010117).unwrap(), 2023010118);
    }

    #[test]
    fn test_resolve_is_strictly_later() {
        assert_ne!(resolve(2023010100).unwrap(), 2023010100);
        assert_eq!(resolve(2023010100).unwrap(), 2023010106);
    }

    #[test]
    fn test_resolve_rolls_over_day_month_year() {
        assert_eq!(resolve(2023010123).unwrap(), 2023010200);
        assert_eq!(resolve(2023010118).unwrap(), 2023010200);
        assert_eq!(resolve(2023013119).unwrap(), 2023020100);
        assert_eq!(resolve(2023123122).unwrap(), 2024010100);
        assert_eq!(resolve(2024022821).unwrap(), 2024022900);
    }

    #[test]
    fn test_invalid_timestamps() {
        assert!(matches!(
            resolve(2023013225),
            Err(Error::InvalidTimestamp { value: 2023013225, .. })
        ));
        assert!(resolve(2023023012).is_err());
        assert!(resolve(2023010124).is_err());
        assert!(resolve(20230101).is_err());
        assert!(resolve(9_999_999_999).is_err());
    }

    #[test]
    fn test_time_units() {
        let reference = resolve_reference_time(2021060101).unwrap();
        assert_eq!(reference.yyyymmddhh(), 2021060106);
        assert_eq!(reference.time_units(), "seconds since 2021-06-01 06:00 UTC");
        assert_eq!(reference.to_string(), "2021060106");
    }

    #[test]
    fn test_seconds_until() {
        let reference = resolve_reference_time(2021060101).unwrap();
        let earlier = parse_yyyymmddhh(2021060103).unwrap();
        assert_eq!(reference.seconds_until(earlier), -3.0 * 3600.0);

        let later = earlier + Duration::minutes(3 * 60 + 30);
        assert_eq!(reference.seconds_until(later), 30.0 * 60.0);
    }

    #[test]
    fn test_format_round_trip() {
        let dt = parse_yyyymmddhh(1999123118).unwrap();
        assert_eq!(format_yyyymmddhh(dt), 1999123118);
    }
}
