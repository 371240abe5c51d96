//! Time handling utilities for gridded model output.
//!
//! NetCDF files describe their time axis with CF-convention units such as
//! `"hours since 1970-01-01 00:00:00"`. This module converts between those
//! numeric offsets and `DateTime<Utc>`, and provides the closed time window
//! used to restrict temporal reductions.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{HazardError, HazardResult};

/// Unit of a CF time axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl TimeUnit {
    /// Number of seconds in one unit.
    pub fn seconds(&self) -> f64 {
        match self {
            TimeUnit::Seconds => 1.0,
            TimeUnit::Minutes => 60.0,
            TimeUnit::Hours => 3600.0,
            TimeUnit::Days => 86400.0,
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "s" | "sec" | "secs" | "second" | "seconds" => Some(TimeUnit::Seconds),
            "min" | "mins" | "minute" | "minutes" => Some(TimeUnit::Minutes),
            "h" | "hr" | "hrs" | "hour" | "hours" => Some(TimeUnit::Hours),
            "d" | "day" | "days" => Some(TimeUnit::Days),
            _ => None,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            TimeUnit::Seconds => "seconds",
            TimeUnit::Minutes => "minutes",
            TimeUnit::Hours => "hours",
            TimeUnit::Days => "days",
        }
    }
}

/// Parsed CF time units: `<unit> since <reference>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CfTimeUnits {
    pub unit: TimeUnit,
    pub reference: DateTime<Utc>,
}

impl CfTimeUnits {
    /// Seconds since the Unix epoch, the encoding used for written files.
    pub fn epoch_seconds() -> Self {
        Self {
            unit: TimeUnit::Seconds,
            reference: DateTime::<Utc>::UNIX_EPOCH,
        }
    }

    /// Parse a CF units string such as `"hours since 1970-01-01 00:00:00"`.
    pub fn parse(units: &str) -> HazardResult<Self> {
        let invalid = || HazardError::invalid_parameter("time units", units.to_string());

        let (unit_str, reference_str) = units
            .split_once(" since ")
            .ok_or_else(invalid)?;
        let unit = TimeUnit::parse(unit_str.trim()).ok_or_else(invalid)?;
        let reference = parse_reference_time(reference_str.trim()).ok_or_else(invalid)?;

        Ok(Self { unit, reference })
    }

    /// Convert a numeric offset to an absolute time (millisecond precision).
    pub fn to_datetime(&self, value: f64) -> HazardResult<DateTime<Utc>> {
        if !value.is_finite() {
            return Err(HazardError::invalid_parameter(
                "time",
                format!("non-finite time value {}", value),
            ));
        }
        let out_of_range = || {
            HazardError::invalid_parameter(
                "time",
                format!("{} {} is out of range", value, self.to_cf_string()),
            )
        };

        let millis = (value * self.unit.seconds() * 1000.0).round();
        if millis.abs() >= i64::MAX as f64 {
            return Err(out_of_range());
        }
        let offset = Duration::try_milliseconds(millis as i64).ok_or_else(out_of_range)?;
        self.reference
            .checked_add_signed(offset)
            .ok_or_else(out_of_range)
    }

    /// Convert an absolute time back to a numeric offset in these units.
    pub fn from_datetime(&self, dt: &DateTime<Utc>) -> f64 {
        let millis = (*dt - self.reference).num_milliseconds() as f64;
        millis / 1000.0 / self.unit.seconds()
    }

    /// Render the CF units string.
    pub fn to_cf_string(&self) -> String {
        format!(
            "{} since {}",
            self.unit.as_str(),
            self.reference.format("%Y-%m-%d %H:%M:%S")
        )
    }
}

/// Parse the reference part of a CF units string.
///
/// Accepts `YYYY-MM-DD`, `YYYY-MM-DD HH:MM:SS` (with optional fraction), the
/// `T` separator, and a trailing `Z`/`UTC`/`+00:00` marker.
fn parse_reference_time(s: &str) -> Option<DateTime<Utc>> {
    let trimmed = s
        .trim_end_matches(" UTC")
        .trim_end_matches("+00:00")
        .trim_end_matches('Z')
        .trim();

    let candidate = trimmed.replace('T', " ");

    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(&candidate, fmt) {
            return Some(Utc.from_utc_datetime(&ndt));
        }
    }

    NaiveDate::parse_from_str(&candidate, "%Y-%m-%d")
        .ok()
        .map(|d| Utc.from_utc_datetime(&d.and_time(NaiveTime::MIN)))
}

/// Parse a `YYYYMMDDHH` date as used on the command line.
pub fn parse_compact_hour(s: &str) -> HazardResult<DateTime<Utc>> {
    if s.len() != 10 || !s.chars().all(|c| c.is_ascii_digit()) {
        return Err(HazardError::invalid_parameter(
            "date",
            format!("expected YYYYMMDDHH, got '{}'", s),
        ));
    }

    NaiveDateTime::parse_from_str(&format!("{}00", s), "%Y%m%d%H%M")
        .map(|ndt| Utc.from_utc_datetime(&ndt))
        .map_err(|e| HazardError::invalid_parameter("date", format!("'{}': {}", s, e)))
}

/// Midnight UTC of the day containing `dt`.
pub fn day_start(dt: &DateTime<Utc>) -> DateTime<Utc> {
    Utc.from_utc_datetime(&dt.date_naive().and_time(NaiveTime::MIN))
}

/// A closed time interval `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Create a window, rejecting `start > end`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> HazardResult<Self> {
        if start > end {
            return Err(HazardError::invalid_parameter(
                "time window",
                format!("start {} is after end {}", start, end),
            ));
        }
        Ok(Self { start, end })
    }

    /// Inclusive membership test.
    pub fn contains(&self, dt: &DateTime<Utc>) -> bool {
        dt >= &self.start && dt <= &self.end
    }

    /// Length of the window.
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cf_units_hours() {
        let units = CfTimeUnits::parse("hours since 1970-01-01 00:00:00").unwrap();
        assert_eq!(units.unit, TimeUnit::Hours);
        assert_eq!(units.reference, DateTime::<Utc>::UNIX_EPOCH);

        let dt = units.to_datetime(24.0).unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(1970, 1, 2, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_cf_units_variants() {
        assert!(CfTimeUnits::parse("seconds since 1970-01-01").is_ok());
        assert!(CfTimeUnits::parse("days since 2000-01-01T00:00:00Z").is_ok());
        assert!(CfTimeUnits::parse("minutes since 2015-04-19 23:00:00.0").is_ok());
        assert!(CfTimeUnits::parse("hours since 1970-01-01 00:00:00 UTC").is_ok());
        assert!(CfTimeUnits::parse("fortnights since 1970-01-01").is_err());
        assert!(CfTimeUnits::parse("hours").is_err());
    }

    #[test]
    fn test_cf_roundtrip() {
        let units = CfTimeUnits::parse("minutes since 2015-04-19 00:00:00").unwrap();
        let dt = Utc.with_ymd_and_hms(2015, 4, 21, 23, 10, 0).unwrap();
        let offset = units.from_datetime(&dt);
        assert_eq!(units.to_datetime(offset).unwrap(), dt);
    }

    #[test]
    fn test_to_datetime_rejects_out_of_range() {
        let units = CfTimeUnits::parse("hours since 1970-01-01 00:00:00").unwrap();

        // netCDF default float fill in an unwritten record
        let err = units.to_datetime(9.969_209_968_386_869e36).unwrap_err();
        assert_eq!(err.kind(), "InvalidParameterError");

        assert!(units.to_datetime(1e12).is_err());
        assert!(units.to_datetime(-1e12).is_err());
        assert!(units.to_datetime(f64::NAN).is_err());
    }

    #[test]
    fn test_parse_compact_hour() {
        let dt = parse_compact_hour("2015041900").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2015, 4, 19, 0, 0, 0).unwrap());

        assert!(parse_compact_hour("20150419").is_err());
        assert!(parse_compact_hour("2015041925").is_err());
    }

    #[test]
    fn test_time_window() {
        let start = Utc.with_ymd_and_hms(2015, 4, 19, 23, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2015, 4, 21, 23, 0, 0).unwrap();
        let window = TimeWindow::new(start, end).unwrap();

        assert!(window.contains(&start));
        assert!(window.contains(&end));
        assert!(!window.contains(&(end + Duration::minutes(10))));
        assert!(TimeWindow::new(end, start).is_err());
    }

    #[test]
    fn test_day_start() {
        let dt = Utc.with_ymd_and_hms(2015, 4, 20, 17, 40, 0).unwrap();
        assert_eq!(
            day_start(&dt),
            Utc.with_ymd_and_hms(2015, 4, 20, 0, 0, 0).unwrap()
        );
    }
}
