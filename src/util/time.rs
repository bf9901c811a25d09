//! Timestamp type and time formatting helpers for fieldlog.
//!
//! [`Timestamp`] is a second-resolution UTC instant. The rest of the crate
//! only relies on its ordering, its epoch-seconds value, its calendar date
//! and its text form, so the chrono representation stays private.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc};

use crate::util::error::{FieldLogError, Result};

/// Canonical text form written into log lines. Always contains `:`.
const CANONICAL_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Accepted date-time layouts, tried in order.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// A UTC instant with one-second resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Build from seconds since the Unix epoch. `None` if out of chrono's range.
    pub fn from_epoch(secs: i64) -> Option<Self> {
        DateTime::from_timestamp(secs, 0).map(Self)
    }

    /// Build from calendar fields interpreted as UTC.
    pub fn from_ymd_hms(year: i32, month: u32, day: u32, h: u32, m: u32, s: u32) -> Option<Self> {
        let naive = NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(h, m, s)?;
        Some(Self(naive.and_utc()))
    }

    /// Midnight UTC at the start of `date`.
    pub fn start_of_day(date: NaiveDate) -> Option<Self> {
        Some(Self(date.and_hms_opt(0, 0, 0)?.and_utc()))
    }

    /// Current wall-clock time, truncated to whole seconds.
    pub fn now() -> Self {
        let secs = Utc::now().timestamp();
        // Utc::now() is always representable.
        Self::from_epoch(secs).unwrap_or(Self(DateTime::UNIX_EPOCH))
    }

    /// Seconds since the Unix epoch.
    pub fn epoch_seconds(&self) -> i64 {
        self.0.timestamp()
    }

    /// Calendar date (UTC) this instant falls on.
    pub fn date(&self) -> NaiveDate {
        self.0.date_naive()
    }

    /// `M-D-YYYY` without zero padding, as used in daily file names.
    pub fn mdy(&self) -> String {
        let d = self.date();
        format!("{}-{}-{}", d.month(), d.day(), d.year())
    }

    /// `self + secs`, or `None` on overflow.
    pub fn checked_add_secs(&self, secs: i64) -> Option<Self> {
        Self::from_epoch(self.epoch_seconds().checked_add(secs)?)
    }

    /// Parse timestamp text.
    ///
    /// Accepts:
    /// - `YYYY-MM-DDTHH:MM:SS` (canonical) and `YYYY-MM-DD HH:MM:SS`,
    ///   optionally with fractional seconds (truncated)
    /// - RFC 3339 with an offset, normalised to UTC
    /// - `YYYY-MM-DD` (midnight)
    /// - a bare integer, read as epoch seconds
    /// - `<any of the above>+<seconds>`, the relative form written by
    ///   [`crate::core::logger::DataLogger::log_relative`]
    pub fn parse(input: &str) -> Result<Self> {
        let s = input.trim();
        if let Some(ts) = parse_absolute(s) {
            return Ok(ts);
        }

        if let Some((base, offset)) = s.rsplit_once('+') {
            let digits = offset.strip_prefix('-').unwrap_or(offset);
            if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
                if let (Some(base), Ok(off)) = (parse_absolute(base), offset.parse::<i64>()) {
                    if let Some(ts) = base.checked_add_secs(off) {
                        return Ok(ts);
                    }
                }
            }
        }

        Err(FieldLogError::TimestampParse(s.to_string()))
    }
}

/// Parse the non-relative forms accepted by [`Timestamp::parse`].
fn parse_absolute(s: &str) -> Option<Timestamp> {
    if s.is_empty() {
        return None;
    }

    if s.bytes().all(|b| b.is_ascii_digit()) {
        return Timestamp::from_epoch(s.parse().ok()?);
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Timestamp::from_epoch(naive.and_utc().timestamp());
        }
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Timestamp::from_epoch(dt.timestamp());
    }

    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(Timestamp::start_of_day)
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(CANONICAL_FORMAT))
    }
}

impl FromStr for Timestamp {
    type Err = FieldLogError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl serde::Serialize for Timestamp {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> serde::Deserialize<'de> for Timestamp {
    /// Accepts either epoch seconds (number) or any text form [`Timestamp::parse`] accepts.
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(serde::Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Epoch(i64),
            Text(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Epoch(secs) => Timestamp::from_epoch(secs)
                .ok_or_else(|| serde::de::Error::custom(format!("epoch {secs} out of range"))),
            Repr::Text(text) => Timestamp::parse(&text).map_err(serde::de::Error::custom),
        }
    }
}

/// Format a `std::time::Duration` into a human-readable string.
///
/// Used in scan summaries. Examples: `0.3s`, `1.2s`, `45.6s`.
pub fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 0.01 {
        format!("{:.1}ms", secs * 1000.0)
    } else if secs < 60.0 {
        format!("{secs:.1}s")
    } else {
        let mins = secs / 60.0;
        format!("{mins:.1}m")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_round_trip() {
        let ts = Timestamp::from_ymd_hms(2023, 6, 1, 10, 0, 0).unwrap();
        assert_eq!(ts.to_string(), "2023-06-01T10:00:00");
        assert_eq!(Timestamp::parse(&ts.to_string()).unwrap(), ts);
    }

    #[test]
    fn test_mdy_has_no_padding() {
        let ts = Timestamp::from_ymd_hms(2023, 1, 2, 23, 59, 59).unwrap();
        assert_eq!(ts.mdy(), "1-2-2023");
    }

    #[test]
    fn test_parse_epoch_integer() {
        let ts = Timestamp::parse("1672531199").unwrap();
        assert_eq!(ts.epoch_seconds(), 1_672_531_199);
        assert_eq!(ts.to_string(), "2022-12-31T23:59:59");
    }

    #[test]
    fn test_parse_relative_offset() {
        let ts = Timestamp::parse("2023-06-01T10:00:00+90").unwrap();
        assert_eq!(ts.to_string(), "2023-06-01T10:01:30");
        let back = Timestamp::parse("2023-06-01T10:00:00+-60").unwrap();
        assert_eq!(back.to_string(), "2023-06-01T09:59:00");
    }

    #[test]
    fn test_parse_rfc3339_normalises_to_utc() {
        let ts = Timestamp::parse("2023-06-01T12:00:00+02:00").unwrap();
        assert_eq!(ts.to_string(), "2023-06-01T10:00:00");
    }

    #[test]
    fn test_parse_fraction_truncated() {
        let ts = Timestamp::parse("2023-06-01 10:00:00.750").unwrap();
        assert_eq!(ts.to_string(), "2023-06-01T10:00:00");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(Timestamp::parse("").is_err());
        assert!(Timestamp::parse("garbage-no-separators").is_err());
        assert!(Timestamp::parse("2023-13-40T00:00:00").is_err());
    }

    #[test]
    fn test_format_duration_seconds() {
        let d = std::time::Duration::from_millis(1200);
        assert_eq!(format_duration(d), "1.2s");
    }
}
