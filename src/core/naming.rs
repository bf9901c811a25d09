//! Daily file naming.
//!
//! Both the logger (writing today's file) and the retrieval walk (probing
//! each candidate day) go through [`DailyFileKey`], so a file written by one
//! session is always found by a later scan.

use chrono::{Datelike, NaiveDate};
use regex::Regex;

use crate::util::error::{FieldLogError, Result};
use crate::util::time::Timestamp;

/// Identity of one day-partitioned file:
/// `<prefix>_<month>-<day>-<year>.<filetype>`, decimal, no zero padding.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DailyFileKey {
    pub prefix: String,
    pub month: u32,
    pub day: u32,
    pub year: i32,
    /// Extension without the leading dot.
    pub filetype: String,
}

impl DailyFileKey {
    /// Key for an explicit calendar date (writer side).
    ///
    /// A leading dot on `filetype` is dropped, so `"csv"` and `".csv"` name
    /// the same file.
    pub fn new(prefix: &str, date: NaiveDate, filetype: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            month: date.month(),
            day: date.day(),
            year: date.year(),
            filetype: normalize_filetype(filetype).to_string(),
        }
    }

    /// Key for the UTC day a timestamp falls on (reader side).
    pub fn for_timestamp(prefix: &str, ts: Timestamp, filetype: &str) -> Self {
        Self::new(prefix, ts.date(), filetype)
    }

    /// Canonical file name.
    pub fn file_name(&self) -> String {
        format!(
            "{}_{}-{}-{}.{}",
            self.prefix, self.month, self.day, self.year, self.filetype
        )
    }

    /// Calendar date this key stands for, if the fields form a valid date.
    pub fn date(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, self.day)
    }
}

impl std::fmt::Display for DailyFileKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.file_name())
    }
}

/// Drop one leading dot from an extension.
pub fn normalize_filetype(filetype: &str) -> &str {
    filetype.strip_prefix('.').unwrap_or(filetype)
}

/// Recognises daily file names for one prefix/filetype pair.
#[derive(Debug, Clone)]
pub struct DailyFilePattern {
    prefix: String,
    filetype: String,
    regex: Regex,
}

impl DailyFilePattern {
    pub fn new(prefix: &str, filetype: &str) -> Result<Self> {
        let filetype = normalize_filetype(filetype);
        let pattern = format!(
            r"^{}_(\d{{1,2}})-(\d{{1,2}})-(\d{{1,6}})\.{}$",
            regex::escape(prefix),
            regex::escape(filetype)
        );
        let regex = Regex::new(&pattern)
            .map_err(|e| FieldLogError::Config(format!("bad daily file pattern: {e}")))?;
        Ok(Self {
            prefix: prefix.to_string(),
            filetype: filetype.to_string(),
            regex,
        })
    }

    /// Parse `name` back into a key. `None` for foreign files and impossible
    /// dates (`2-30-2023`).
    pub fn parse(&self, name: &str) -> Option<DailyFileKey> {
        let caps = self.regex.captures(name)?;
        let key = DailyFileKey {
            prefix: self.prefix.clone(),
            month: caps[1].parse().ok()?,
            day: caps[2].parse().ok()?,
            year: caps[3].parse().ok()?,
            filetype: self.filetype.clone(),
        };
        key.date()?;
        Some(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name_has_no_padding() {
        let date = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
        let key = DailyFileKey::new("log", date, "csv");
        assert_eq!(key.file_name(), "log_1-2-2023.csv");
    }

    #[test]
    fn test_dotted_and_undotted_filetype_agree() {
        let date = NaiveDate::from_ymd_opt(2023, 6, 1).unwrap();
        assert_eq!(
            DailyFileKey::new("gator", date, ".csv").file_name(),
            DailyFileKey::new("gator", date, "csv").file_name()
        );
    }

    #[test]
    fn test_writer_and_reader_constructors_agree() {
        let date = NaiveDate::from_ymd_opt(2023, 12, 31).unwrap();
        let late = Timestamp::from_ymd_hms(2023, 12, 31, 23, 59, 59).unwrap();
        assert_eq!(
            DailyFileKey::new("log", date, "csv"),
            DailyFileKey::for_timestamp("log", late, "csv")
        );
    }

    #[test]
    fn test_pattern_parses_own_names() {
        let pattern = DailyFilePattern::new("log", "csv").unwrap();
        let key = pattern.parse("log_6-1-2023.csv").unwrap();
        assert_eq!(key.date(), NaiveDate::from_ymd_opt(2023, 6, 1));
        assert_eq!(key.file_name(), "log_6-1-2023.csv");
    }

    #[test]
    fn test_pattern_rejects_foreign_names() {
        let pattern = DailyFilePattern::new("log", "csv").unwrap();
        assert!(pattern.parse("other_6-1-2023.csv").is_none());
        assert!(pattern.parse("log_6-1-2023.txt").is_none());
        assert!(pattern.parse("log_2-30-2023.csv").is_none());
        assert!(pattern.parse("log_6-1-2023.csv.bak").is_none());
    }

    #[test]
    fn test_pattern_escapes_prefix() {
        let pattern = DailyFilePattern::new("a.b", "csv").unwrap();
        assert!(pattern.parse("a.b_1-1-2024.csv").is_some());
        assert!(pattern.parse("axb_1-1-2024.csv").is_none());
    }
}
