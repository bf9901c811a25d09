//! Append writer for daily log files.
//!
//! Every call is a full open-write-close cycle: nothing is buffered between
//! calls, so a crash loses at most the line being written and never damages
//! earlier lines. Each payload is preceded by a newline, so a torn last line
//! is isolated from the next one.

use std::io::Write;

use chrono::NaiveDate;

use crate::core::naming::DailyFileKey;
use crate::core::record::{LineCodec, Record};
use crate::storage::{Storage, WriteMode};
use crate::util::error::Result;
use crate::util::time::Timestamp;

/// Writes lines into one target file.
#[derive(Debug)]
pub struct DataLogger<S> {
    storage: S,
    file_name: String,
    codec: LineCodec,
}

impl<S: Storage> DataLogger<S> {
    pub fn new(storage: S, file_name: impl Into<String>, codec: LineCodec) -> Self {
        Self {
            storage,
            file_name: file_name.into(),
            codec,
        }
    }

    /// Logger bound to the daily file for `date`.
    pub fn daily(storage: S, prefix: &str, date: NaiveDate, filetype: &str, codec: LineCodec) -> Self {
        Self::new(storage, DailyFileKey::new(prefix, date, filetype).file_name(), codec)
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn set_file_name(&mut self, file_name: impl Into<String>) {
        self.file_name = file_name.into();
    }

    /// Retarget to the daily file for `date` (e.g. after midnight).
    pub fn set_daily_file(&mut self, prefix: &str, date: NaiveDate, filetype: &str) {
        self.file_name = DailyFileKey::new(prefix, date, filetype).file_name();
    }

    pub fn exists(&self) -> bool {
        self.storage.exists(&self.file_name)
    }

    /// Replace the file's contents with `"\n" + line`.
    pub fn write_line(&self, line: &str) -> Result<()> {
        self.write(WriteMode::Truncate, line)
    }

    /// Append `"\n" + line`, creating the file if needed.
    pub fn append_line(&self, line: &str) -> Result<()> {
        self.write(WriteMode::Append, line)
    }

    /// Write a header (each field followed by the separator).
    ///
    /// This truncates the file: call it once per file, before any data.
    pub fn write_header<T: AsRef<str>>(&self, fields: &[T]) -> Result<()> {
        let sep = self.codec.separator();
        let header: String = fields
            .iter()
            .map(|f| format!("{}{sep}", f.as_ref()))
            .collect();
        self.write_line(&header)
    }

    /// Write the header only if the target file does not exist yet.
    /// Returns whether a header was written.
    pub fn write_header_if_absent<T: AsRef<str>>(&self, fields: &[T]) -> Result<bool> {
        if self.exists() {
            return Ok(false);
        }
        self.write_header(fields)?;
        Ok(true)
    }

    pub fn log_record(&self, record: &Record) -> Result<()> {
        let line = self.codec.encode_body(record)?;
        self.append_line(&line)
    }

    /// Append a record stamped with an absolute time.
    pub fn log_absolute(&self, time: Timestamp, topic: &str, message: &str) -> Result<()> {
        self.log_record(&Record::new(time, topic, message))
    }

    /// Append a record stamped `<time>+<offset_secs>`. Readers resolve the
    /// stamp to `time + offset_secs`.
    pub fn log_relative(&self, time: Timestamp, offset_secs: i64, topic: &str, message: &str) -> Result<()> {
        let stamp = format!("{time}+{offset_secs}");
        let line = self.codec.encode_fields(&stamp, topic, message)?;
        self.append_line(&line)
    }

    fn write(&self, mode: WriteMode, line: &str) -> Result<()> {
        let mut file = self.storage.open_write(&self.file_name, mode)?;
        file.write_all(b"\n")?;
        file.write_all(line.as_bytes())?;
        file.flush()?;
        tracing::trace!("Wrote {} bytes to {} ({:?})", line.len() + 1, self.file_name, mode);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::DirStorage;

    fn read(dir: &std::path::Path, name: &str) -> String {
        std::fs::read_to_string(dir.join(name)).unwrap()
    }

    fn at(h: u32) -> Timestamp {
        Timestamp::from_ymd_hms(2023, 6, 1, h, 0, 0).unwrap()
    }

    #[test]
    fn test_append_prefixes_newline() {
        let dir = tempfile::tempdir().unwrap();
        let storage = DirStorage::mount(dir.path()).unwrap();
        let logger = DataLogger::new(&storage, "a.csv", LineCodec::default());
        logger.append_line("one").unwrap();
        logger.append_line("two").unwrap();
        assert_eq!(read(dir.path(), "a.csv"), "\none\ntwo");
    }

    #[test]
    fn test_header_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let storage = DirStorage::mount(dir.path()).unwrap();
        let logger = DataLogger::new(&storage, "a.csv", LineCodec::default());
        logger.append_line("old data").unwrap();
        logger.write_header(&["time", "topic", "message"]).unwrap();
        assert_eq!(read(dir.path(), "a.csv"), "\ntime;topic;message;");
    }

    #[test]
    fn test_header_if_absent_keeps_data() {
        let dir = tempfile::tempdir().unwrap();
        let storage = DirStorage::mount(dir.path()).unwrap();
        let logger = DataLogger::new(&storage, "a.csv", LineCodec::default());
        assert!(logger.write_header_if_absent(&["time"]).unwrap());
        logger.append_line("data").unwrap();
        assert!(!logger.write_header_if_absent(&["time"]).unwrap());
        assert_eq!(read(dir.path(), "a.csv"), "\ntime;\ndata");
    }

    #[test]
    fn test_daily_logger_names_file() {
        let dir = tempfile::tempdir().unwrap();
        let storage = DirStorage::mount(dir.path()).unwrap();
        let date = NaiveDate::from_ymd_opt(2023, 6, 1).unwrap();
        let logger = DataLogger::daily(&storage, "gator", date, ".csv", LineCodec::default());
        logger.log_absolute(at(10), "kkm", "23.5").unwrap();
        assert_eq!(logger.file_name(), "gator_6-1-2023.csv");
        assert_eq!(read(dir.path(), "gator_6-1-2023.csv"), "\n2023-06-01T10:00:00;kkm;23.5;");
    }

    #[test]
    fn test_relative_stamp_decodes_to_offset_time() {
        let dir = tempfile::tempdir().unwrap();
        let storage = DirStorage::mount(dir.path()).unwrap();
        let logger = DataLogger::new(&storage, "a.csv", LineCodec::default());
        logger.log_relative(at(10), 90, "kkm", "1").unwrap();

        let text = read(dir.path(), "a.csv");
        assert_eq!(text, "\n2023-06-01T10:00:00+90;kkm;1;");
        let record = LineCodec::default().decode(text.trim_start()).unwrap();
        assert_eq!(record.timestamp.to_string(), "2023-06-01T10:01:30");
    }

    #[test]
    fn test_unencodable_record_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let storage = DirStorage::mount(dir.path()).unwrap();
        let logger = DataLogger::new(&storage, "a.csv", LineCodec::default());
        assert!(logger.log_absolute(at(1), "a;b", "x").is_err());
        assert!(!logger.exists());
    }
}
