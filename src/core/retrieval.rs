//! Day-range retrieval: walk daily files, filter lines, publish pages.
//!
//! For each day in the window the walk names the day's file, skips it if
//! storage does not have it, and otherwise streams it line by line through
//! the [`EntryFilter`] into a [`Page`]. Pages are published whenever they
//! fill up (by line count or by byte size) and once more at end-of-file, so
//! every accepted line goes out exactly once. Pages never span files.
//!
//! Only one file is open at a time, and it is closed before the next day is
//! looked at, whatever happened while scanning it.

use chrono::NaiveDate;

use crate::core::filter::{EntryFilter, LineVerdict, TopicFilter};
use crate::core::line_reader::LineStream;
use crate::core::naming::{DailyFileKey, DailyFilePattern};
use crate::core::page::Page;
use crate::core::record::{trim_line_end, LineCodec};
use crate::core::request::RetrievalRequest;
use crate::publish::{publish_with_retry, Publisher, RetryPolicy};
use crate::storage::Storage;
use crate::util::config::AgentConfig;
use crate::util::constants::SECS_PER_DAY;
use crate::util::error::{FieldLogError, Result};
use crate::util::time::Timestamp;

/// How the walk turns a time window into candidate days.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayWalk {
    /// Every calendar day from the start's date through the end's date,
    /// inclusive. Matches the inclusive per-line filter.
    #[default]
    Calendar,
    /// Historical behaviour: start at the start's epoch value and step by
    /// 86400 seconds while strictly below the end's epoch value. Records on
    /// the end's own day are not visited when the end falls at or before
    /// the start's time-of-day.
    Stepped,
}

/// Iterator over the candidate days of a window.
#[derive(Debug, Clone)]
pub enum DayIter {
    Calendar { next: Option<NaiveDate>, last: NaiveDate },
    Stepped { next: i64, end: i64 },
}

impl DayIter {
    pub fn new(start: Timestamp, end: Timestamp, walk: DayWalk) -> Self {
        match walk {
            DayWalk::Calendar => DayIter::Calendar {
                next: (start <= end).then(|| start.date()),
                last: end.date(),
            },
            DayWalk::Stepped => DayIter::Stepped {
                next: start.epoch_seconds(),
                end: end.epoch_seconds(),
            },
        }
    }
}

impl Iterator for DayIter {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<NaiveDate> {
        match self {
            DayIter::Calendar { next, last } => {
                let day = (*next)?;
                if day > *last {
                    return None;
                }
                *next = day.succ_opt();
                Some(day)
            }
            DayIter::Stepped { next, end } => {
                if *next >= *end {
                    return None;
                }
                let day = Timestamp::from_epoch(*next)?.date();
                *next = next.checked_add(SECS_PER_DAY).unwrap_or(i64::MAX);
                Some(day)
            }
        }
    }
}

/// Counters for one retrieval run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct ScanReport {
    pub days_visited: usize,
    pub files_scanned: usize,
    pub files_missing: usize,
    pub lines_read: usize,
    /// Malformed lines and lines whose timestamp would not parse.
    pub lines_skipped: usize,
    pub records_matched: usize,
    pub records_published: usize,
    /// Accepted records lost because their page could not be published.
    pub records_dropped: usize,
    /// Accepted lines too large to fit any page on their own.
    pub oversized_lines: usize,
    pub pages_published: usize,
    pub pages_failed: usize,
    /// Largest serialised page, in bytes. Use it to tune `page_length`.
    pub largest_page_bytes: usize,
}

/// Everything the walk needs besides storage and the publisher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievalSettings {
    pub prefix: String,
    pub filetype: String,
    pub codec: LineCodec,
    /// Topic pages are published on.
    pub topic: String,
    pub page_length: usize,
    pub max_payload_bytes: usize,
    pub day_walk: DayWalk,
    pub retry: RetryPolicy,
}

impl RetrievalSettings {
    pub fn from_config(config: &AgentConfig) -> Result<Self> {
        Ok(Self {
            prefix: config.file_prefix.clone(),
            filetype: config.filetype.clone(),
            codec: LineCodec::new(config.separator)?,
            topic: config.time_range_topic(),
            page_length: config.page_length,
            max_payload_bytes: config.max_payload_bytes,
            day_walk: config.day_walk,
            retry: config.retry,
        })
    }
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        // The default config always validates.
        let config = AgentConfig::default();
        Self {
            prefix: config.file_prefix.clone(),
            filetype: config.filetype.clone(),
            codec: LineCodec::default(),
            topic: config.time_range_topic(),
            page_length: config.page_length,
            max_payload_bytes: config.max_payload_bytes,
            day_walk: config.day_walk,
            retry: config.retry,
        }
    }
}

/// Range retrieval over one storage and one publisher.
#[derive(Debug)]
pub struct Retriever<S, P> {
    storage: S,
    publisher: P,
    settings: RetrievalSettings,
}

impl<S: Storage, P: Publisher> Retriever<S, P> {
    pub fn new(storage: S, publisher: P, settings: RetrievalSettings) -> Self {
        Self {
            storage,
            publisher,
            settings,
        }
    }

    pub fn settings(&self) -> &RetrievalSettings {
        &self.settings
    }

    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    pub fn into_publisher(self) -> P {
        self.publisher
    }

    /// Run a parsed command, filling unset fields from the settings.
    pub fn handle_request(&mut self, request: &RetrievalRequest) -> Result<ScanReport> {
        let page_length = request.page_length.unwrap_or(self.settings.page_length);
        let prefix = request
            .prefix
            .clone()
            .unwrap_or_else(|| self.settings.prefix.clone());
        let filetype = request
            .filetype
            .clone()
            .unwrap_or_else(|| self.settings.filetype.clone());
        self.read_entry_range_from_files(
            request.epoch,
            request.terminus,
            &request.topics,
            page_length,
            &prefix,
            &filetype,
        )
    }

    /// Retrieve using the configured prefix and filetype.
    pub fn read_range(
        &mut self,
        epoch: Timestamp,
        terminus: Timestamp,
        topics: &TopicFilter,
        page_length: usize,
    ) -> Result<ScanReport> {
        let prefix = self.settings.prefix.clone();
        let filetype = self.settings.filetype.clone();
        self.read_entry_range_from_files(epoch, terminus, topics, page_length, &prefix, &filetype)
    }

    /// Publish every line in `[epoch, terminus]` whose topic matches, from
    /// the daily files named by `prefix`/`filetype`, in pages of at most
    /// `page_length` lines.
    ///
    /// Missing files are skipped. A read error inside a file stops the scan
    /// and is returned; a publish failure drops that page and the scan goes
    /// on.
    pub fn read_entry_range_from_files(
        &mut self,
        epoch: Timestamp,
        terminus: Timestamp,
        topics: &TopicFilter,
        page_length: usize,
        prefix: &str,
        filetype: &str,
    ) -> Result<ScanReport> {
        if page_length == 0 {
            return Err(FieldLogError::InvalidArgument(
                "page_length must be at least 1".into(),
            ));
        }

        let filter = EntryFilter::new(epoch, terminus, topics.clone());
        let mut report = ScanReport::default();

        tracing::info!(
            "Retrieving {} .. {} (topics {:?}, page length {}, {:?} walk)",
            epoch,
            terminus,
            topics.topics(),
            page_length,
            self.settings.day_walk
        );

        for date in DayIter::new(epoch, terminus, self.settings.day_walk) {
            report.days_visited += 1;
            let name = DailyFileKey::new(prefix, date, filetype).file_name();

            if !self.storage.exists(&name) {
                tracing::debug!("No file for {}: {}", date, name);
                report.files_missing += 1;
                continue;
            }

            let reader = match self.storage.open_read(&name) {
                Ok(reader) => reader,
                Err(e) => {
                    tracing::warn!("Skipping {}: {}", name, e);
                    report.files_missing += 1;
                    continue;
                }
            };

            let mut stream = LineStream::open(reader);
            let scanned = self.scan_file(&name, &mut stream, &filter, page_length, &mut report);
            stream.close();
            scanned?;
            report.files_scanned += 1;
        }

        tracing::info!(
            "Retrieval done: {} records in {} pages from {} files ({} pages failed, {} records dropped)",
            report.records_published,
            report.pages_published,
            report.files_scanned,
            report.pages_failed,
            report.records_dropped
        );
        Ok(report)
    }

    /// Names of stored daily files for the configured prefix/filetype,
    /// oldest first.
    pub fn list_daily_files(&self) -> Result<Vec<DailyFileKey>> {
        let pattern = DailyFilePattern::new(&self.settings.prefix, &self.settings.filetype)?;
        let mut keys: Vec<DailyFileKey> = self
            .storage
            .list()?
            .iter()
            .filter_map(|name| pattern.parse(name))
            .collect();
        keys.sort_by_key(|k| (k.year, k.month, k.day));
        Ok(keys)
    }

    /// Stream one open file into pages.
    fn scan_file(
        &mut self,
        name: &str,
        stream: &mut LineStream<S::Reader>,
        filter: &EntryFilter,
        page_length: usize,
        report: &mut ScanReport,
    ) -> Result<()> {
        let codec = self.settings.codec;
        let mut page = Page::new(name, page_length, self.settings.max_payload_bytes);

        while stream.has_more()? {
            let raw = stream.read_line()?;
            report.lines_read += 1;

            match filter.classify(&codec, &raw) {
                LineVerdict::Accepted => {}
                LineVerdict::Malformed | LineVerdict::BadTimestamp => {
                    report.lines_skipped += 1;
                    continue;
                }
                LineVerdict::OutOfRange | LineVerdict::TopicMismatch => continue,
            }
            report.records_matched += 1;

            let line = trim_line_end(&raw);
            if !page.fits_alone(line) {
                tracing::warn!(
                    "Dropping {}-byte line from {}: exceeds the {}-byte payload limit",
                    line.len(),
                    name,
                    self.settings.max_payload_bytes
                );
                report.oversized_lines += 1;
                continue;
            }
            if !page.fits(line) {
                self.flush(&mut page, report);
            }
            page.push(line);
            if page.is_full() {
                self.flush(&mut page, report);
            }
        }

        if !page.is_empty() {
            self.flush(&mut page, report);
        }
        Ok(())
    }

    /// Seal, clear and publish the page. Failures are logged and counted.
    fn flush(&mut self, page: &mut Page, report: &mut ScanReport) {
        let sealed = page.seal(&self.settings.codec);
        let entries = page.len();
        let raw_bytes = page.raw_bytes();
        page.clear();

        let sealed = match sealed {
            Ok(sealed) => sealed,
            Err(e) => {
                tracing::error!("Could not build page from {}: {}", page.source_file(), e);
                report.pages_failed += 1;
                report.records_dropped += entries;
                return;
            }
        };

        let bytes = sealed.payload.len();
        report.largest_page_bytes = report.largest_page_bytes.max(bytes);
        tracing::debug!(
            "Page from {}: {} entries, {} bytes ({} raw), {} .. {}",
            page.source_file(),
            sealed.entries,
            bytes,
            raw_bytes,
            sealed.range_start,
            sealed.range_end
        );

        match publish_with_retry(
            &mut self.publisher,
            &self.settings.retry,
            &self.settings.topic,
            &sealed.payload,
            false,
        ) {
            Ok(_) => {
                report.pages_published += 1;
                report.records_published += sealed.entries;
            }
            Err(e) => {
                tracing::error!(
                    "Dropping page of {} records from {}: {}",
                    sealed.entries,
                    page.source_file(),
                    e
                );
                report.pages_failed += 1;
                report.records_dropped += sealed.entries;
            }
        }
    }
}
