//! Page buffer and envelope serialisation.
//!
//! A [`Page`] collects accepted raw lines from one file. It is bounded twice:
//! by line count (`capacity`) and by the serialised size of the envelope it
//! will become (`max_payload_bytes`). The size is tracked incrementally and
//! exactly for `serde_json` output, so checking whether one more line fits
//! costs a scan of that line only.

use crate::core::record::LineCodec;
use crate::util::error::{FieldLogError, Result};
use crate::util::time::Timestamp;

/// Published payload. Field order is part of the wire format.
#[derive(Debug, serde::Serialize)]
pub struct PageEnvelope<'a> {
    #[serde(rename = "file name")]
    pub file_name: &'a str,
    /// Timestamp of the first entry, epoch seconds.
    pub epoch: i64,
    /// Timestamp of the last entry, epoch seconds.
    pub terminus: i64,
    pub data: &'a [String],
}

/// A serialised page ready for the publisher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedPage {
    pub payload: String,
    pub entries: usize,
    pub range_start: Timestamp,
    pub range_end: Timestamp,
}

/// Bounded buffer of raw lines from one source file.
#[derive(Debug)]
pub struct Page {
    source_file: String,
    entries: Vec<String>,
    capacity: usize,
    max_payload_bytes: usize,
    /// Serialised size of the envelope with an empty `data` array and the
    /// widest possible integers.
    overhead: usize,
    /// Serialised size of the `data` elements and their commas.
    data_len: usize,
}

impl Page {
    /// `capacity` must be at least 1.
    pub fn new(source_file: impl Into<String>, capacity: usize, max_payload_bytes: usize) -> Self {
        let source_file = source_file.into();
        let overhead = envelope_overhead(&source_file);
        Self {
            source_file,
            entries: Vec::new(),
            capacity: capacity.max(1),
            max_payload_bytes,
            overhead,
            data_len: 0,
        }
    }

    pub fn source_file(&self) -> &str {
        &self.source_file
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Upper bound on the serialised envelope size right now.
    pub fn serialized_len(&self) -> usize {
        self.overhead + self.data_len
    }

    /// Sum of raw line lengths, without JSON framing.
    pub fn raw_bytes(&self) -> usize {
        self.entries.iter().map(String::len).sum()
    }

    /// Whether appending `line` keeps the envelope within the byte bound.
    pub fn fits(&self, line: &str) -> bool {
        self.serialized_len() + self.entry_cost(line) <= self.max_payload_bytes
    }

    /// Whether `line` would fit in an otherwise empty page.
    pub fn fits_alone(&self, line: &str) -> bool {
        self.overhead + json_string_len(line) <= self.max_payload_bytes
    }

    /// Append a raw line (terminator already stripped).
    pub fn push(&mut self, line: &str) {
        self.data_len += self.entry_cost(line);
        self.entries.push(line.to_string());
    }

    /// Drop all entries and release their memory.
    pub fn clear(&mut self) {
        self.entries = Vec::new();
        self.data_len = 0;
    }

    /// Serialise the page. The range comes from the first and last entries'
    /// own timestamps, not from the requested window.
    pub fn seal(&self, codec: &LineCodec) -> Result<SealedPage> {
        let (Some(first), Some(last)) = (self.entries.first(), self.entries.last()) else {
            return Err(FieldLogError::InvalidArgument("cannot seal an empty page".into()));
        };
        let range_start = codec.leading_timestamp(first)?;
        let range_end = codec.leading_timestamp(last)?;

        let envelope = PageEnvelope {
            file_name: &self.source_file,
            epoch: range_start.epoch_seconds(),
            terminus: range_end.epoch_seconds(),
            data: &self.entries,
        };
        let payload = serde_json::to_string(&envelope)?;

        Ok(SealedPage {
            payload,
            entries: self.entries.len(),
            range_start,
            range_end,
        })
    }

    fn entry_cost(&self, line: &str) -> usize {
        let comma = usize::from(!self.entries.is_empty());
        comma + json_string_len(line)
    }
}

fn envelope_overhead(source_file: &str) -> usize {
    let empty = PageEnvelope {
        file_name: source_file,
        epoch: i64::MIN,
        terminus: i64::MIN,
        data: &[],
    };
    serde_json::to_string(&empty)
        .map(|s| s.len())
        .unwrap_or_else(|_| 64 + json_string_len(source_file))
}

/// Length of `s` once written as a JSON string by `serde_json`, quotes included.
pub fn json_string_len(s: &str) -> usize {
    2 + s
        .chars()
        .map(|c| match c {
            '"' | '\\' | '\n' | '\r' | '\t' | '\u{08}' | '\u{0C}' => 2,
            c if (c as u32) < 0x20 => 6,
            c => c.len_utf8(),
        })
        .sum::<usize>()
}
