//! Record model and the delimited line codec.
//!
//! One record is one line:
//!
//! ```text
//! <timestamp><sep><topic><sep><message><sep>\n
//! ```
//!
//! The timestamp and topic are never quoted. The message is written with
//! CSV quoting (via the `csv` crate) only when it contains the separator or a
//! double quote, so ordinary sensor readings stay byte-identical to files
//! written by older firmware, and older files with raw separators inside the
//! message still decode.

use crate::publish::OutboundMessage;
use crate::util::constants::{DEFAULT_SEPARATOR, TIMESTAMP_MARKER};
use crate::util::error::{FieldLogError, Result};
use crate::util::time::Timestamp;

/// One logged message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// When the message was logged.
    pub timestamp: Timestamp,
    /// Hierarchical label, e.g. `sensors/kkm/temp`.
    pub topic: String,
    /// Message body, stored verbatim apart from quoting.
    pub message: String,
}

impl Record {
    pub fn new(timestamp: Timestamp, topic: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            timestamp,
            topic: topic.into(),
            message: message.into(),
        }
    }

    /// Wrap the record as `{"timestamp", "topic", "body"}` JSON for
    /// republishing on `topic`.
    pub fn to_message(&self, topic: &str) -> Result<OutboundMessage> {
        let body = MessageBody {
            timestamp: self.timestamp,
            topic: &self.topic,
            body: &self.message,
        };
        let payload = serde_json::to_string(&body)?;
        Ok(OutboundMessage::new(topic, &payload, false))
    }
}

#[derive(serde::Serialize)]
struct MessageBody<'a> {
    timestamp: Timestamp,
    topic: &'a str,
    body: &'a str,
}

/// Borrowed views into the first two fields of a line, carved out without
/// decoding the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawFields<'a> {
    /// Text before the first separator.
    pub timestamp: &'a str,
    /// Text between the first and second separator.
    pub topic: &'a str,
    /// Everything after the second separator, terminator included.
    pub rest: &'a str,
}

/// Encoder/decoder for the line format, parameterised by the separator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineCodec {
    separator: char,
}

impl Default for LineCodec {
    fn default() -> Self {
        Self {
            separator: DEFAULT_SEPARATOR,
        }
    }
}

impl LineCodec {
    /// Create a codec using `separator`.
    ///
    /// The separator must be a single ASCII punctuation character (or tab)
    /// that cannot appear in the canonical timestamp text: `:`, `-`, `+`,
    /// `.` and `"` are rejected.
    pub fn new(separator: char) -> Result<Self> {
        let usable = (separator.is_ascii_punctuation() || separator == '\t')
            && !matches!(separator, ':' | '-' | '+' | '.' | '"');
        if !usable {
            return Err(FieldLogError::Config(format!(
                "unusable field separator {separator:?}"
            )));
        }
        Ok(Self { separator })
    }

    pub fn separator(&self) -> char {
        self.separator
    }

    /// Cheap validity probe: a record line always carries a time-of-day,
    /// so a line without `:` is not worth splitting.
    pub fn probe(&self, line: &str) -> bool {
        line.contains(TIMESTAMP_MARKER)
    }

    /// Locate the first and second separator. `None` if there are fewer than two.
    pub fn split<'a>(&self, line: &'a str) -> Option<RawFields<'a>> {
        let width = self.separator.len_utf8();
        let first = line.find(self.separator)?;
        let topic_start = first + width;
        let second = topic_start + line[topic_start..].find(self.separator)?;
        Some(RawFields {
            timestamp: &line[..first],
            topic: &line[topic_start..second],
            rest: &line[second + width..],
        })
    }

    /// Parse the timestamp field of a raw line (the text before the first
    /// separator, or the whole line if there is none).
    pub fn leading_timestamp(&self, line: &str) -> Result<Timestamp> {
        let end = line.find(self.separator).unwrap_or(line.len());
        Timestamp::parse(&line[..end])
    }

    /// Fully decode one line. `None` means "skip this line".
    pub fn decode(&self, line: &str) -> Option<Record> {
        if !self.probe(line) {
            return None;
        }
        let fields = self.split(line)?;
        let timestamp = Timestamp::parse(fields.timestamp).ok()?;
        let message = self.decode_message(fields.rest);
        Some(Record {
            timestamp,
            topic: fields.topic.to_string(),
            message,
        })
    }

    /// Encode a record without the trailing newline.
    pub fn encode_body(&self, record: &Record) -> Result<String> {
        self.encode_fields(&record.timestamp.to_string(), &record.topic, &record.message)
    }

    /// Encode pre-rendered timestamp text, topic and message without the
    /// trailing newline. The timestamp text is written as given, which is
    /// how relative (`<time>+<secs>`) stamps reach the file.
    pub fn encode_fields(&self, time: &str, topic: &str, message: &str) -> Result<String> {
        if !self.probe(time) || time.contains([self.separator, '\n', '\r']) {
            return Err(FieldLogError::Codec(format!(
                "timestamp text {time:?} is not usable in a log line"
            )));
        }
        self.check_topic(topic)?;
        if message.contains(['\n', '\r']) {
            return Err(FieldLogError::Codec(
                "message must not contain line breaks".into(),
            ));
        }

        let message = self.quote_message(message)?;
        let sep = self.separator;
        Ok(format!("{time}{sep}{topic}{sep}{message}{sep}"))
    }

    /// Encode a record as one full line, newline included.
    pub fn encode(&self, record: &Record) -> Result<String> {
        let mut line = self.encode_body(record)?;
        line.push('\n');
        Ok(line)
    }

    fn check_topic(&self, topic: &str) -> Result<()> {
        if topic.contains([self.separator, '"', '\n', '\r']) {
            return Err(FieldLogError::Codec(format!(
                "topic {topic:?} contains the separator, a quote or a line break"
            )));
        }
        Ok(())
    }

    /// Quote the message only when it carries the separator or a quote.
    fn quote_message(&self, message: &str) -> Result<String> {
        if !message.contains([self.separator, '"']) {
            return Ok(message.to_string());
        }

        let mut writer = csv::WriterBuilder::new()
            .delimiter(self.separator as u8)
            .quote_style(csv::QuoteStyle::Necessary)
            .terminator(csv::Terminator::Any(b'\n'))
            .has_headers(false)
            .from_writer(Vec::new());
        // The closing quote is only emitted when the record ends.
        writer
            .write_record([message])
            .map_err(|e| FieldLogError::Codec(format!("failed to quote message: {e}")))?;
        let bytes = writer
            .into_inner()
            .map_err(|e| FieldLogError::Codec(format!("failed to quote message: {e}")))?;
        let mut quoted =
            String::from_utf8(bytes).map_err(|e| FieldLogError::Codec(e.to_string()))?;
        if quoted.ends_with('\n') {
            quoted.pop();
        }
        Ok(quoted)
    }

    /// Recover the message from the text after the second separator.
    fn decode_message(&self, rest: &str) -> String {
        let rest = rest.trim_end_matches(['\n', '\r']);

        if rest.starts_with('"') {
            let mut reader = csv::ReaderBuilder::new()
                .delimiter(self.separator as u8)
                .has_headers(false)
                .flexible(true)
                .from_reader(rest.as_bytes());
            let mut record = csv::StringRecord::new();
            if let Ok(true) = reader.read_record(&mut record) {
                if let Some(field) = record.get(0) {
                    return field.to_string();
                }
            }
        }

        rest.strip_suffix(self.separator).unwrap_or(rest).to_string()
    }
}

/// Strip the line terminator (`\n` or `\r\n`) from a raw line.
pub fn trim_line_end(line: &str) -> &str {
    line.trim_end_matches(['\n', '\r'])
}
