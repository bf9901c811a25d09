//! JSON-lines publisher: one `{"topic", "payload", "retain"}` object per line.
//!
//! Used by the command-line tool to hand pages to whatever is piped after
//! it (a broker bridge, a file, a terminal).

use std::io::Write;

use super::Publisher;
use crate::util::error::{publish_err, Result};

#[derive(serde::Serialize)]
struct WireMessage<'a> {
    topic: &'a str,
    payload: &'a str,
    retain: bool,
}

/// Writes each message as a single JSON line and flushes it.
#[derive(Debug)]
pub struct JsonLinesPublisher<W: Write> {
    writer: W,
    published: usize,
    bytes: usize,
}

impl<W: Write> JsonLinesPublisher<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            published: 0,
            bytes: 0,
        }
    }

    pub fn published(&self) -> usize {
        self.published
    }

    /// Total payload bytes written (envelope excluded).
    pub fn payload_bytes(&self) -> usize {
        self.bytes
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> Publisher for JsonLinesPublisher<W> {
    fn publish(&mut self, topic: &str, payload: &str, retain: bool) -> Result<()> {
        let message = WireMessage {
            topic,
            payload,
            retain,
        };
        serde_json::to_writer(&mut self.writer, &message)
            .map_err(|e| publish_err(topic, format!("failed to write message: {e}")))?;
        // Explicit flush so I/O errors surface here rather than on drop.
        self.writer
            .write_all(b"\n")
            .and_then(|()| self.writer.flush())
            .map_err(|e| publish_err(topic, format!("failed to flush message: {e}")))?;

        self.published += 1;
        self.bytes += payload.len();
        tracing::trace!("Wrote {} payload bytes to '{}'", payload.len(), topic);
        Ok(())
    }
}
