//! In-memory publisher: records every message, optionally failing first.

use super::{OutboundMessage, Publisher};
use crate::util::error::{publish_err, Result};

/// Collects published messages. `failing(n)` makes the next `n` calls fail,
/// which is how tests exercise the retry and drop paths.
#[derive(Debug, Default)]
pub struct MemoryPublisher {
    messages: Vec<OutboundMessage>,
    failures_left: usize,
    attempts: usize,
}

impl MemoryPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(failures: usize) -> Self {
        Self {
            failures_left: failures,
            ..Self::default()
        }
    }

    /// Fail the next `failures` publish calls.
    pub fn fail_next(&mut self, failures: usize) {
        self.failures_left = failures;
    }

    pub fn messages(&self) -> &[OutboundMessage] {
        &self.messages
    }

    /// Every publish call, successful or not.
    pub fn attempts(&self) -> usize {
        self.attempts
    }

    /// Payloads parsed as JSON, in publish order.
    pub fn payloads_json(&self) -> Vec<serde_json::Value> {
        self.messages
            .iter()
            .filter_map(|m| serde_json::from_str(&m.payload).ok())
            .collect()
    }
}

impl Publisher for MemoryPublisher {
    fn publish(&mut self, topic: &str, payload: &str, retain: bool) -> Result<()> {
        self.attempts += 1;
        if self.failures_left > 0 {
            self.failures_left -= 1;
            return Err(publish_err(topic, "simulated transport failure"));
        }
        self.messages.push(OutboundMessage::new(topic, payload, retain));
        Ok(())
    }
}
