//! Publish side of the transport.
//!
//! The retrieval core only needs [`Publisher::publish`]. The concrete client
//! (connection, keepalive, broker buffer size) is injected, which keeps the
//! scanner free of process-wide transport state and lets tests use
//! [`MemoryPublisher`].

pub mod channel;
pub mod jsonl;
pub mod memory;

use std::time::Duration;

use crate::util::constants::{MAX_RETRY_ATTEMPTS, RETRY_BASE_DELAY_MS, TIME_RANGE_TOPIC};
use crate::util::error::Result;

pub use channel::{
    spawn_transport_thread, transport_channel, with_transport, ChannelPublisher, TransportSummary,
};
pub use jsonl::JsonLinesPublisher;
pub use memory::MemoryPublisher;

/// A sink for outbound messages. Blocks until the message is handed off or
/// the attempt fails.
pub trait Publisher {
    fn publish(&mut self, topic: &str, payload: &str, retain: bool) -> Result<()>;
}

impl<P: Publisher + ?Sized> Publisher for &mut P {
    fn publish(&mut self, topic: &str, payload: &str, retain: bool) -> Result<()> {
        (**self).publish(topic, payload, retain)
    }
}

impl<P: Publisher + ?Sized> Publisher for Box<P> {
    fn publish(&mut self, topic: &str, payload: &str, retain: bool) -> Result<()> {
        (**self).publish(topic, payload, retain)
    }
}

/// One message as it leaves the agent.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct OutboundMessage {
    pub topic: String,
    pub payload: String,
    pub retain: bool,
}

impl OutboundMessage {
    pub fn new(topic: &str, payload: &str, retain: bool) -> Self {
        Self {
            topic: topic.to_string(),
            payload: payload.to_string(),
            retain,
        }
    }
}

/// `<prefix>/data/time_range/<device_id>`.
pub fn time_range_topic(prefix: &str, device_id: &str) -> String {
    format!("{prefix}/{TIME_RANGE_TOPIC}/{device_id}")
}

/// Bounded retry with exponential backoff for page publishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts per message, including the first. 0 behaves as 1.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles after each failure.
    pub base_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_RETRY_ATTEMPTS,
            base_delay_ms: RETRY_BASE_DELAY_MS,
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no waiting.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            base_delay_ms: 0,
        }
    }

    /// Delay after failed attempt number `attempt` (0-based): base * 2^attempt.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
        Duration::from_millis(self.base_delay_ms.saturating_mul(factor))
    }
}

/// Publish with the given retry policy. Returns the number of attempts used,
/// or the last error once the attempts are exhausted.
pub fn publish_with_retry<P: Publisher + ?Sized>(
    publisher: &mut P,
    policy: &RetryPolicy,
    topic: &str,
    payload: &str,
    retain: bool,
) -> Result<u32> {
    let attempts = policy.max_attempts.max(1);
    let mut attempt = 0;
    loop {
        match publisher.publish(topic, payload, retain) {
            Ok(()) => return Ok(attempt + 1),
            Err(e) if attempt + 1 < attempts => {
                let delay = policy.delay_after(attempt);
                tracing::warn!(
                    "Publish to '{}' failed (attempt {}/{}): {}; retrying in {:?}",
                    topic,
                    attempt + 1,
                    attempts,
                    e,
                    delay
                );
                std::thread::sleep(delay);
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
