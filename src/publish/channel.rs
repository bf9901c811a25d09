//! Queue-backed publisher and the transport thread that drains it.
//!
//! The scanner publishes into a bounded [`crossbeam_channel`] queue. A
//! background thread owns the real sink and forwards each message. When the
//! queue is full `publish` blocks, so the scanner never opens the next file
//! while more than `bound` pages are waiting on the transport.

use crossbeam_channel::{Receiver, Sender};

use super::{OutboundMessage, Publisher};
use crate::util::error::{publish_err, FieldLogError, Result};

/// Publisher half of the queue.
#[derive(Debug, Clone)]
pub struct ChannelPublisher {
    sender: Sender<OutboundMessage>,
}

impl Publisher for ChannelPublisher {
    fn publish(&mut self, topic: &str, payload: &str, retain: bool) -> Result<()> {
        self.sender
            .send(OutboundMessage::new(topic, payload, retain))
            .map_err(|_| publish_err(topic, "transport thread has stopped"))
    }
}

/// Create a bounded queue. `bound` of 0 is raised to 1.
pub fn transport_channel(bound: usize) -> (ChannelPublisher, Receiver<OutboundMessage>) {
    let (sender, receiver) = crossbeam_channel::bounded(bound.max(1));
    (ChannelPublisher { sender }, receiver)
}

/// What the transport thread did before the queue closed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct TransportSummary {
    pub forwarded: usize,
    pub failed: usize,
}

/// Spawn the transport thread.
///
/// It forwards messages to `sink` until every [`ChannelPublisher`] clone is
/// dropped, then returns a summary. A failed forward is logged and counted;
/// retrying is the scanner's job.
pub fn spawn_transport_thread<P>(
    receiver: Receiver<OutboundMessage>,
    mut sink: P,
) -> Result<std::thread::JoinHandle<TransportSummary>>
where
    P: Publisher + Send + 'static,
{
    std::thread::Builder::new()
        .name("transport".into())
        .spawn(move || {
            let mut summary = TransportSummary::default();
            for message in receiver.iter() {
                match sink.publish(&message.topic, &message.payload, message.retain) {
                    Ok(()) => summary.forwarded += 1,
                    Err(e) => {
                        tracing::warn!("Transport dropped message to '{}': {}", message.topic, e);
                        summary.failed += 1;
                    }
                }
            }
            tracing::debug!(
                "Transport thread finished: {} forwarded, {} failed",
                summary.forwarded,
                summary.failed
            );
            summary
        })
        .map_err(FieldLogError::Io)
}

/// Run `work` against a fresh queue whose transport thread forwards to
/// `sink`, then wait for the thread to drain the queue.
///
/// `work` owns the only [`ChannelPublisher`]; the queue closes when it
/// returns. The thread is joined whether `work` succeeded or not, and its
/// outcome is returned next to the summary.
pub fn with_transport<P, T, F>(
    bound: usize,
    sink: P,
    work: F,
) -> Result<(Result<T>, TransportSummary)>
where
    P: Publisher + Send + 'static,
    F: FnOnce(ChannelPublisher) -> Result<T>,
{
    let (publisher, receiver) = transport_channel(bound);
    let handle = spawn_transport_thread(receiver, sink)?;
    let outcome = work(publisher);
    let summary = handle
        .join()
        .map_err(|_| publish_err("transport", "transport thread panicked"))?;
    Ok((outcome, summary))
}
