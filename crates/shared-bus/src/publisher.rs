//! # Envelope Publisher
//!
//! The outbound port every handler publishes through. The MQTT transport is
//! the production implementation; [`InMemoryPublisher`] backs tests and
//! dry runs.

use async_trait::async_trait;
use parking_lot::Mutex;
use shared_types::OutboundEnvelope;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Result of a publish attempt. Publishing is never queued or retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    /// Handed to the broker client.
    Sent,
    /// Not connected; the envelope was dropped.
    SkippedDisconnected,
    /// Serialization or client failure.
    Failed(String),
}

impl PublishOutcome {
    #[must_use]
    pub fn is_sent(&self) -> bool {
        matches!(self, Self::Sent)
    }

    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Sent => "sent",
            Self::SkippedDisconnected => "skipped",
            Self::Failed(_) => "failed",
        }
    }
}

/// Trait for publishing envelopes to this instance's own topic.
#[async_trait]
pub trait EnvelopePublisher: Send + Sync {
    /// Publish an envelope.
    ///
    /// Returns [`PublishOutcome::SkippedDisconnected`] without queuing when
    /// the transport is down.
    async fn publish(&self, envelope: OutboundEnvelope) -> PublishOutcome;

    /// Total envelopes handed to the broker.
    fn envelopes_published(&self) -> u64;
}

/// In-memory publisher.
///
/// Records every envelope and fans it out over a broadcast channel. Can be
/// switched to "disconnected" to exercise the skip path.
pub struct InMemoryPublisher {
    sender: broadcast::Sender<OutboundEnvelope>,
    published: Mutex<Vec<OutboundEnvelope>>,
    connected: AtomicBool,
    envelopes_published: AtomicU64,
}

impl InMemoryPublisher {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            published: Mutex::new(Vec::new()),
            connected: AtomicBool::new(true),
            envelopes_published: AtomicU64::new(0),
        }
    }

    /// Receive every envelope published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<OutboundEnvelope> {
        self.sender.subscribe()
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    /// Snapshot of everything published so far.
    #[must_use]
    pub fn published(&self) -> Vec<OutboundEnvelope> {
        self.published.lock().clone()
    }

    /// Envelopes published with the given tag.
    #[must_use]
    pub fn published_with_tag(&self, tag: &str) -> Vec<OutboundEnvelope> {
        self.published
            .lock()
            .iter()
            .filter(|e| e.tag() == tag)
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.published.lock().clear();
    }
}

impl Default for InMemoryPublisher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EnvelopePublisher for InMemoryPublisher {
    async fn publish(&self, envelope: OutboundEnvelope) -> PublishOutcome {
        if !self.connected.load(Ordering::SeqCst) {
            warn!(tag = envelope.tag(), "Client not connected, publish skipped");
            return PublishOutcome::SkippedDisconnected;
        }

        self.envelopes_published.fetch_add(1, Ordering::Relaxed);
        self.published.lock().push(envelope.clone());

        let tag = envelope.tag();
        let object_id = envelope.object_id().to_string();
        // No receivers is fine, the envelope is still recorded
        let receivers = self.sender.send(envelope).unwrap_or(0);
        debug!(tag, object_id = %object_id, receivers, "Envelope published");
        PublishOutcome::Sent
    }

    fn envelopes_published(&self) -> u64 {
        self.envelopes_published.load(Ordering::Relaxed)
    }
}
