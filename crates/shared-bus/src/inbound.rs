//! # Inbound Queue
//!
//! Multi-producer, single-consumer channel from the transport's delivery task
//! to the dispatcher. Messages are carried exactly as received.

use chrono::{DateTime, Local};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::warn;

/// A message as delivered by the broker, undecoded.
#[derive(Debug, Clone, PartialEq)]
pub struct RawMessage {
    pub topic: String,
    pub payload: Vec<u8>,
    pub received_at: DateTime<Local>,
}

impl RawMessage {
    /// Stamp a message with the current time.
    #[must_use]
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
            received_at: Local::now(),
        }
    }
}

/// Producer half. Cheap to clone; pushing never blocks.
#[derive(Debug, Clone)]
pub struct InboundSender {
    tx: mpsc::UnboundedSender<RawMessage>,
    depth: Arc<AtomicUsize>,
}

impl InboundSender {
    /// Enqueue a message. Returns `false` if the consumer is gone.
    pub fn push(&self, message: RawMessage) -> bool {
        self.depth.fetch_add(1, Ordering::Relaxed);
        match self.tx.send(message) {
            Ok(()) => true,
            Err(e) => {
                self.depth.fetch_sub(1, Ordering::Relaxed);
                warn!(topic = %e.0.topic, "Inbound queue closed, message dropped");
                false
            }
        }
    }

    /// Messages enqueued but not yet taken.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth.load(Ordering::Relaxed)
    }
}

/// Consumer half, owned by the dispatcher.
#[derive(Debug)]
pub struct InboundReceiver {
    rx: mpsc::UnboundedReceiver<RawMessage>,
    depth: Arc<AtomicUsize>,
}

impl InboundReceiver {
    /// Take the next message if one is waiting.
    pub fn try_next(&mut self) -> Option<RawMessage> {
        let message = self.rx.try_recv().ok()?;
        self.taken();
        Some(message)
    }

    /// Wait for the next message. `None` once every sender is dropped.
    pub async fn recv(&mut self) -> Option<RawMessage> {
        let message = self.rx.recv().await?;
        self.taken();
        Some(message)
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth.load(Ordering::Relaxed)
    }

    fn taken(&self) {
        let _ = self
            .depth
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |d| d.checked_sub(1));
    }
}

/// Create the inbound queue.
#[must_use]
pub fn inbound_channel() -> (InboundSender, InboundReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    let depth = Arc::new(AtomicUsize::new(0));
    (
        InboundSender {
            tx,
            depth: Arc::clone(&depth),
        },
        InboundReceiver { rx, depth },
    )
}
