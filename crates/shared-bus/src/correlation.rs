//! # Correlation Table
//!
//! Tracks which reader a FaceMatch decision was sent to, keyed by the event
//! id, so the reader's later `msg_sd_log_transation` acknowledgement can be
//! checked against it.
//!
//! ## Rules
//!
//! - At most one entry per event id. A duplicate insert is rejected and the
//!   existing serial is kept.
//! - An acknowledgement pops the entry whether or not the responder matches.
//! - Entries expire after a TTL. Sweeps run on insert once the GC interval has
//!   elapsed, and from [`cleanup_task`].

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use shared_types::SerialNumber;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, error, warn};

use crate::{DEFAULT_CORRELATION_GC_SECS, DEFAULT_CORRELATION_TTL_SECS};

/// Errors from correlation table operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CorrelationError {
    /// An entry for this id is already outstanding.
    #[error("Duplicate objectId {object_id} (pending for {existing})")]
    Duplicate {
        object_id: String,
        existing: SerialNumber,
    },
}

/// Result of matching an acknowledgement against the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AckOutcome {
    /// Responder is the reader the decision was sent to.
    Matched { serial: SerialNumber },
    /// Entry existed but a different device acknowledged it.
    Mismatch {
        expected: SerialNumber,
        responder: Option<SerialNumber>,
    },
    /// No entry (never registered, already consumed, or expired).
    Unknown,
}

struct PendingCorrelation {
    serial: SerialNumber,
    created_at: Instant,
}

/// Counters for the correlation table.
#[derive(Debug, Default)]
pub struct CorrelationStats {
    pub total_registered: AtomicU64,
    pub total_duplicates: AtomicU64,
    pub total_matched: AtomicU64,
    pub total_mismatched: AtomicU64,
    pub total_expired: AtomicU64,
}

/// Pending event id → reader serial.
pub struct CorrelationTable {
    pending: DashMap<String, PendingCorrelation>,
    ttl: Duration,
    gc_interval: Duration,
    last_gc: Mutex<Instant>,
    stats: Arc<CorrelationStats>,
}

impl CorrelationTable {
    /// Table with the default TTL and GC interval.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(
            Duration::from_secs(DEFAULT_CORRELATION_TTL_SECS),
            Duration::from_secs(DEFAULT_CORRELATION_GC_SECS),
        )
    }

    #[must_use]
    pub fn with_config(ttl: Duration, gc_interval: Duration) -> Self {
        Self {
            pending: DashMap::new(),
            ttl,
            gc_interval,
            last_gc: Mutex::new(Instant::now()),
            stats: Arc::new(CorrelationStats::default()),
        }
    }

    /// Register `object_id → serial` unless the id is already pending.
    ///
    /// # Errors
    ///
    /// - `CorrelationError::Duplicate` - the id is outstanding; the existing
    ///   entry is left untouched.
    pub fn insert_if_absent(
        &self,
        object_id: &str,
        serial: impl Into<SerialNumber>,
    ) -> Result<(), CorrelationError> {
        self.maybe_collect();

        match self.pending.entry(object_id.to_string()) {
            Entry::Occupied(existing) => {
                self.stats.total_duplicates.fetch_add(1, Ordering::Relaxed);
                Err(CorrelationError::Duplicate {
                    object_id: object_id.to_string(),
                    existing: existing.get().serial.clone(),
                })
            }
            Entry::Vacant(slot) => {
                let serial = serial.into();
                debug!(object_id, serial = %serial, "Registered pending correlation");
                slot.insert(PendingCorrelation {
                    serial,
                    created_at: Instant::now(),
                });
                self.stats.total_registered.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
        }
    }

    /// Read and remove the serial registered for `object_id`.
    ///
    /// An entry past its TTL counts as absent.
    pub fn pop(&self, object_id: &str) -> Option<SerialNumber> {
        let (_, entry) = self.pending.remove(object_id)?;
        if entry.created_at.elapsed() > self.ttl {
            self.stats.total_expired.fetch_add(1, Ordering::Relaxed);
            return None;
        }
        Some(entry.serial)
    }

    /// Consume the entry for `object_id` and check the responder.
    ///
    /// A mismatch is logged as an error; it is never silently accepted.
    pub fn acknowledge(&self, object_id: &str, responder: Option<&str>) -> AckOutcome {
        let Some(expected) = self.pop(object_id) else {
            return AckOutcome::Unknown;
        };

        if responder == Some(expected.as_str()) {
            self.stats.total_matched.fetch_add(1, Ordering::Relaxed);
            AckOutcome::Matched { serial: expected }
        } else {
            self.stats.total_mismatched.fetch_add(1, Ordering::Relaxed);
            error!(
                object_id,
                expected = %expected,
                responder = ?responder,
                "Transaction mismatch: acknowledgement from unexpected device"
            );
            AckOutcome::Mismatch {
                expected,
                responder: responder.map(str::to_string),
            }
        }
    }

    /// Drop entries older than the TTL. Returns how many were removed.
    pub fn evict_expired(&self) -> usize {
        let now = Instant::now();
        let mut removed = 0;

        self.pending.retain(|id, entry| {
            let age = now.duration_since(entry.created_at);
            if age > self.ttl {
                warn!(
                    object_id = %id,
                    serial = %entry.serial,
                    age_ms = age.as_millis(),
                    "Evicting unacknowledged correlation"
                );
                removed += 1;
                false
            } else {
                true
            }
        });

        if removed > 0 {
            self.stats
                .total_expired
                .fetch_add(removed as u64, Ordering::Relaxed);
        }
        *self.last_gc.lock() = now;
        removed
    }

    #[must_use]
    pub fn contains(&self, object_id: &str) -> bool {
        self.pending.contains_key(object_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    #[must_use]
    pub fn stats(&self) -> &CorrelationStats {
        &self.stats
    }

    fn maybe_collect(&self) {
        let due = self.last_gc.lock().elapsed() > self.gc_interval;
        if due {
            self.evict_expired();
        }
    }
}

impl Default for CorrelationTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Background sweep of expired entries until `shutdown` flips.
pub async fn cleanup_task(
    table: Arc<CorrelationTable>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let removed = table.evict_expired();
                if removed > 0 {
                    debug!(removed, pending = table.len(), "Cleaned up expired correlations");
                }
            }
            _ = shutdown.changed() => break,
        }
    }
}
