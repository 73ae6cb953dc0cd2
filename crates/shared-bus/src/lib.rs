//! # Shared Bus - Message Plumbing Between Transport and Handlers
//!
//! Everything that moves messages between the MQTT transport and the
//! dispatcher lives here, so neither side depends on the other.
//!
//! ## Flow
//!
//! ```text
//! ┌──────────────┐   push()    ┌───────────────┐   recv()   ┌──────────────┐
//! │  Transport   │ ──────────→ │ Inbound Queue │ ─────────→ │  Dispatcher  │
//! │ (zg-01 task) │             │ (unbounded)   │            │   (zg-04)    │
//! └──────────────┘             └───────────────┘            └──────────────┘
//!        ↑                                                          │
//!        │              publish(envelope)                           │
//!        └──────────── EnvelopePublisher ←──────────────────────────┘
//! ```
//!
//! ## Rules
//!
//! - The transport's delivery task only pushes raw messages; it never decodes.
//! - Pushing never blocks (the queue is unbounded).
//! - Correlation entries expire after a TTL so unanswered requests cannot
//!   accumulate while devices are offline.

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod correlation;
pub mod inbound;
pub mod publisher;

// Re-export main types
pub use correlation::{cleanup_task, AckOutcome, CorrelationError, CorrelationStats, CorrelationTable};
pub use inbound::{inbound_channel, InboundReceiver, InboundSender, RawMessage};
pub use publisher::{EnvelopePublisher, InMemoryPublisher, PublishOutcome};

/// Default lifetime of a pending correlation entry, in seconds.
pub const DEFAULT_CORRELATION_TTL_SECS: u64 = 300;

/// Default interval between correlation sweeps, in seconds.
pub const DEFAULT_CORRELATION_GC_SECS: u64 = 30;
