//! # MQTT Transport Subsystem (zg-01)
//!
//! Owns the broker session. Everything above this crate sees only the
//! inbound queue and the [`EnvelopePublisher`](shared_bus::EnvelopePublisher)
//! port.
//!
//! ## Session Lifecycle
//!
//! ```text
//! connect() ──→ Connecting ──ConnAck ok──→ Connected ──error──→ Disconnected
//!                   │                          ↑                     │
//!                   │ error / refused          └──── ConnAck ok ─────┘
//!                   ↓                        (re-subscribe, SessionEvent)
//!                Failed   (terminal until the next connect())
//! ```
//!
//! ## Topics
//!
//! | Direction | Topic |
//! |-----------|-------|
//! | Publish   | `{base_topic}/{own_serial}` |
//! | Subscribe | `{base_topic}/{serial}` for every reader, server, QR server and test client |
//!
//! ## Rules
//!
//! - Publishes while disconnected are dropped with a warning, never queued.
//! - The delivery task does no decoding; payloads reach the dispatcher as
//!   received.

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod client;
pub mod config;
pub mod error;
pub mod targets;

pub use client::{LinkState, MqttTransport, SessionEvent, CONNECT_POLL_INTERVAL};
pub use config::{qos_level, MqttSettings};
pub use error::TransportError;
pub use targets::{dedupe_targets, SubscriptionEntry, SubscriptionLedger, SubscriptionTargets};
