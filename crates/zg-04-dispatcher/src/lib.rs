//! # Inbound Dispatcher Subsystem (zg-04)
//!
//! Drains the inbound queue one message per cycle, decodes each payload and
//! routes it to the matching handler.
//!
//! ## Cycle
//!
//! ```text
//! RawMessage ─→ loopback? ──yes──→ drop (own publish echoed back)
//!                   │ no
//!                   ↓
//!             [raw capture]  (optional, diagnostics)
//!                   ↓
//!               decode() ──err──→ log + zg_dispatch_errors_total{stage}
//!                   │
//!        ┌──────────┼─────────────────┐
//!        ↓          ↓                 ↓
//!    FaceMatch   General         other routed type
//!    (zg-03)     envelope        → ignored
//!                handler
//! ```
//!
//! ## Guarantees
//!
//! - At most one message is processed at a time.
//! - A malformed or failing message never stops the loop; the next cycle
//!   proceeds normally.
//! - General envelopes are acted on only when broadcast or addressed to
//!   this instance's serial.

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod adapters;
pub mod domain;
pub mod general;
pub mod ports;
pub mod service;

pub use adapters::{MemoryDiagnosticSink, MemorySensorSink, SavedFile};
pub use domain::{decode, DecodeError, DispatchError, GeneralCommand, InboundMessage};
pub use general::{GeneralDeps, GeneralEnvelopeHandler, GeneralOutcome};
pub use ports::{DiagnosticSink, SensorSink};
pub use service::{CycleOutcome, Dispatcher, DispatcherConfig};
