//! # FaceMatch Correlation Handler (zg-03)
//!
//! Turns a watchlist face match from a recognition camera into an access
//! response for the reader bound to that camera.
//!
//! ## Flow
//!
//! ```text
//! FaceMatchEvent
//!   │
//!   ├─ watchlist permitted for camera? ── no ──→ discard (info)
//!   ├─ camera bound to a reader?       ── no ──→ discard (info)
//!   ├─ register objectId → reader serial (duplicate: warn, keep first)
//!   ├─ identity by faceId (miss → "Person in DB Un-named!", found = false)
//!   ├─ zone policy (zg-02) with the active card
//!   │     ├─ denied  ──→ msg_str_user_record_response granted=false
//!   │     └─ allowed ──→ msg_str_user_record_response granted=found
//!   │                     verifIdent = user ∨ camera ∨ watchlist
//!   └─ FACE_Identified transaction (grants only)
//! ```
//!
//! The reader later confirms with `msg_sd_log_transation`; the dispatcher
//! (zg-04) matches that against the registered serial.

pub mod adapters;
pub mod domain;
pub mod handler;
pub mod ports;

pub use adapters::MemoryTransactionSink;
pub use domain::{DiscardReason, FaceMatchError, FaceMatchOutcome};
pub use handler::{FaceMatchDeps, FaceMatchHandler, UNNAMED_PERSON};
pub use ports::{IdentityDirectory, TransactionSink};
