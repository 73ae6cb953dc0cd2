//! # Shared Types Crate
//!
//! Domain entities and wire types used by every zone-gate subsystem.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: identity, camera and decision types live here.
//! - **One Envelope**: every outbound command is wrapped in
//!   [`OutboundEnvelope`], a JSON object with exactly one top-level key equal
//!   to the message-type tag.
//! - **Closed Command Set**: outbound payloads are the variants of [`Command`];
//!   nothing publishes an ad-hoc map.
//!
//! ## Wire Layout
//!
//! ```text
//! {
//!   "msg_str_user_record_response": {
//!     "_iD": "5f0c...", "clientId": "...", "programVersion": "...",
//!     "serialSource": "...", "serialDestination": "...", "broadCast": false,
//!     "ipAddress": "...", "hostName": "...", "unixTime": 1700000000,
//!     "dateTime": "2024/12/18 16:49:44",
//!     "granted": true, "faceId": "...", ...
//!   }
//! }
//! ```

pub mod commands;
pub mod entities;
pub mod envelope;
pub mod errors;
pub mod ipc;

pub use commands::*;
pub use entities::*;
pub use envelope::{
    is_valid_datetime_format, new_object_id, EnvelopeFactory, EnvelopeHeader, MachineIdentity,
    OutboundEnvelope,
};
pub use errors::*;
pub use ipc::*;
