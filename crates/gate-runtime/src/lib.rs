//! # Gate Runtime Library
//!
//! Exposes the runtime's container, adapters and handlers for testing. The
//! entry point is the `main.rs` binary.
//!
//! ## Modular Structure
//!
//! - `container/` - configuration and subsystem wiring
//! - `adapters/` - identity store, record sinks, host facts
//! - `handlers/` - on-connect announcements and timers

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod adapters;
pub mod container;
pub mod handlers;

pub use adapters::{MemoryIdentityStore, StoreSnapshot};
pub use container::subsystems::{wire_core, CoreServices, RecordSinks};
pub use container::{ConfigError, GateConfig, GateContainer};
pub use handlers::Announcer;
