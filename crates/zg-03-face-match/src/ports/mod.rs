//! # Ports Layer
//!
//! Driven ports consumed by the FaceMatch handler and the general envelope
//! handler. Both are implemented by the identity store adapter.

pub mod outbound;

pub use outbound::*;
