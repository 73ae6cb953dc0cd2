//! # Ports Layer
//!
//! Record sinks the dispatcher writes to. Identity lookups and the
//! transaction log are the FaceMatch crate's ports.

pub mod outbound;

pub use outbound::*;
