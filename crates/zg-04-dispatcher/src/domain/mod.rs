//! # Domain Layer
//!
//! Inbound message decoding and the closed set of general commands.

pub mod errors;
pub mod message;

pub use errors::*;
pub use message::*;
