//! # Domain Layer
//!
//! Outcomes and errors of FaceMatch handling.

pub mod errors;
pub mod outcome;

pub use errors::*;
pub use outcome::*;
