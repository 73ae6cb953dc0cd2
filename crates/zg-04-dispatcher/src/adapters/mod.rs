//! # Adapters
//!
//! In-memory sinks.

pub mod memory;

pub use memory::{MemoryDiagnosticSink, MemorySensorSink, SavedFile};
