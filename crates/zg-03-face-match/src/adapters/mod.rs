//! # Adapters
//!
//! In-memory implementations of the ports.

pub mod memory;

pub use memory::MemoryTransactionSink;
