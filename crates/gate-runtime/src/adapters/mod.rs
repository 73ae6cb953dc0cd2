//! # Adapters
//!
//! Port implementations the runtime wires into the subsystems.

pub mod machine;
pub mod memory_store;
pub mod sinks;

pub use memory_store::{MemoryIdentityStore, StoreSnapshot};
pub use sinks::{FileDiagnosticSink, TracingSensorSink, TracingTransactionSink};
