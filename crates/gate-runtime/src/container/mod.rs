//! # Gate Container
//!
//! Configuration plus the wiring of every subsystem into one container.

pub mod config;
pub mod subsystems;

pub use config::{ConfigError, GateConfig};
pub use subsystems::GateContainer;
