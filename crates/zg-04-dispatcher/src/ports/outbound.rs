//! # Outbound Ports (Driven Ports)

use async_trait::async_trait;
use serde_json::Value;
use shared_types::{SensorReading, StoreError};
use std::path::Path;

/// Temperature and sensor log.
pub trait SensorSink: Send + Sync {
    fn append_reading(&self, reading: SensorReading) -> Result<(), StoreError>;
}

/// Local files kept for troubleshooting devices.
#[async_trait]
pub trait DiagnosticSink: Send + Sync {
    /// Store a payload byte for byte.
    async fn save_raw_payload(&self, path: &Path, payload: &[u8]) -> Result<(), StoreError>;

    /// Store a JSON document, pretty printed.
    async fn save_json(&self, path: &Path, value: &Value) -> Result<(), StoreError>;
}
