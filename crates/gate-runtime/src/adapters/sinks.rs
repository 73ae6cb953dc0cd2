//! Record sinks: transaction and sensor logs as structured log lines, and
//! diagnostic files on local disk.

use async_trait::async_trait;
use serde_json::Value;
use shared_types::{SensorReading, StoreError, TransactionRecord};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;
use zg_03_face_match::TransactionSink;
use zg_04_dispatcher::{DiagnosticSink, SensorSink};

/// Writes each transaction as one `transactions` target log line.
#[derive(Default)]
pub struct TracingTransactionSink {
    appended: AtomicU64,
}

impl TracingTransactionSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn appended(&self) -> u64 {
        self.appended.load(Ordering::Relaxed)
    }
}

impl TransactionSink for TracingTransactionSink {
    fn append_transaction(&self, record: TransactionRecord) -> Result<(), StoreError> {
        info!(
            target: "transactions",
            object_id = %record.object_id,
            date_time = %record.date_time,
            transaction_type = %record.transaction_type,
            id_number = %record.id_number,
            unique_id = %record.unique_id,
            full_name = %record.full_name,
            serial_source = %record.serial_source,
            "Transaction"
        );
        self.appended.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

/// Writes each sensor reading as one `sensors` target log line.
#[derive(Default)]
pub struct TracingSensorSink {
    appended: AtomicU64,
}

impl TracingSensorSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn appended(&self) -> u64 {
        self.appended.load(Ordering::Relaxed)
    }
}

impl SensorSink for TracingSensorSink {
    fn append_reading(&self, reading: SensorReading) -> Result<(), StoreError> {
        info!(
            target: "sensors",
            object_id = ?reading.object_id,
            date_time = %reading.date_time,
            serial_source = %reading.serial_source,
            host_name = ?reading.host_name,
            ip_address = ?reading.ip_address,
            sensor_name = ?reading.sensor_name,
            temp_value = ?reading.temp_value,
            "Sensor reading"
        );
        self.appended.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

/// Writes diagnostics to the local filesystem, creating parent directories.
///
/// Writes go through `tokio::fs` so the dispatcher task never blocks on disk.
#[derive(Default)]
pub struct FileDiagnosticSink;

impl FileDiagnosticSink {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    async fn write(path: &Path, contents: &[u8]) -> Result<(), StoreError> {
        let path_label = || path.display().to_string();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::io(path_label(), &e))?;
        }
        tokio::fs::write(path, contents)
            .await
            .map_err(|e| StoreError::io(path_label(), &e))
    }
}

#[async_trait]
impl DiagnosticSink for FileDiagnosticSink {
    async fn save_raw_payload(&self, path: &Path, payload: &[u8]) -> Result<(), StoreError> {
        Self::write(path, payload).await
    }

    async fn save_json(&self, path: &Path, value: &Value) -> Result<(), StoreError> {
        let pretty = serde_json::to_vec_pretty(value).map_err(|e| StoreError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::write(path, &pretty).await
    }
}
