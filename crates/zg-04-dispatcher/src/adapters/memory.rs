//! In-memory sensor and diagnostic sinks.

use crate::ports::{DiagnosticSink, SensorSink};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use shared_types::{SensorReading, StoreError};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Keeps every sensor reading in order.
#[derive(Default)]
pub struct MemorySensorSink {
    readings: Mutex<Vec<SensorReading>>,
}

impl MemorySensorSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn readings(&self) -> Vec<SensorReading> {
        self.readings.lock().clone()
    }
}

impl SensorSink for MemorySensorSink {
    fn append_reading(&self, reading: SensorReading) -> Result<(), StoreError> {
        self.readings.lock().push(reading);
        Ok(())
    }
}

/// A file the diagnostic sink was asked to write.
#[derive(Debug, Clone, PartialEq)]
pub enum SavedFile {
    Raw(Vec<u8>),
    Json(Value),
}

/// Keeps saved files keyed by path; later writes replace earlier ones.
#[derive(Default)]
pub struct MemoryDiagnosticSink {
    files: Mutex<BTreeMap<PathBuf, SavedFile>>,
}

impl MemoryDiagnosticSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, path: &Path) -> Option<SavedFile> {
        self.files.lock().get(path).cloned()
    }

    #[must_use]
    pub fn paths(&self) -> Vec<PathBuf> {
        self.files.lock().keys().cloned().collect()
    }
}

#[async_trait]
impl DiagnosticSink for MemoryDiagnosticSink {
    async fn save_raw_payload(&self, path: &Path, payload: &[u8]) -> Result<(), StoreError> {
        self.files
            .lock()
            .insert(path.to_path_buf(), SavedFile::Raw(payload.to_vec()));
        Ok(())
    }

    async fn save_json(&self, path: &Path, value: &Value) -> Result<(), StoreError> {
        self.files
            .lock()
            .insert(path.to_path_buf(), SavedFile::Json(value.clone()));
        Ok(())
    }
}
