//! In-memory transaction sink.

use crate::ports::TransactionSink;
use parking_lot::Mutex;
use shared_types::{StoreError, TransactionRecord};

/// Keeps every appended transaction in order.
#[derive(Default)]
pub struct MemoryTransactionSink {
    records: Mutex<Vec<TransactionRecord>>,
    reject_writes: bool,
}

impl MemoryTransactionSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink that refuses every write.
    #[must_use]
    pub fn rejecting() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            reject_writes: true,
        }
    }

    #[must_use]
    pub fn records(&self) -> Vec<TransactionRecord> {
        self.records.lock().clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl TransactionSink for MemoryTransactionSink {
    fn append_transaction(&self, record: TransactionRecord) -> Result<(), StoreError> {
        if self.reject_writes {
            return Err(StoreError::WriteRejected(format!(
                "transaction {} refused",
                record.object_id
            )));
        }
        self.records.lock().push(record);
        Ok(())
    }
}
