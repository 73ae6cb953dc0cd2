//! # Outbound Ports (Driven Ports)

use shared_types::{IdentityRecord, StoreError, TransactionRecord};

/// Read access to identity records.
///
/// `Ok(None)` is a miss; `Err` means the store could not answer.
pub trait IdentityDirectory: Send + Sync {
    fn find_by_face_id(&self, face_id: &str) -> Result<Option<IdentityRecord>, StoreError>;

    /// Identity holding `card` in its card list.
    fn find_by_card_number(&self, card: &str) -> Result<Option<IdentityRecord>, StoreError>;

    fn find_by_pin(&self, pin: &str) -> Result<Option<IdentityRecord>, StoreError>;
}

/// Append-only transaction log.
pub trait TransactionSink: Send + Sync {
    fn append_transaction(&self, record: TransactionRecord) -> Result<(), StoreError>;
}
