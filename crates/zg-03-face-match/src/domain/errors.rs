//! # Domain Errors

use shared_types::StoreError;
use thiserror::Error;

/// Failures caught at the FaceMatch handler boundary.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FaceMatchError {
    /// Identity lookup failed (not a miss: the store itself errored).
    #[error("Identity lookup failed: {0}")]
    IdentityLookup(StoreError),

    /// The broker client rejected the response.
    #[error("Publishing access response failed: {0}")]
    Publish(String),

    /// The transaction sink rejected the record.
    #[error("Writing transaction failed: {0}")]
    Transaction(StoreError),
}
