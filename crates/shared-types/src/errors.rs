//! # Error Types
//!
//! Errors raised by collaborators shared across subsystems.

use thiserror::Error;

/// Failures of the identity store and the record sinks.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// The store could not be reached or answered with an error.
    #[error("Identity store unavailable: {0}")]
    Unavailable(String),

    /// A write was rejected.
    #[error("Write rejected: {0}")]
    WriteRejected(String),

    /// Reading or writing a local file failed.
    #[error("I/O error on {path}: {message}")]
    Io { path: String, message: String },
}

impl StoreError {
    #[must_use]
    pub fn io(path: impl Into<String>, err: &std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            message: err.to_string(),
        }
    }
}
