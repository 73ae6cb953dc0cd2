//! # Domain Errors

use shared_types::StoreError;
use thiserror::Error;

/// Why a payload could not be turned into an [`crate::InboundMessage`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Received empty payload")]
    Empty,

    #[error("Failed to parse JSON: {0}")]
    Json(String),

    #[error("Payload is not a JSON object")]
    NotAnObject,

    #[error("Envelope has no top-level message tag")]
    NoTopLevelTag,

    #[error("Body of {0} is not a JSON object")]
    BodyNotAnObject(String),

    #[error("Missing required FaceMatch keys: {0:?}")]
    MissingFields(Vec<String>),

    #[error("Malformed FaceMatch payload: {0}")]
    FaceMatch(String),
}

impl DecodeError {
    /// Metric label for the failure.
    #[must_use]
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Json(_) | Self::NotAnObject | Self::NoTopLevelTag | Self::BodyNotAnObject(_) => {
                "decode"
            }
            Self::MissingFields(_) | Self::FaceMatch(_) => "missing_keys",
        }
    }
}

/// Failures inside a general envelope handler.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Publishing {tag} failed: {reason}")]
    Publish { tag: &'static str, reason: String },
}
