//! # Domain Errors

use shared_types::{DecisionReason, StoreError};
use thiserror::Error;

/// Failures while evaluating a passage.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ZonePolicyError {
    /// No card was presented, or no identity holds it.
    #[error("No identity for card {card:?}")]
    IdentityUnknown { card: Option<String> },

    /// The camera has no binding.
    #[error("Unknown camera {camera_id}")]
    CameraUnknown { camera_id: String },

    /// Reading the snapshot or applying a commit failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ZonePolicyError {
    /// Reason reported in the deny decision.
    #[must_use]
    pub fn deny_reason(&self) -> DecisionReason {
        match self {
            Self::IdentityUnknown { .. } => DecisionReason::IdentityUnknown,
            Self::CameraUnknown { .. } => DecisionReason::CameraUnknown,
            Self::Store(_) => DecisionReason::EvaluationFailed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deny_reasons() {
        let err = ZonePolicyError::from(StoreError::Unavailable("down".into()));
        assert_eq!(err.deny_reason(), DecisionReason::EvaluationFailed);
        assert_eq!(
            ZonePolicyError::CameraUnknown {
                camera_id: "cam".into()
            }
            .deny_reason(),
            DecisionReason::CameraUnknown
        );
    }
}
