//! # Inbound Ports (Driving Ports)

use shared_types::AccessDecision;

/// Zone access decision for one identification.
pub trait ZoneAccessApi: Send + Sync {
    /// Decide whether the holder of `card` may pass the door watched by
    /// `camera_id`, applying any zone update the decision implies.
    ///
    /// Never fails: lookup and store errors become deny decisions.
    fn evaluate_access(&self, card: Option<&str>, camera_id: &str) -> AccessDecision;
}
