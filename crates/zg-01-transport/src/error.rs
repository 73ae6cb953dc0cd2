use thiserror::Error;

/// Errors that can occur in MQTT transport operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Broker refused or dropped the first session.
    #[error("connection to {broker} failed: {reason}")]
    ConnectFailed { broker: String, reason: String },

    /// No ConnAck within the connect timeout.
    #[error("connection to {broker} timed out after {timeout_ms} ms")]
    ConnectTimeout { broker: String, timeout_ms: u64 },

    /// `connect()` has not succeeded yet.
    #[error("transport not connected")]
    NotConnected,
}
