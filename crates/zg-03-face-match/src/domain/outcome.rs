//! # Handling Outcomes

use shared_types::{DecisionReason, SerialNumber};

/// Why an event was dropped before any decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardReason {
    /// The match came from a watchlist the camera does not act on.
    WatchlistNotPermitted,
    /// The camera is not bound to a reader.
    NoReader,
}

impl DiscardReason {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WatchlistNotPermitted => "watchlist_not_permitted",
            Self::NoReader => "no_reader",
        }
    }
}

/// What happened to one FaceMatch event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FaceMatchOutcome {
    /// Dropped silently, nothing published.
    Discarded(DiscardReason),
    /// Deny response published to the reader.
    Denied {
        reader_serial: SerialNumber,
        reason: DecisionReason,
    },
    /// Grant response published and transaction recorded.
    Granted {
        reader_serial: SerialNumber,
        found: bool,
        verif_ident: bool,
    },
    /// An error interrupted handling; it was logged.
    Failed(String),
}
