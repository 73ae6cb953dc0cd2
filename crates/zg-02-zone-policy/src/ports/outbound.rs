//! # Outbound Ports (Driven Ports)
//!
//! Implemented by the identity store adapter. Calls are synchronous; the
//! store is expected to answer from memory or a local connection.

use crate::domain::{ZoneCommit, ZoneSnapshot};
use shared_types::{CameraBinding, CameraZoneConfig, SerialNumber, StoreError, Zone};
use std::collections::HashSet;

/// Zone state keyed by card number.
pub trait ZoneStore: Send + Sync {
    /// Zone attributes of the identity holding `card`.
    fn zone_snapshot(&self, card: &str) -> Result<Option<ZoneSnapshot>, StoreError>;

    /// Apply one conditional write.
    ///
    /// Returns `Ok(false)` when the condition did not hold (unknown card,
    /// zone not permitted, zone already current) and nothing was written.
    fn commit(&self, card: &str, commit: &ZoneCommit) -> Result<bool, StoreError>;

    /// Move the holder of `card` to `zone` if permitted.
    fn update_zone_if_valid(&self, card: &str, zone: Zone) -> Result<bool, StoreError> {
        self.commit(card, &ZoneCommit::MoveTo { zone })
    }
}

/// Camera and reader bindings.
pub trait CameraDirectory: Send + Sync {
    fn camera_binding(&self, camera_id: &str) -> Option<CameraBinding>;

    /// Watchlist ids whose matches this camera acts on.
    fn permitted_watchlist_ids(&self, camera_id: &str) -> HashSet<String> {
        self.camera_binding(camera_id)
            .map(|binding| binding.permitted_watchlist_ids())
            .unwrap_or_default()
    }

    /// Serial of the reader the camera opens.
    fn reader_serial(&self, camera_id: &str) -> Option<SerialNumber> {
        self.camera_binding(camera_id)
            .and_then(|binding| binding.reader_serial)
            .filter(|serial| !serial.is_empty())
    }

    fn camera_verif_ident(&self, camera_id: &str) -> bool {
        self.camera_binding(camera_id)
            .map(|binding| binding.verif_ident)
            .unwrap_or(false)
    }

    fn camera_zone_config(&self, camera_id: &str) -> Option<CameraZoneConfig> {
        self.camera_binding(camera_id).map(|binding| binding.zones)
    }
}
