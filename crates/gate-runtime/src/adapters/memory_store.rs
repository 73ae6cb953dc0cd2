//! # In-Memory Identity Store
//!
//! Snapshot of the identity store held behind a single `RwLock`. Implements
//! every port the core consumes, so one instance backs the policy engine,
//! both handlers and the transport's subscription list.
//!
//! Zone writes take the write lock and re-check their condition against the
//! current record, which is what makes them conditional.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use shared_types::{CameraBinding, DeviceEntry, IdentityRecord, StoreError};
use std::path::Path;
use tracing::{debug, info};
use zg_01_transport::SubscriptionTargets;
use zg_02_zone_policy::{CameraDirectory, ZoneCommit, ZoneSnapshot, ZoneStore};
use zg_03_face_match::IdentityDirectory;

/// Store export layout.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSnapshot {
    pub users: Vec<IdentityRecord>,
    pub cameras: Vec<CameraBinding>,
    pub readers: Vec<DeviceEntry>,
    pub servers: Vec<DeviceEntry>,
    pub qr_servers: Vec<DeviceEntry>,
}

/// Identity store kept in memory.
#[derive(Default)]
pub struct MemoryIdentityStore {
    inner: RwLock<StoreSnapshot>,
}

impl MemoryIdentityStore {
    #[must_use]
    pub fn new(snapshot: StoreSnapshot) -> Self {
        Self {
            inner: RwLock::new(snapshot),
        }
    }

    /// Load a JSON export.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let raw = std::fs::read(path).map_err(|e| StoreError::io(path.display().to_string(), &e))?;
        let snapshot: StoreSnapshot = serde_json::from_slice(&raw).map_err(|e| StoreError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        info!(
            path = %path.display(),
            users = snapshot.users.len(),
            cameras = snapshot.cameras.len(),
            readers = snapshot.readers.len(),
            "Identity store loaded"
        );
        Ok(Self::new(snapshot))
    }

    /// Insert or replace the identity with the same `face_id`.
    pub fn upsert_identity(&self, record: IdentityRecord) {
        let mut inner = self.inner.write();
        match inner.users.iter_mut().find(|u| u.face_id == record.face_id) {
            Some(existing) => *existing = record,
            None => inner.users.push(record),
        }
    }

    /// Insert or replace the camera with the same id.
    pub fn upsert_camera(&self, binding: CameraBinding) {
        let mut inner = self.inner.write();
        match inner.cameras.iter_mut().find(|c| c.camera_id == binding.camera_id) {
            Some(existing) => *existing = binding,
            None => inner.cameras.push(binding),
        }
    }

    #[must_use]
    pub fn identity(&self, face_id: &str) -> Option<IdentityRecord> {
        self.inner.read().users.iter().find(|u| u.face_id == face_id).cloned()
    }

    #[must_use]
    pub fn snapshot(&self) -> StoreSnapshot {
        self.inner.read().clone()
    }

    fn find_user<P>(&self, predicate: P) -> Option<IdentityRecord>
    where
        P: Fn(&IdentityRecord) -> bool,
    {
        self.inner
            .read()
            .users
            .iter()
            .find(|u| u.enabled && predicate(u))
            .cloned()
    }
}

impl IdentityDirectory for MemoryIdentityStore {
    fn find_by_face_id(&self, face_id: &str) -> Result<Option<IdentityRecord>, StoreError> {
        Ok(self.find_user(|u| u.face_id == face_id))
    }

    fn find_by_card_number(&self, card: &str) -> Result<Option<IdentityRecord>, StoreError> {
        Ok(self.find_user(|u| u.holds_card(card)))
    }

    fn find_by_pin(&self, pin: &str) -> Result<Option<IdentityRecord>, StoreError> {
        Ok(self.find_user(|u| u.pin_number.as_deref() == Some(pin)))
    }
}

impl ZoneStore for MemoryIdentityStore {
    fn zone_snapshot(&self, card: &str) -> Result<Option<ZoneSnapshot>, StoreError> {
        Ok(self.find_user(|u| u.holds_card(card)).as_ref().map(ZoneSnapshot::from))
    }

    fn commit(&self, card: &str, commit: &ZoneCommit) -> Result<bool, StoreError> {
        let mut inner = self.inner.write();
        let Some(user) = inner.users.iter_mut().find(|u| u.enabled && u.holds_card(card)) else {
            return Ok(false);
        };

        let applied = match commit {
            ZoneCommit::MoveTo { zone } => {
                if !user.may_enter(*zone) || user.current_zone == *zone {
                    false
                } else {
                    user.current_zone = *zone;
                    user.free_movement = false;
                    true
                }
            }
            ZoneCommit::ResetToPerimeter { zone } => {
                user.current_zone = *zone;
                user.free_movement = false;
                true
            }
            ZoneCommit::ConsumeFreePass => {
                let was_set = user.free_movement;
                user.free_movement = false;
                was_set
            }
            ZoneCommit::PruneAccessZones { zones } => {
                let before = user.access_zones.len();
                user.access_zones.retain(|z| !zones.contains(z));
                user.access_zones.len() != before
            }
        };
        debug!(face_id = %user.face_id, commit = commit.label(), applied, "Zone commit");
        Ok(applied)
    }
}

impl CameraDirectory for MemoryIdentityStore {
    fn camera_binding(&self, camera_id: &str) -> Option<CameraBinding> {
        self.inner
            .read()
            .cameras
            .iter()
            .find(|c| c.camera_id == camera_id)
            .cloned()
    }
}

impl SubscriptionTargets for MemoryIdentityStore {
    fn subscription_targets(&self) -> Vec<DeviceEntry> {
        let inner = self.inner.read();
        inner
            .readers
            .iter()
            .chain(inner.servers.iter())
            .chain(inner.qr_servers.iter())
            .cloned()
            .collect()
    }
}
