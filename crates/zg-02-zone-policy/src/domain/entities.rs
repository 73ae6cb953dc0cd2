//! # Zone Policy Entities
//!
//! Inputs and outputs of one policy evaluation.

use serde::{Deserialize, Serialize};
use shared_types::{AccessDecision, IdentityRecord, Zone, UNDEFINED_ZONE};

/// Zone-related attributes of one identity, read before evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ZoneSnapshot {
    pub access_zones: Vec<Zone>,
    pub current_zone: Zone,
    pub free_movement: bool,
}

impl ZoneSnapshot {
    #[must_use]
    pub fn contains(&self, zone: Zone) -> bool {
        self.access_zones.contains(&zone)
    }

    #[must_use]
    pub fn has_invalid_zone(&self) -> bool {
        self.contains(UNDEFINED_ZONE)
    }

    #[must_use]
    pub fn is_undefined(&self) -> bool {
        self.current_zone == UNDEFINED_ZONE
    }
}

impl From<&IdentityRecord> for ZoneSnapshot {
    fn from(record: &IdentityRecord) -> Self {
        Self {
            access_zones: record.access_zones.clone(),
            current_zone: record.current_zone,
            free_movement: record.free_movement,
        }
    }
}

/// Site-wide policy switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZonePolicy {
    /// Zone assumed for anyone whose current zone is below it.
    pub perimeter_zone: Zone,
    /// Require both sides of the door in the access zones.
    pub access_zone_function: bool,
    /// Require the identity to be on the entry side of the door.
    pub anti_passback_function: bool,
}

impl Default for ZonePolicy {
    fn default() -> Self {
        Self {
            perimeter_zone: 1,
            access_zone_function: true,
            anti_passback_function: true,
        }
    }
}

/// A conditional write requested by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ZoneCommit {
    /// Set the current zone if it is permitted and differs from the current
    /// one. Clears free movement in the same write.
    MoveTo { zone: Zone },
    /// Place the identity in the perimeter zone and clear free movement.
    ResetToPerimeter { zone: Zone },
    /// Clear the free movement flag.
    ConsumeFreePass,
    /// Remove these zones from the access zones.
    PruneAccessZones { zones: Vec<Zone> },
}

impl ZoneCommit {
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::MoveTo { .. } => "move_to",
            Self::ResetToPerimeter { .. } => "reset_to_perimeter",
            Self::ConsumeFreePass => "consume_free_pass",
            Self::PruneAccessZones { .. } => "prune_access_zones",
        }
    }
}

/// Decision plus the ordered writes that realise it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneEvaluation {
    pub decision: AccessDecision,
    pub commits: Vec<ZoneCommit>,
}

impl ZoneEvaluation {
    #[must_use]
    pub fn new(decision: AccessDecision) -> Self {
        Self {
            decision,
            commits: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_commit(mut self, commit: ZoneCommit) -> Self {
        self.commits.push(commit);
        self
    }
}
