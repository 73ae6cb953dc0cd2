//! # Domain Entities
//!
//! Identity records, camera bindings and access decisions.
//!
//! Field names on the serialized forms follow the identity store's document
//! layout (`cardNumbers`, `current_access_zone`, ...), so the same structs can
//! be loaded straight from a store export.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;

/// An integer-labelled physical area.
pub type Zone = u32;

/// Device serial number. Also the last segment of every MQTT topic.
pub type SerialNumber = String;

/// Card number as issued to a credential holder.
pub type CardNumber = String;

/// Zone value meaning "not yet known". Never valid inside `access_zones`.
pub const UNDEFINED_ZONE: Zone = 0;

// =============================================================================
// IDENTITY
// =============================================================================

/// A credential holder as stored in the identity store.
///
/// `face_id` is immutable; everything else may be changed by the store. The
/// router only reads these records and requests conditional zone updates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityRecord {
    /// Recognition subsystem identifier.
    #[serde(rename = "faceId")]
    pub face_id: String,

    #[serde(rename = "firstName", default)]
    pub first_name: String,

    #[serde(rename = "lastName", default)]
    pub last_name: String,

    /// Issued cards, oldest first. The last entry is the active card.
    #[serde(rename = "cardNumbers", default)]
    pub card_numbers: Vec<CardNumber>,

    #[serde(rename = "pinNumber", default)]
    pub pin_number: Option<String>,

    /// Zones this holder may enter.
    #[serde(rename = "accessZones", default)]
    pub access_zones: Vec<Zone>,

    /// Last recorded zone, `0` when undefined.
    #[serde(rename = "current_access_zone", default)]
    pub current_zone: Zone,

    /// One-shot override of the zone rules.
    #[serde(rename = "free_movement", default)]
    pub free_movement: bool,

    /// Holder requires verification mode at the reader.
    #[serde(rename = "verifIdent", default)]
    pub verif_ident: bool,

    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl IdentityRecord {
    /// Create a record with no cards, no zones and an undefined current zone.
    #[must_use]
    pub fn new(face_id: impl Into<String>, first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            face_id: face_id.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            card_numbers: Vec::new(),
            pin_number: None,
            access_zones: Vec::new(),
            current_zone: UNDEFINED_ZONE,
            free_movement: false,
            verif_ident: false,
            enabled: true,
        }
    }

    /// "First Last", trimmed.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }

    /// The most recently issued card.
    #[must_use]
    pub fn active_card(&self) -> Option<&CardNumber> {
        self.card_numbers.last()
    }

    #[must_use]
    pub fn holds_card(&self, card: &str) -> bool {
        self.card_numbers.iter().any(|c| c == card)
    }

    #[must_use]
    pub fn may_enter(&self, zone: Zone) -> bool {
        self.access_zones.contains(&zone)
    }
}

fn default_true() -> bool {
    true
}

// =============================================================================
// CAMERA / READER BINDING
// =============================================================================

/// Zone transition enforced by one camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraZoneConfig {
    #[serde(rename = "fromZone")]
    pub from_zone: Zone,
    #[serde(rename = "toZone")]
    pub to_zone: Zone,
    /// Whether a pass through this camera moves the holder to `to_zone`.
    #[serde(rename = "updateZone", default)]
    pub update_zone: bool,
}

/// A recognition camera and the reader it drives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraBinding {
    #[serde(rename = "cameraId")]
    pub camera_id: String,

    #[serde(default)]
    pub name: String,

    #[serde(flatten)]
    pub zones: CameraZoneConfig,

    /// Reader that receives the decision for this camera.
    #[serde(rename = "readerSerial", default)]
    pub reader_serial: Option<SerialNumber>,

    /// Watchlists this camera may act on, keyed by watchlist name.
    #[serde(rename = "watchlists", default)]
    pub permitted_watchlists: BTreeMap<String, String>,

    #[serde(rename = "verifIdent", default)]
    pub verif_ident: bool,

    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl CameraBinding {
    /// Identifiers of the watchlists this camera accepts.
    #[must_use]
    pub fn permitted_watchlist_ids(&self) -> HashSet<String> {
        self.permitted_watchlists.values().cloned().collect()
    }
}

/// A named device with a serial, used to build the subscription set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceEntry {
    pub name: String,
    pub serial: SerialNumber,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl DeviceEntry {
    #[must_use]
    pub fn new(name: impl Into<String>, serial: impl Into<SerialNumber>) -> Self {
        Self {
            name: name.into(),
            serial: serial.into(),
            enabled: true,
        }
    }
}

// =============================================================================
// ACCESS DECISION
// =============================================================================

/// What an evaluation did to the holder's current zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ZoneAction {
    Updated,
    #[default]
    NotUpdated,
    SetToPerimeter,
}

impl ZoneAction {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Updated => "updated",
            Self::NotUpdated => "not_updated",
            Self::SetToPerimeter => "set_to_perimeter",
        }
    }
}

/// Why a decision was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionReason {
    /// `access_zones` contained zone 0; it has been pruned.
    InvalidZonePresent,
    /// Current zone undefined and no usable free pass.
    ZoneUndefinedNoFreePass,
    /// Camera origin or destination is not one of the holder's zones.
    ZoneNotPermitted,
    /// Holder is not recorded in the camera's origin zone.
    AntiPassbackViolation,
    /// No identity holds the presented card.
    IdentityUnknown,
    /// The camera has no zone configuration.
    CameraUnknown,
    /// The identity store could not be read.
    EvaluationFailed,
    /// Granted through the one-shot free movement override.
    GrantedViaFreeMovement,
    Granted,
}

impl DecisionReason {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidZonePresent => "invalid zone present",
            Self::ZoneUndefinedNoFreePass => "zone undefined, no free pass",
            Self::ZoneNotPermitted => "fromZone or toZone not in accessZones",
            Self::AntiPassbackViolation => "anti-passback violation",
            Self::IdentityUnknown => "identity unknown",
            Self::CameraUnknown => "camera unknown",
            Self::EvaluationFailed => "evaluation failed",
            Self::GrantedViaFreeMovement => "access granted via free movement",
            Self::Granted => "access granted",
        }
    }
}

impl fmt::Display for DecisionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one zone policy evaluation. Produced and consumed within a
/// single request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessDecision {
    pub allowed: bool,
    pub reason: DecisionReason,
    pub zone_action: ZoneAction,
    pub used_free_pass: bool,
}

impl AccessDecision {
    #[must_use]
    pub fn deny(reason: DecisionReason) -> Self {
        Self {
            allowed: false,
            reason,
            zone_action: ZoneAction::NotUpdated,
            used_free_pass: false,
        }
    }

    #[must_use]
    pub fn grant(reason: DecisionReason) -> Self {
        Self {
            allowed: true,
            reason,
            zone_action: ZoneAction::NotUpdated,
            used_free_pass: false,
        }
    }

    #[must_use]
    pub fn with_free_pass(mut self) -> Self {
        self.used_free_pass = true;
        self
    }

    #[must_use]
    pub fn with_zone_action(mut self, action: ZoneAction) -> Self {
        self.zone_action = action;
        self
    }

    #[must_use]
    pub fn outcome_label(&self) -> &'static str {
        if self.allowed {
            "granted"
        } else {
            "denied"
        }
    }
}

// =============================================================================
// RECORDS HANDED TO SINKS
// =============================================================================

/// One line of the transaction log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    #[serde(rename = "_iD")]
    pub object_id: String,
    #[serde(rename = "dateTime")]
    pub date_time: String,
    #[serde(rename = "transactionType")]
    pub transaction_type: String,
    #[serde(rename = "idNumber")]
    pub id_number: String,
    #[serde(rename = "UniqueId")]
    pub unique_id: String,
    #[serde(rename = "fullName")]
    pub full_name: String,
    #[serde(rename = "serialSource")]
    pub serial_source: SerialNumber,
}

/// Transaction type written when a face match is admitted.
pub const FACE_IDENTIFIED: &str = "FACE_Identified";

/// A temperature reading reported by a controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    #[serde(rename = "_iD")]
    pub object_id: Option<String>,
    #[serde(rename = "dateTime")]
    pub date_time: String,
    #[serde(rename = "serialSource")]
    pub serial_source: SerialNumber,
    #[serde(rename = "hostName")]
    pub host_name: Option<String>,
    #[serde(rename = "ipAddress")]
    pub ip_address: Option<String>,
    #[serde(rename = "sensorName")]
    pub sensor_name: Option<String>,
    #[serde(rename = "tempValue")]
    pub temp_value: Option<f64>,
}
