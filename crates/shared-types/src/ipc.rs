//! # Inbound Message Shapes
//!
//! Payloads arriving from the broker come in two families:
//!
//! - **Routed events** carry a `routed_msg_type` field. The only accepted
//!   type is `FaceMatch`, a watchlist match forwarded by the recognition
//!   system.
//! - **General envelopes** mirror the outbound layout: one top-level tag whose
//!   value holds the sender's header and type-specific fields.

use chrono::{Local, TimeZone};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Routed type of a watchlist face match.
pub const ROUTED_TYPE_FACE_MATCH: &str = "FaceMatch";

/// Field that marks a routed event.
pub const ROUTED_TYPE_FIELD: &str = "routed_msg_type";

/// Fields every FaceMatch event must carry.
pub const FACE_MATCH_REQUIRED_KEYS: [&str; 12] = [
    "_iD",
    "timestamp",
    "_watchlistId",
    "probeFaceCameraName",
    "cameraId",
    "personId",
    "faceId",
    "firstname",
    "lastname",
    "createdBy",
    "mqtt_target",
    ROUTED_TYPE_FIELD,
];

/// A watchlist face match reported by a recognition camera.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceMatchEvent {
    /// Event id, reused as the correlation id of the decision.
    #[serde(rename = "_iD")]
    pub object_id: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    #[serde(rename = "_watchlistId")]
    pub watchlist_id: String,
    #[serde(rename = "probeFaceCameraName")]
    pub probe_face_camera_name: String,
    #[serde(rename = "cameraId")]
    pub camera_id: String,
    #[serde(rename = "personId")]
    pub person_id: String,
    #[serde(rename = "faceId")]
    pub face_id: String,
    #[serde(rename = "firstname")]
    pub first_name: String,
    #[serde(rename = "lastname")]
    pub last_name: String,
    #[serde(rename = "createdBy")]
    pub created_by: String,
    pub mqtt_target: Value,
    pub routed_msg_type: String,
}

impl FaceMatchEvent {
    /// Name as reported by the recognition system.
    #[must_use]
    pub fn reported_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// `faceId` without surrounding whitespace.
    #[must_use]
    pub fn face_id(&self) -> &str {
        self.face_id.trim()
    }

    /// Event time rendered with `format`, empty when out of range.
    #[must_use]
    pub fn event_time(&self, format: &str) -> String {
        Local
            .timestamp_millis_opt(self.timestamp)
            .single()
            .map(|at| at.format(format).to_string())
            .unwrap_or_default()
    }
}

/// A general envelope: `{ tag: { header..., fields... } }`.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneralEnvelope {
    pub tag: String,
    pub body: Map<String, Value>,
}

impl GeneralEnvelope {
    #[must_use]
    pub fn new(tag: impl Into<String>, body: Map<String, Value>) -> Self {
        Self {
            tag: tag.into(),
            body,
        }
    }

    /// A string field, `None` when missing, null or not a string.
    #[must_use]
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.body.get(key).and_then(Value::as_str)
    }

    /// A scalar field rendered as text. Numbers are accepted so card and PIN
    /// numbers sent unquoted still resolve.
    #[must_use]
    pub fn text_field(&self, key: &str) -> Option<String> {
        match self.body.get(key)? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    #[must_use]
    pub fn object_id(&self) -> Option<&str> {
        self.str_field("_iD")
    }

    #[must_use]
    pub fn serial_source(&self) -> Option<&str> {
        self.str_field("serialSource")
    }

    #[must_use]
    pub fn serial_destination(&self) -> Option<&str> {
        self.str_field("serialDestination")
    }

    /// `broadCast`, defaulting to `true` when absent.
    #[must_use]
    pub fn broadcast(&self) -> bool {
        self.body
            .get("broadCast")
            .and_then(Value::as_bool)
            .unwrap_or(true)
    }

    #[must_use]
    pub fn date_time(&self) -> Option<&str> {
        self.str_field("dateTime")
    }

    #[must_use]
    pub fn host_name(&self) -> Option<&str> {
        self.str_field("hostName")
    }

    #[must_use]
    pub fn ip_address(&self) -> Option<&str> {
        self.str_field("ipAddress")
    }

    /// Whether this instance should act on the envelope: broadcast, or
    /// addressed to `own_serial`.
    #[must_use]
    pub fn is_addressed_to(&self, own_serial: &str) -> bool {
        self.broadcast() || self.serial_destination() == Some(own_serial)
    }
}

/// Identifies the sender of a message by its topic.
#[must_use]
pub fn serial_from_topic(topic: &str) -> &str {
    topic.rsplit('/').next().unwrap_or(topic)
}

/// Topic owned by `serial` under `base_topic`.
#[must_use]
pub fn device_topic(base_topic: &str, serial: &str) -> String {
    format!("{}/{}", base_topic.trim_end_matches('/'), serial)
}
