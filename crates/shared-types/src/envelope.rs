//! # Outbound Envelope
//!
//! Every message this service publishes is a JSON object with a single
//! top-level key, the message-type tag, whose value merges the common header
//! with the command-specific payload.
//!
//! ## Header Fields
//!
//! | Field | Meaning |
//! |-------|---------|
//! | `_iD` | Correlation id, 24 lowercase hex chars when generated here |
//! | `clientId` | Broker client id of this instance |
//! | `programVersion` | Running program version |
//! | `serialSource` | Own serial number |
//! | `serialDestination` | Target device, `null` when addressed to nobody in particular |
//! | `broadCast` | Whether every listener should act on it |
//! | `ipAddress` / `hostName` | Where this instance runs |
//! | `unixTime` / `dateTime` | Creation time, numeric and formatted |

use crate::commands::{Command, Route};
use crate::entities::SerialNumber;
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Length of generated correlation ids.
pub const OBJECT_ID_LEN: usize = 24;

/// Default `dateTime` rendering.
pub const DEFAULT_DATETIME_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

/// Whether `format` parses as a chrono strftime layout. Rendering an
/// invalid layout panics.
#[must_use]
pub fn is_valid_datetime_format(format: &str) -> bool {
    !StrftimeItems::new(format).any(|item| matches!(item, Item::Error))
}

/// Generate a fresh correlation id: the first 24 hex chars of a v4 UUID.
#[must_use]
pub fn new_object_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(OBJECT_ID_LEN);
    id
}

/// Who this instance is, as stamped on every outbound header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineIdentity {
    pub client_id: String,
    pub program_version: String,
    pub serial: SerialNumber,
    pub host_name: String,
    pub ip_address: String,
}

/// Common header of every outbound envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvelopeHeader {
    #[serde(rename = "_iD")]
    pub object_id: String,
    #[serde(rename = "clientId")]
    pub client_id: String,
    #[serde(rename = "programVersion")]
    pub program_version: String,
    #[serde(rename = "serialSource")]
    pub serial_source: SerialNumber,
    #[serde(rename = "serialDestination")]
    pub serial_destination: Option<SerialNumber>,
    #[serde(rename = "broadCast")]
    pub broadcast: bool,
    #[serde(rename = "ipAddress")]
    pub ip_address: String,
    #[serde(rename = "hostName")]
    pub host_name: String,
    #[serde(rename = "unixTime")]
    pub unix_time: i64,
    #[serde(rename = "dateTime")]
    pub date_time: String,
}

/// A fully built outbound message, ready to serialize.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundEnvelope {
    tag: &'static str,
    header: EnvelopeHeader,
    payload: Map<String, Value>,
}

impl OutboundEnvelope {
    #[must_use]
    pub fn new(tag: &'static str, header: EnvelopeHeader, payload: Map<String, Value>) -> Self {
        Self { tag, header, payload }
    }

    #[must_use]
    pub fn tag(&self) -> &'static str {
        self.tag
    }

    #[must_use]
    pub fn header(&self) -> &EnvelopeHeader {
        &self.header
    }

    #[must_use]
    pub fn object_id(&self) -> &str {
        &self.header.object_id
    }

    #[must_use]
    pub fn destination(&self) -> Option<&str> {
        self.header.serial_destination.as_deref()
    }

    /// A command-specific field.
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }

    /// Render `{ tag: { header..., payload... } }`. Payload keys win over
    /// header keys of the same name.
    #[must_use]
    pub fn to_json_value(&self) -> Value {
        let mut body = match serde_json::to_value(&self.header) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        };
        for (key, value) in &self.payload {
            body.insert(key.clone(), value.clone());
        }
        let mut root = Map::with_capacity(1);
        root.insert(self.tag.to_string(), Value::Object(body));
        Value::Object(root)
    }

    /// Serialize for the wire.
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(&self.to_json_value())
    }
}

/// Builds envelopes stamped with this machine's identity and the clock.
#[derive(Debug, Clone)]
pub struct EnvelopeFactory {
    identity: MachineIdentity,
    datetime_format: String,
}

impl EnvelopeFactory {
    #[must_use]
    pub fn new(identity: MachineIdentity, datetime_format: impl Into<String>) -> Self {
        Self {
            identity,
            datetime_format: datetime_format.into(),
        }
    }

    #[must_use]
    pub fn identity(&self) -> &MachineIdentity {
        &self.identity
    }

    #[must_use]
    pub fn own_serial(&self) -> &str {
        &self.identity.serial
    }

    /// The configured `dateTime` layout (chrono strftime syntax).
    #[must_use]
    pub fn datetime_format(&self) -> &str {
        &self.datetime_format
    }

    /// Format a timestamp with the configured `dateTime` layout.
    #[must_use]
    pub fn format_datetime(&self, at: &DateTime<Local>) -> String {
        at.format(&self.datetime_format).to_string()
    }

    /// Build an envelope for `command`. A missing `object_id` is generated.
    #[must_use]
    pub fn build(&self, command: &Command, route: Route, object_id: Option<String>) -> OutboundEnvelope {
        self.build_at(command, route, object_id, Local::now())
    }

    /// Build with an explicit creation time.
    #[must_use]
    pub fn build_at(
        &self,
        command: &Command,
        route: Route,
        object_id: Option<String>,
        at: DateTime<Local>,
    ) -> OutboundEnvelope {
        let header = EnvelopeHeader {
            object_id: object_id.filter(|id| !id.is_empty()).unwrap_or_else(new_object_id),
            client_id: self.identity.client_id.clone(),
            program_version: self.identity.program_version.clone(),
            serial_source: self.identity.serial.clone(),
            serial_destination: route.destination,
            broadcast: route.broadcast,
            ip_address: self.identity.ip_address.clone(),
            host_name: self.identity.host_name.clone(),
            unix_time: at.timestamp(),
            date_time: self.format_datetime(&at),
        };
        OutboundEnvelope::new(command.tag(), header, command.payload())
    }
}
