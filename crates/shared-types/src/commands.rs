//! # Outbound Commands
//!
//! The closed set of messages this service sends to controllers, readers and
//! peer servers. Each variant knows its wire tag and payload fields; the
//! header is added by [`crate::EnvelopeFactory`].

use crate::entities::SerialNumber;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Addressing of an outbound envelope.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Route {
    pub destination: Option<SerialNumber>,
    pub broadcast: bool,
}

impl Route {
    /// No destination, not broadcast.
    #[must_use]
    pub fn own() -> Self {
        Self::default()
    }

    /// Every listener acts on it.
    #[must_use]
    pub fn broadcast() -> Self {
        Self {
            destination: None,
            broadcast: true,
        }
    }

    /// Addressed to a single device.
    #[must_use]
    pub fn to(serial: impl Into<SerialNumber>) -> Self {
        Self {
            destination: Some(serial.into()),
            broadcast: false,
        }
    }
}

/// `msg_sd_status` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    pub response: String,
    pub reason: String,
}

/// Answer to an identification request, sent to the reader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecordResponse {
    pub granted: bool,
    #[serde(rename = "faceId")]
    pub face_id: Option<String>,
    #[serde(rename = "pinCode")]
    pub pin_code: Option<String>,
    #[serde(rename = "fullName")]
    pub full_name: Option<String>,
    #[serde(rename = "pinNumber")]
    pub pin_number: Option<String>,
    #[serde(rename = "cardNumber")]
    pub card_number: Option<String>,
    #[serde(rename = "verifIdent")]
    pub verif_ident: bool,
}

/// Everything this service can publish.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Own online/offline status.
    Status(StatusReport),
    /// CPU temperature of this host.
    CpuSensor { sensor_name: String, temperature: f64 },
    /// Ask controllers to report their status.
    StatusRequest,
    /// Ask controllers for system information.
    SysinfoRequest,
    /// Ask controllers for their configuration file.
    ConfigFileRequest,
    /// Admission decision for a reader.
    UserRecordResponse(UserRecordResponse),
}

impl Command {
    /// Wire tag, the single top-level key of the envelope.
    #[must_use]
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Status(_) => "msg_sd_status",
            Self::CpuSensor { .. } => "msg_sd_msg_cpu_sensor",
            Self::StatusRequest => "msg_sd_get_status",
            Self::SysinfoRequest => "msg_str_sysinfo_request",
            Self::ConfigFileRequest => "msg_sd_get_config_file",
            Self::UserRecordResponse(_) => "msg_str_user_record_response",
        }
    }

    /// Command-specific fields merged into the envelope body.
    #[must_use]
    pub fn payload(&self) -> Map<String, Value> {
        let value = match self {
            Self::Status(report) => json!({
                "response": report.response,
                "reason": report.reason,
            }),
            Self::CpuSensor {
                sensor_name,
                temperature,
            } => json!({
                "sensorName": sensor_name,
                "Temperature": temperature,
            }),
            Self::UserRecordResponse(response) => {
                serde_json::to_value(response).unwrap_or(Value::Null)
            }
            Self::StatusRequest | Self::SysinfoRequest | Self::ConfigFileRequest => Value::Null,
        };
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }
}
