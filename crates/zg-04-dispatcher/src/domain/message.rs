//! # Inbound Messages
//!
//! Two wire families share the device topics:
//!
//! - **General envelopes** `{ "msg_sd_...": { header..., fields... } }`, sent
//!   by controllers, readers and peer servers.
//! - **Routed messages** carrying `routed_msg_type`, forwarded from the face
//!   recognition system. Only `FaceMatch` is understood.

use super::errors::DecodeError;
use serde_json::{Map, Value};
use shared_types::{
    FaceMatchEvent, GeneralEnvelope, FACE_MATCH_REQUIRED_KEYS, ROUTED_TYPE_FACE_MATCH,
    ROUTED_TYPE_FIELD,
};

/// A decoded inbound payload.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    FaceMatch(Box<FaceMatchEvent>),
    General(GeneralEnvelope),
    /// A routed message of a type this service does not handle.
    UnknownRouted { routed_type: String },
}

/// Decode one raw payload.
pub fn decode(payload: &[u8]) -> Result<InboundMessage, DecodeError> {
    if payload.is_empty() {
        return Err(DecodeError::Empty);
    }

    let value: Value =
        serde_json::from_slice(payload).map_err(|e| DecodeError::Json(e.to_string()))?;
    let Value::Object(object) = value else {
        return Err(DecodeError::NotAnObject);
    };

    match object.get(ROUTED_TYPE_FIELD) {
        None => decode_general(object),
        Some(routed) if routed.as_str() == Some(ROUTED_TYPE_FACE_MATCH) => decode_face_match(object),
        Some(routed) => Ok(InboundMessage::UnknownRouted {
            routed_type: routed
                .as_str()
                .map_or_else(|| routed.to_string(), str::to_string),
        }),
    }
}

/// The first key on the wire is the tag; any further keys are ignored.
fn decode_general(object: Map<String, Value>) -> Result<InboundMessage, DecodeError> {
    let (tag, body) = object.into_iter().next().ok_or(DecodeError::NoTopLevelTag)?;
    match body {
        Value::Object(body) => Ok(InboundMessage::General(GeneralEnvelope::new(tag, body))),
        _ => Err(DecodeError::BodyNotAnObject(tag)),
    }
}

fn decode_face_match(object: Map<String, Value>) -> Result<InboundMessage, DecodeError> {
    let missing: Vec<String> = FACE_MATCH_REQUIRED_KEYS
        .iter()
        .filter(|key| !object.contains_key(**key))
        .map(|key| key.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(DecodeError::MissingFields(missing));
    }

    serde_json::from_value(Value::Object(object))
        .map(|event| InboundMessage::FaceMatch(Box::new(event)))
        .map_err(|e| DecodeError::FaceMatch(e.to_string()))
}

/// General envelope tags this service understands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeneralCommand {
    Status,
    SensorReading,
    GetSysinfo,
    Sysinfo,
    GetConfigFile,
    Sysconfig,
    GetInputs,
    InputsDebounce,
    InputEdge,
    GetOutputs,
    Output,
    ClearOutputs,
    HoldTimers,
    Users,
    LogTransaction,
    Pincode,
    Unknown(String),
}

impl GeneralCommand {
    #[must_use]
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "msg_sd_status" => Self::Status,
            "msg_sd_msg_sensors" | "msg_sd_msg_cpu_sensor" => Self::SensorReading,
            "msg_sd_get_sysinfo" => Self::GetSysinfo,
            "msg_sd_sysinfo" => Self::Sysinfo,
            "msg_sd_get_config_file" => Self::GetConfigFile,
            "msg_sd_sysconfig" => Self::Sysconfig,
            "msg_sd_get_inputs" => Self::GetInputs,
            "msg_sd_inputs_deb" => Self::InputsDebounce,
            "msg_sd_input_edge" | "msg_input" => Self::InputEdge,
            "msg_sd_get_outputs" => Self::GetOutputs,
            "msg_sd_output" => Self::Output,
            "msg_sd_clear_outputs" => Self::ClearOutputs,
            "msg_sd_hold_timers" => Self::HoldTimers,
            "msg_sd_users" => Self::Users,
            // Spelling as sent by the readers
            "msg_sd_log_transation" => Self::LogTransaction,
            "msg_sd_msg_pincode" => Self::Pincode,
            other => Self::Unknown(other.to_string()),
        }
    }
}
