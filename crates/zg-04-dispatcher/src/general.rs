//! General Envelope Handler - device status, sensors, configuration dumps,
//! transaction acknowledgements and card/PIN lookups.

use crate::domain::{DispatchError, GeneralCommand};
use crate::ports::{DiagnosticSink, SensorSink};
use chrono::{DateTime, Local};
use serde_json::{Map, Value};
use shared_bus::{AckOutcome, CorrelationTable, EnvelopePublisher, PublishOutcome};
use shared_types::{
    Command, EnvelopeFactory, GeneralEnvelope, Route, SensorReading, TransactionRecord,
    UserRecordResponse,
};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;
use zg_03_face_match::{IdentityDirectory, TransactionSink};
use zone_telemetry::CORRELATIONS_PENDING;

/// Collaborators of the general envelope handler.
pub struct GeneralDeps {
    pub identities: Arc<dyn IdentityDirectory>,
    pub publisher: Arc<dyn EnvelopePublisher>,
    pub transactions: Arc<dyn TransactionSink>,
    pub sensors: Arc<dyn SensorSink>,
    pub diagnostics: Arc<dyn DiagnosticSink>,
    pub correlations: Arc<CorrelationTable>,
    pub envelopes: EnvelopeFactory,
}

/// What the handler did with one envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum GeneralOutcome {
    /// Addressed to another instance.
    NotAddressed,
    /// Logged only.
    Logged,
    /// Acknowledged, nothing to do.
    NoAction,
    /// A sensor reading was recorded.
    SensorRecorded,
    /// A document was written to the diagnostics directory.
    Saved(PathBuf),
    /// A reply was published.
    Replied { tag: &'static str },
    /// A transaction acknowledgement was matched against the correlation table.
    Acknowledged(AckOutcome),
    /// Tag not understood.
    UnknownTag(String),
}

/// Handles every envelope without `routed_msg_type`.
pub struct GeneralEnvelopeHandler {
    deps: GeneralDeps,
    diagnostics_dir: PathBuf,
}

impl GeneralEnvelopeHandler {
    #[must_use]
    pub fn new(deps: GeneralDeps, diagnostics_dir: impl Into<PathBuf>) -> Self {
        Self {
            deps,
            diagnostics_dir: diagnostics_dir.into(),
        }
    }

    /// Handle one envelope received on the topic of `topic_serial`.
    pub async fn handle(
        &self,
        envelope: &GeneralEnvelope,
        topic_serial: &str,
        received_at: DateTime<Local>,
    ) -> Result<GeneralOutcome, DispatchError> {
        let own_serial = self.deps.envelopes.own_serial();
        if !envelope.is_addressed_to(own_serial) {
            info!(
                tag = %envelope.tag,
                destination = ?envelope.serial_destination(),
                "[zg-04] Envelope skipped, not for this client"
            );
            return Ok(GeneralOutcome::NotAddressed);
        }
        debug!(
            tag = %envelope.tag,
            topic_serial,
            broadcast = envelope.broadcast(),
            "[zg-04] Envelope accepted"
        );

        match GeneralCommand::from_tag(&envelope.tag) {
            GeneralCommand::Status => {
                info!(
                    serial_source = ?envelope.serial_source(),
                    response = ?envelope.str_field("response"),
                    reason = ?envelope.str_field("reason"),
                    "[zg-04] Device status"
                );
                Ok(GeneralOutcome::Logged)
            }
            GeneralCommand::SensorReading => {
                self.record_sensor(envelope, topic_serial, received_at)
            }
            GeneralCommand::GetSysinfo => self.reply(Command::SysinfoRequest, Route::broadcast(), None).await,
            GeneralCommand::Sysinfo => {
                let path = self.diagnostics_dir.join(format!("sysinfo_{topic_serial}.json"));
                self.save(path, &Value::Object(envelope.body.clone())).await
            }
            GeneralCommand::GetConfigFile => {
                // Answering with the request tag would echo between peer servers.
                info!(
                    serial_source = ?envelope.serial_source(),
                    "[zg-04] Config file request received, no config to share"
                );
                Ok(GeneralOutcome::Logged)
            }
            GeneralCommand::Sysconfig => {
                let path = self.diagnostics_dir.join(format!("config_{topic_serial}.json"));
                self.save(path, &sort_sysconfig(envelope.body.clone())).await
            }
            GeneralCommand::Users => {
                let path = self.diagnostics_dir.join("users_schema.json");
                self.save(path, &Value::Object(envelope.body.clone())).await
            }
            GeneralCommand::Output => {
                info!(
                    output_port = ?envelope.body.get("outputPort"),
                    on_off = ?envelope.body.get("onOff"),
                    timer_value = ?envelope.body.get("timerValue"),
                    "[zg-04] Output received"
                );
                Ok(GeneralOutcome::Logged)
            }
            GeneralCommand::HoldTimers => {
                let timers: Vec<_> = ["Input1", "Input2", "Input3", "Input4"]
                    .iter()
                    .map(|key| envelope.body.get(*key).cloned().unwrap_or(Value::Null))
                    .collect();
                info!(hold_timers = ?timers, "[zg-04] Hold timers received");
                Ok(GeneralOutcome::Logged)
            }
            GeneralCommand::InputEdge => {
                info!(
                    serial_source = ?envelope.serial_source(),
                    date_time = ?envelope.date_time(),
                    input_port = ?envelope.body.get("inputPort"),
                    alert_type = ?envelope.body.get("AlertType"),
                    "[zg-04] Input event received"
                );
                Ok(GeneralOutcome::Logged)
            }
            GeneralCommand::InputsDebounce => {
                debug!(input_ports = ?envelope.body.get("inputPorts"), "[zg-04] Debounced inputs");
                Ok(GeneralOutcome::NoAction)
            }
            GeneralCommand::GetInputs | GeneralCommand::GetOutputs | GeneralCommand::ClearOutputs => {
                Ok(GeneralOutcome::NoAction)
            }
            GeneralCommand::LogTransaction => self.acknowledge_transaction(envelope),
            GeneralCommand::Pincode => self.answer_pincode(envelope, topic_serial).await,
            GeneralCommand::Unknown(tag) => {
                error!(tag = %tag, "[zg-04] Invalid message received, unknown top-level key");
                Ok(GeneralOutcome::UnknownTag(tag))
            }
        }
    }

    fn record_sensor(
        &self,
        envelope: &GeneralEnvelope,
        topic_serial: &str,
        received_at: DateTime<Local>,
    ) -> Result<GeneralOutcome, DispatchError> {
        let temp_value = match envelope.body.get("Temperature") {
            Some(Value::Number(n)) => n.as_f64(),
            Some(Value::String(s)) => s.trim().parse().ok(),
            _ => None,
        };
        let reading = SensorReading {
            object_id: envelope.object_id().map(str::to_string),
            date_time: self.deps.envelopes.format_datetime(&received_at),
            serial_source: topic_serial.to_string(),
            host_name: envelope.host_name().map(str::to_string),
            ip_address: envelope.ip_address().map(str::to_string),
            sensor_name: envelope.str_field("sensorName").map(str::to_string),
            temp_value,
        };
        info!(
            serial_source = %topic_serial,
            sensor = ?reading.sensor_name,
            temperature = ?reading.temp_value,
            "[zg-04] Sensor reading"
        );
        self.deps.sensors.append_reading(reading)?;
        Ok(GeneralOutcome::SensorRecorded)
    }

    async fn save(&self, path: PathBuf, value: &Value) -> Result<GeneralOutcome, DispatchError> {
        self.deps.diagnostics.save_json(&path, value).await?;
        info!(path = %path.display(), "[zg-04] JSON data saved");
        Ok(GeneralOutcome::Saved(path))
    }

    fn acknowledge_transaction(
        &self,
        envelope: &GeneralEnvelope,
    ) -> Result<GeneralOutcome, DispatchError> {
        let Some(object_id) = envelope.object_id() else {
            warn!("[zg-04] Transaction acknowledgement without _iD");
            return Ok(GeneralOutcome::Acknowledged(AckOutcome::Unknown));
        };

        let outcome = self
            .deps
            .correlations
            .acknowledge(object_id, envelope.serial_source());
        CORRELATIONS_PENDING.set(self.deps.correlations.len() as f64);

        if let AckOutcome::Matched { serial } = &outcome {
            let record = TransactionRecord {
                object_id: object_id.to_string(),
                date_time: envelope.date_time().unwrap_or_default().to_string(),
                transaction_type: envelope.text_field("transactionType").unwrap_or_default(),
                id_number: envelope.text_field("idNumber").unwrap_or_default(),
                unique_id: format!("{{{}}}", Uuid::new_v4()),
                full_name: envelope.text_field("fullName").unwrap_or_default(),
                serial_source: serial.clone(),
            };
            self.deps.transactions.append_transaction(record)?;
            info!(object_id, serial = %serial, "[zg-04] Transaction logged");
        }
        Ok(GeneralOutcome::Acknowledged(outcome))
    }

    async fn answer_pincode(
        &self,
        envelope: &GeneralEnvelope,
        topic_serial: &str,
    ) -> Result<GeneralOutcome, DispatchError> {
        let face_id = envelope.text_field("faceId");
        let pin_code = envelope.text_field("pinCode");
        let pin_number = envelope.text_field("pinNumber");
        let card_number = envelope.text_field("cardNumber");
        debug!(
            inside = ?envelope.body.get("accessZoneInside"),
            outside = ?envelope.body.get("accessZoneOutside"),
            "[zg-04] Pincode request zones"
        );

        let identities = &self.deps.identities;
        let (identity, verif_ident) = if let Some(card) = &card_number {
            let identity = identities.find_by_card_number(card)?;
            let verif = identity.as_ref().map(|r| r.verif_ident).unwrap_or(false);
            (identity, verif)
        } else if let Some(face_id) = &face_id {
            info!(face_id = %face_id, "[zg-04] Received faceId, no card or PIN lookup executed");
            (None, false)
        } else if let Some(pin_code) = &pin_code {
            info!(pin_code = %pin_code, "[zg-04] Received pincode, no card or PIN lookup executed");
            (None, false)
        } else if let Some(pin) = &pin_number {
            (identities.find_by_pin(pin)?, false)
        } else {
            error!("[zg-04] No identifying information provided");
            (None, false)
        };

        let found = identity.is_some();
        let full_name = identity.as_ref().map(|r| r.full_name());
        info!(
            card_number = ?card_number,
            pin_number = ?pin_number,
            full_name = ?full_name,
            found,
            "[zg-04] Pincode lookup"
        );

        let response = UserRecordResponse {
            granted: found,
            face_id,
            pin_code,
            full_name,
            pin_number,
            card_number,
            verif_ident,
        };
        self.reply(
            Command::UserRecordResponse(response),
            Route::to(topic_serial),
            envelope.object_id().map(str::to_string),
        )
        .await
    }

    async fn reply(
        &self,
        command: Command,
        route: Route,
        object_id: Option<String>,
    ) -> Result<GeneralOutcome, DispatchError> {
        let tag = command.tag();
        let envelope = self.deps.envelopes.build(&command, route, object_id);
        match self.deps.publisher.publish(envelope).await {
            PublishOutcome::Failed(reason) => Err(DispatchError::Publish { tag, reason }),
            PublishOutcome::Sent | PublishOutcome::SkippedDisconnected => {
                Ok(GeneralOutcome::Replied { tag })
            }
        }
    }
}

/// Key-sort `sysConfig.DEBOUNCE.HOLD_TIMER_VALUES` and
/// `sysConfig.SERIAL_LOCATION`.
fn sort_sysconfig(mut body: Map<String, Value>) -> Value {
    if let Some(Value::Object(sys_config)) = body.get_mut("sysConfig") {
        if let Some(Value::Object(debounce)) = sys_config.get_mut("DEBOUNCE") {
            if let Some(hold) = debounce.get_mut("HOLD_TIMER_VALUES") {
                sort_object(hold);
            }
        }
        if let Some(location) = sys_config.get_mut("SERIAL_LOCATION") {
            sort_object(location);
        }
    }
    Value::Object(body)
}

fn sort_object(value: &mut Value) {
    if let Value::Object(map) = value {
        let sorted: BTreeMap<String, Value> = std::mem::take(map).into_iter().collect();
        map.extend(sorted);
    }
}
