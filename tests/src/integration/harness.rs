//! # Test Gate
//!
//! The wired core with every outer port replaced by an in-memory fake:
//!
//! | Port | Fake |
//! |------|------|
//! | Identity store | `MemoryIdentityStore` |
//! | Publisher | `InMemoryPublisher` |
//! | Transactions | `MemoryTransactionSink` |
//! | Sensors | `MemorySensorSink` |
//! | Diagnostics | `MemoryDiagnosticSink` |

use std::collections::BTreeMap;
use std::sync::Arc;

use gate_runtime::{wire_core, CoreServices, GateConfig, MemoryIdentityStore, RecordSinks};
use serde_json::{json, Value};
use shared_bus::{inbound_channel, InMemoryPublisher, InboundSender, RawMessage};
use shared_types::{
    CameraBinding, CameraZoneConfig, EnvelopeFactory, IdentityRecord, MachineIdentity,
    OutboundEnvelope, Zone,
};
use zg_03_face_match::MemoryTransactionSink;
use zg_04_dispatcher::{CycleOutcome, MemoryDiagnosticSink, MemorySensorSink};

pub const OWN_SERIAL: &str = "SN-GATE";
pub const BASE_TOPIC: &str = "access";
pub const ROC_SERIAL: &str = "ROC-1";
pub const READER_SERIAL: &str = "RDR-1";
pub const CAMERA_ID: &str = "cam-lobby";
pub const WATCHLIST_ID: &str = "wl-staff";

/// One gate instance running entirely in memory.
pub struct TestGate {
    pub config: GateConfig,
    pub envelopes: EnvelopeFactory,
    pub store: Arc<MemoryIdentityStore>,
    pub publisher: Arc<InMemoryPublisher>,
    pub transactions: Arc<MemoryTransactionSink>,
    pub sensors: Arc<MemorySensorSink>,
    pub diagnostics: Arc<MemoryDiagnosticSink>,
    pub core: CoreServices,
    inbound: InboundSender,
}

impl TestGate {
    /// Gate with the default policy: perimeter 1, both functions on.
    pub fn new() -> Self {
        Self::with_config(Self::base_config())
    }

    pub fn base_config() -> GateConfig {
        let mut config = GateConfig::default();
        config.machine.serial = OWN_SERIAL.to_string();
        config.mqtt.base_topic = BASE_TOPIC.to_string();
        config
    }

    /// Gate with its own serial, as a second server on the same broker.
    pub fn with_serial(serial: &str) -> Self {
        let mut config = Self::base_config();
        config.machine.serial = serial.to_string();
        Self::with_config(config)
    }

    pub fn with_config(config: GateConfig) -> Self {
        let envelopes = EnvelopeFactory::new(
            MachineIdentity {
                client_id: "zone-gate-test".into(),
                program_version: "0.1.0".into(),
                serial: config.machine.serial.clone(),
                host_name: "gatehost".into(),
                ip_address: "10.0.0.2".into(),
            },
            config.general.datetime_format.clone(),
        );
        let store = Arc::new(MemoryIdentityStore::default());
        let publisher = Arc::new(InMemoryPublisher::new());
        let transactions = Arc::new(MemoryTransactionSink::new());
        let sensors = Arc::new(MemorySensorSink::new());
        let diagnostics = Arc::new(MemoryDiagnosticSink::new());
        let sinks = RecordSinks {
            transactions: transactions.clone(),
            sensors: sensors.clone(),
            diagnostics: diagnostics.clone(),
        };
        let (inbound, receiver) = inbound_channel();

        let core = wire_core(&config, &envelopes, &store, publisher.clone(), receiver, &sinks);

        Self {
            config,
            envelopes,
            store,
            publisher,
            transactions,
            sensors,
            diagnostics,
            core,
            inbound,
        }
    }

    /// Bind the lobby camera to the reader with the given transition.
    pub fn install_camera(&self, from_zone: Zone, to_zone: Zone, update_zone: bool) {
        self.store.upsert_camera(CameraBinding {
            camera_id: CAMERA_ID.into(),
            name: "Lobby".into(),
            zones: CameraZoneConfig {
                from_zone,
                to_zone,
                update_zone,
            },
            reader_serial: Some(READER_SERIAL.into()),
            permitted_watchlists: BTreeMap::from([("Staff".to_string(), WATCHLIST_ID.to_string())]),
            verif_ident: false,
            enabled: true,
        });
    }

    /// Store an identity holding card `C-{face_id}` and PIN `1234`.
    pub fn install_identity(
        &self,
        face_id: &str,
        access_zones: &[Zone],
        current_zone: Zone,
        free_movement: bool,
    ) {
        let mut record = IdentityRecord::new(face_id, "Ada", "Lovelace");
        record.card_numbers = vec!["C-OLD".into(), format!("C-{face_id}")];
        record.pin_number = Some("1234".into());
        record.access_zones = access_zones.to_vec();
        record.current_zone = current_zone;
        record.free_movement = free_movement;
        self.store.upsert_identity(record);
    }

    pub fn identity(&self, face_id: &str) -> IdentityRecord {
        self.store
            .identity(face_id)
            .unwrap_or_else(|| panic!("identity {face_id} missing"))
    }

    /// Push a payload as if it arrived on `{base_topic}/{serial}`.
    pub fn push(&self, serial: &str, payload: &Value) {
        let bytes = serde_json::to_vec(payload).expect("payload serializes");
        self.push_raw(serial, bytes);
    }

    pub fn push_raw(&self, serial: &str, payload: impl Into<Vec<u8>>) {
        let topic = format!("{BASE_TOPIC}/{serial}");
        assert!(self.inbound.push(RawMessage::new(topic, payload)));
    }

    /// Run one dispatcher cycle.
    pub async fn drain(&self) -> CycleOutcome {
        self.core.dispatcher.drain_once().await
    }

    /// Push then drain one message.
    pub async fn deliver(&self, serial: &str, payload: &Value) -> CycleOutcome {
        self.push(serial, payload);
        self.drain().await
    }

    /// Deliver `envelopes` published by the gate `serial`, one cycle each.
    pub async fn receive_from(&self, serial: &str, envelopes: &[OutboundEnvelope]) {
        for envelope in envelopes {
            self.deliver(serial, &envelope.to_json_value()).await;
        }
    }

    /// The user record responses published so far.
    pub fn responses(&self) -> Vec<OutboundEnvelope> {
        self.publisher
            .published_with_tag("msg_str_user_record_response")
    }
}

impl Default for TestGate {
    fn default() -> Self {
        Self::new()
    }
}

/// A FaceMatch event as forwarded by the recognition server.
pub fn face_match(object_id: &str, watchlist_id: &str, face_id: &str) -> Value {
    json!({
        "_iD": object_id,
        "timestamp": 1_734_536_984_000_i64,
        "_watchlistId": watchlist_id,
        "probeFaceCameraName": "Lobby",
        "cameraId": CAMERA_ID,
        "personId": format!("person-{face_id}"),
        "faceId": face_id,
        "firstname": "Ada",
        "lastname": "Lovelace",
        "createdBy": "roc",
        "mqtt_target": BASE_TOPIC,
        "routed_msg_type": "FaceMatch"
    })
}

/// A general envelope `{tag: body}` with broadcast header fields.
pub fn general(tag: &str, mut body: Value) -> Value {
    if let Some(map) = body.as_object_mut() {
        map.entry("broadCast").or_insert(json!(true));
    }
    json!({ tag: body })
}
