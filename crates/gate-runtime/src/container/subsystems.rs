//! # Subsystem Container
//!
//! Builds every subsystem and injects its ports.
//!
//! ## Wiring
//!
//! ```text
//! MemoryIdentityStore ──┬─→ ZoneAccessService (zg-02)  [ZoneStore, CameraDirectory]
//!                       ├─→ FaceMatchHandler  (zg-03)  [IdentityDirectory, CameraDirectory]
//!                       ├─→ GeneralEnvelopeHandler     [IdentityDirectory]
//!                       └─→ MqttTransport     (zg-01)  [SubscriptionTargets]
//!
//! MqttTransport ──InboundSender──→ Dispatcher (zg-04) ──→ handlers
//!        ↑                                                   │
//!        └──────────── EnvelopePublisher ←───────────────────┘
//! ```

use std::sync::Arc;

use shared_bus::{inbound_channel, CorrelationTable, EnvelopePublisher, InboundReceiver};
use shared_types::{EnvelopeFactory, MachineIdentity, StoreError};
use tracing::{info, instrument, warn};
use zg_01_transport::MqttTransport;
use zg_02_zone_policy::ZoneAccessService;
use zg_03_face_match::{FaceMatchDeps, FaceMatchHandler, TransactionSink};
use zg_04_dispatcher::{
    DiagnosticSink, Dispatcher, DispatcherConfig, GeneralDeps, GeneralEnvelopeHandler, SensorSink,
};

use crate::adapters::machine::machine_identity;
use crate::adapters::{
    FileDiagnosticSink, MemoryIdentityStore, TracingSensorSink, TracingTransactionSink,
};
use crate::container::config::GateConfig;

/// Where records and diagnostics go.
#[derive(Clone)]
pub struct RecordSinks {
    pub transactions: Arc<dyn TransactionSink>,
    pub sensors: Arc<dyn SensorSink>,
    pub diagnostics: Arc<dyn DiagnosticSink>,
}

impl RecordSinks {
    /// Log lines for records, local files for diagnostics.
    #[must_use]
    pub fn production() -> Self {
        Self {
            transactions: Arc::new(TracingTransactionSink::new()),
            sensors: Arc::new(TracingSensorSink::new()),
            diagnostics: Arc::new(FileDiagnosticSink::new()),
        }
    }
}

/// Policy engine, handlers and dispatcher, independent of the transport.
pub struct CoreServices {
    pub access: Arc<ZoneAccessService>,
    pub face_match: Arc<FaceMatchHandler>,
    pub general: Arc<GeneralEnvelopeHandler>,
    pub dispatcher: Arc<Dispatcher>,
    pub correlations: Arc<CorrelationTable>,
}

/// Wire the core around a publisher and an inbound queue.
#[must_use]
pub fn wire_core(
    config: &GateConfig,
    envelopes: &EnvelopeFactory,
    store: &Arc<MemoryIdentityStore>,
    publisher: Arc<dyn EnvelopePublisher>,
    inbound: InboundReceiver,
    sinks: &RecordSinks,
) -> CoreServices {
    let correlations = Arc::new(CorrelationTable::with_config(
        config.correlation.ttl(),
        config.correlation.gc_interval(),
    ));

    let access = Arc::new(ZoneAccessService::new(
        config.access.policy(),
        store.clone(),
        store.clone(),
    ));

    let face_match = Arc::new(FaceMatchHandler::new(
        FaceMatchDeps {
            identities: store.clone(),
            cameras: store.clone(),
            access: access.clone(),
            publisher: publisher.clone(),
            transactions: sinks.transactions.clone(),
            correlations: correlations.clone(),
            envelopes: envelopes.clone(),
        },
        config.access.verify_watchlist_ids(),
    ));

    let general = Arc::new(GeneralEnvelopeHandler::new(
        GeneralDeps {
            identities: store.clone(),
            publisher,
            transactions: sinks.transactions.clone(),
            sensors: sinks.sensors.clone(),
            diagnostics: sinks.diagnostics.clone(),
            correlations: correlations.clone(),
            envelopes: envelopes.clone(),
        },
        config.general.diagnostics_dir.clone(),
    ));

    let dispatcher = Arc::new(Dispatcher::new(
        DispatcherConfig {
            own_serial: envelopes.own_serial().to_string(),
            capture_raw_payloads: config.general.capture_raw_payloads,
            capture_path: config.general.capture_path.clone(),
        },
        inbound,
        face_match.clone(),
        general.clone(),
        sinks.diagnostics.clone(),
    ));

    CoreServices {
        access,
        face_match,
        general,
        dispatcher,
        correlations,
    }
}

/// Central container holding all subsystem instances.
pub struct GateContainer {
    pub config: GateConfig,
    pub identity: MachineIdentity,
    pub envelopes: EnvelopeFactory,
    pub store: Arc<MemoryIdentityStore>,
    pub sinks: RecordSinks,
    pub transport: Arc<MqttTransport>,
    pub core: CoreServices,
}

impl GateContainer {
    /// Load the identity store and build every subsystem.
    #[instrument(name = "gate_init", skip(config))]
    pub fn new(config: GateConfig) -> Result<Self, StoreError> {
        info!("Initializing zone-gate container");

        let store = Arc::new(match &config.store.path {
            Some(path) => MemoryIdentityStore::load(path)?,
            None => {
                warn!("No identity store configured, starting empty");
                MemoryIdentityStore::default()
            }
        });

        let identity = machine_identity(&config.machine, env!("CARGO_PKG_VERSION"));
        let envelopes = EnvelopeFactory::new(identity.clone(), config.general.datetime_format.clone());
        info!(
            serial = %identity.serial,
            client_id = %identity.client_id,
            host = %identity.host_name,
            ip = %identity.ip_address,
            "Machine identity resolved"
        );

        let (inbound_tx, inbound_rx) = inbound_channel();
        let transport = Arc::new(MqttTransport::new(
            config.mqtt.clone(),
            identity.client_id.clone(),
            identity.serial.clone(),
            inbound_tx,
            store.clone(),
        ));
        info!("  [zg-01] MQTT transport created");

        let sinks = RecordSinks::production();
        let core = wire_core(&config, &envelopes, &store, transport.clone(), inbound_rx, &sinks);
        info!("  [zg-02] Zone policy engine initialized");
        info!("  [zg-03] FaceMatch handler initialized");
        info!("  [zg-04] Dispatcher initialized");

        Ok(Self {
            config,
            identity,
            envelopes,
            store,
            sinks,
            transport,
            core,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_bus::InMemoryPublisher;
    use zg_04_dispatcher::CycleOutcome;

    fn config() -> GateConfig {
        let mut config = GateConfig::default();
        config.machine.serial = "SN-OWN".into();
        config.machine.client_id = Some("gate-01".into());
        config.machine.host_name = Some("gatehost".into());
        config.machine.ip_address = Some("127.0.0.1".into());
        config
    }

    #[test]
    fn test_container_without_store_path() {
        let container = GateContainer::new(config()).unwrap();
        assert_eq!(container.identity.serial, "SN-OWN");
        assert_eq!(container.transport.publish_topic(), "access/SN-OWN");
        assert!(container.core.correlations.is_empty());
    }

    #[test]
    fn test_container_with_missing_store_fails() {
        let mut config = config();
        config.store.path = Some("/nonexistent/store.json".into());
        assert!(GateContainer::new(config).is_err());
    }

    #[tokio::test]
    async fn test_wire_core_dispatches() {
        let config = config();
        let identity = machine_identity(&config.machine, "0.1.0");
        let envelopes = EnvelopeFactory::new(identity, config.general.datetime_format.clone());
        let store = Arc::new(MemoryIdentityStore::default());
        let publisher = Arc::new(InMemoryPublisher::new());
        let (tx, rx) = inbound_channel();

        let core = wire_core(&config, &envelopes, &store, publisher.clone(), rx, &RecordSinks::production());
        tx.push(shared_bus::RawMessage::new(
            "access/RDR-1",
            br#"{"msg_sd_get_sysinfo": {"broadCast": true}}"#.to_vec(),
        ));

        assert!(matches!(core.dispatcher.drain_once().await, CycleOutcome::General(_)));
        assert_eq!(publisher.published_with_tag("msg_str_sysinfo_request").len(), 1);
    }
}
