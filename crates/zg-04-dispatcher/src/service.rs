//! Dispatcher - drains the inbound queue one message at a time.

use crate::domain::{decode, DecodeError, InboundMessage};
use crate::general::{GeneralEnvelopeHandler, GeneralOutcome};
use crate::ports::DiagnosticSink;
use chrono::{DateTime, Local};
use shared_bus::{InboundReceiver, RawMessage};
use shared_types::serial_from_topic;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tracing::{debug, error, info};
use zg_03_face_match::{FaceMatchHandler, FaceMatchOutcome};
use zone_telemetry::{
    metric_inc, time_histogram, DISPATCH_DURATION, DISPATCH_ERRORS, INBOUND_MESSAGES,
};

/// Dispatcher configuration
#[derive(Clone, Debug)]
pub struct DispatcherConfig {
    /// Messages on this serial's topic are our own publishes echoed back.
    pub own_serial: String,
    /// Save every raw payload before decoding.
    pub capture_raw_payloads: bool,
    /// Prefix of captured payload files.
    pub capture_path: PathBuf,
}

/// Result of one drain cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// Queue was empty.
    Idle,
    /// Own publish echoed back by the broker.
    Loopback,
    /// Payload could not be decoded; the message was dropped.
    Dropped(DecodeError),
    FaceMatch(FaceMatchOutcome),
    General(GeneralOutcome),
    /// A general handler failed; logged and counted.
    HandlerFailed(String),
    /// Routed message of another type, ignored.
    UnknownRouted(String),
}

/// Inbound dispatcher.
///
/// The receiver sits behind an async mutex so at most one cycle runs at a
/// time, whichever task drives it.
pub struct Dispatcher {
    config: DispatcherConfig,
    inbound: Mutex<InboundReceiver>,
    face_match: Arc<FaceMatchHandler>,
    general: Arc<GeneralEnvelopeHandler>,
    diagnostics: Arc<dyn DiagnosticSink>,
}

impl Dispatcher {
    #[must_use]
    pub fn new(
        config: DispatcherConfig,
        inbound: InboundReceiver,
        face_match: Arc<FaceMatchHandler>,
        general: Arc<GeneralEnvelopeHandler>,
        diagnostics: Arc<dyn DiagnosticSink>,
    ) -> Self {
        Self {
            config,
            inbound: Mutex::new(inbound),
            face_match,
            general,
            diagnostics,
        }
    }

    /// Process at most one queued message. Returns immediately when the
    /// queue is empty.
    pub async fn drain_once(&self) -> CycleOutcome {
        let mut inbound = self.inbound.lock().await;
        match inbound.try_next() {
            Some(message) => self.process(message).await,
            None => CycleOutcome::Idle,
        }
    }

    /// Process messages until the queue closes or `shutdown` flips to true.
    ///
    /// A message already being processed is finished before returning.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(own_serial = %self.config.own_serial, "[zg-04] Dispatcher started");
        loop {
            if *shutdown.borrow() {
                break;
            }
            let mut inbound = self.inbound.lock().await;
            tokio::select! {
                message = inbound.recv() => match message {
                    Some(message) => {
                        self.process(message).await;
                    }
                    None => {
                        info!("[zg-04] Inbound queue closed");
                        break;
                    }
                },
                _ = shutdown.changed() => {
                    info!("[zg-04] Shutdown signal received");
                    break;
                }
            }
        }
    }

    async fn process(&self, message: RawMessage) -> CycleOutcome {
        let _timer = time_histogram!(DISPATCH_DURATION);
        let topic_serial = serial_from_topic(&message.topic);
        debug!(topic = %message.topic, bytes = message.payload.len(), "[zg-04] Message dequeued");

        if topic_serial == self.config.own_serial {
            debug!(serial = %topic_serial, "[zg-04] Ignored loopback message from self");
            metric_inc!(INBOUND_MESSAGES, &["loopback"]);
            return CycleOutcome::Loopback;
        }

        if self.config.capture_raw_payloads {
            self.capture(&message).await;
        }

        let decoded = match decode(&message.payload) {
            Ok(decoded) => decoded,
            Err(e) => {
                error!(topic = %message.topic, error = %e, "[zg-04] Message dropped");
                metric_inc!(DISPATCH_ERRORS, &[e.stage()]);
                metric_inc!(INBOUND_MESSAGES, &["dropped"]);
                return CycleOutcome::Dropped(e);
            }
        };

        match decoded {
            InboundMessage::FaceMatch(event) => {
                metric_inc!(INBOUND_MESSAGES, &["face_match"]);
                let outcome = self.face_match.handle(&event, message.received_at).await;
                CycleOutcome::FaceMatch(outcome)
            }
            InboundMessage::General(envelope) => {
                metric_inc!(INBOUND_MESSAGES, &["general"]);
                match self
                    .general
                    .handle(&envelope, topic_serial, message.received_at)
                    .await
                {
                    Ok(outcome) => CycleOutcome::General(outcome),
                    Err(e) => {
                        error!(tag = %envelope.tag, error = %e, "[zg-04] Exception while processing payload");
                        metric_inc!(DISPATCH_ERRORS, &["handler"]);
                        CycleOutcome::HandlerFailed(e.to_string())
                    }
                }
            }
            InboundMessage::UnknownRouted { routed_type } => {
                info!(routed_type = %routed_type, "[zg-04] Skipping non-FaceMatch routed message");
                metric_inc!(INBOUND_MESSAGES, &["unknown_routed"]);
                CycleOutcome::UnknownRouted(routed_type)
            }
        }
    }

    async fn capture(&self, message: &RawMessage) {
        let path = capture_file_name(&self.config.capture_path, message.received_at);
        match self.diagnostics.save_raw_payload(&path, &message.payload).await {
            Ok(()) => debug!(path = %path.display(), "[zg-04] Message payload saved"),
            Err(e) => error!(error = %e, "[zg-04] Failed to save message payload"),
        }
    }
}

/// `{prefix}_alert_{YYYY-MM-DD_HH-MM-SS-mmm}`
fn capture_file_name(prefix: &std::path::Path, at: DateTime<Local>) -> PathBuf {
    let stamp = at.format("%Y-%m-%d_%H-%M-%S-%3f");
    PathBuf::from(format!("{}_alert_{}", prefix.display(), stamp))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{MemoryDiagnosticSink, MemorySensorSink};
    use crate::general::GeneralDeps;
    use chrono::TimeZone;
    use serde_json::json;
    use shared_bus::{inbound_channel, CorrelationTable, InMemoryPublisher, InboundSender};
    use shared_types::{
        AccessDecision, CameraBinding, DecisionReason, EnvelopeFactory, IdentityRecord,
        MachineIdentity, StoreError,
    };
    use zg_02_zone_policy::{CameraDirectory, ZoneAccessApi};
    use zg_03_face_match::{FaceMatchDeps, IdentityDirectory, MemoryTransactionSink};

    struct NoIdentities;

    impl IdentityDirectory for NoIdentities {
        fn find_by_face_id(&self, _: &str) -> Result<Option<IdentityRecord>, StoreError> {
            Ok(None)
        }
        fn find_by_card_number(&self, _: &str) -> Result<Option<IdentityRecord>, StoreError> {
            Ok(None)
        }
        fn find_by_pin(&self, _: &str) -> Result<Option<IdentityRecord>, StoreError> {
            Ok(None)
        }
    }

    struct NoCameras;

    impl CameraDirectory for NoCameras {
        fn camera_binding(&self, _: &str) -> Option<CameraBinding> {
            None
        }
    }

    struct DenyAll;

    impl ZoneAccessApi for DenyAll {
        fn evaluate_access(&self, _: Option<&str>, _: &str) -> AccessDecision {
            AccessDecision::deny(DecisionReason::IdentityUnknown)
        }
    }

    fn factory() -> EnvelopeFactory {
        EnvelopeFactory::new(
            MachineIdentity {
                client_id: "gate".into(),
                program_version: "0.1.0".into(),
                serial: "SN-OWN".into(),
                host_name: "gatehost".into(),
                ip_address: "10.0.0.5".into(),
            },
            shared_types::envelope::DEFAULT_DATETIME_FORMAT,
        )
    }

    fn dispatcher(capture: bool) -> (Dispatcher, InboundSender, Arc<MemoryDiagnosticSink>, Arc<InMemoryPublisher>) {
        let (tx, rx) = inbound_channel();
        let publisher = Arc::new(InMemoryPublisher::new());
        let diagnostics = Arc::new(MemoryDiagnosticSink::new());
        let correlations = Arc::new(CorrelationTable::new());
        let transactions = Arc::new(MemoryTransactionSink::new());

        let face_match = FaceMatchHandler::new(
            FaceMatchDeps {
                identities: Arc::new(NoIdentities),
                cameras: Arc::new(NoCameras),
                access: Arc::new(DenyAll),
                publisher: publisher.clone(),
                transactions: transactions.clone(),
                correlations: correlations.clone(),
                envelopes: factory(),
            },
            Vec::new(),
        );
        let general = GeneralEnvelopeHandler::new(
            GeneralDeps {
                identities: Arc::new(NoIdentities),
                publisher: publisher.clone(),
                transactions,
                sensors: Arc::new(MemorySensorSink::new()),
                diagnostics: diagnostics.clone(),
                correlations,
                envelopes: factory(),
            },
            "diag",
        );

        let dispatcher = Dispatcher::new(
            DispatcherConfig {
                own_serial: "SN-OWN".into(),
                capture_raw_payloads: capture,
                capture_path: PathBuf::from("diag/paho"),
            },
            rx,
            Arc::new(face_match),
            Arc::new(general),
            diagnostics.clone(),
        );
        (dispatcher, tx, diagnostics, publisher)
    }

    fn push(tx: &InboundSender, topic: &str, payload: serde_json::Value) {
        assert!(tx.push(RawMessage::new(topic, serde_json::to_vec(&payload).unwrap())));
    }

    #[tokio::test]
    async fn test_empty_queue_is_idle() {
        let (dispatcher, _tx, _, _) = dispatcher(false);
        assert_eq!(dispatcher.drain_once().await, CycleOutcome::Idle);
    }

    #[tokio::test]
    async fn test_loopback_suppressed() {
        let (dispatcher, tx, _, publisher) = dispatcher(false);
        push(&tx, "access/SN-OWN", json!({"msg_sd_get_sysinfo": {}}));
        assert_eq!(dispatcher.drain_once().await, CycleOutcome::Loopback);
        assert!(publisher.published().is_empty());
    }

    #[tokio::test]
    async fn test_bad_payload_dropped_and_next_processed() {
        let (dispatcher, tx, _, _) = dispatcher(false);
        assert!(tx.push(RawMessage::new("access/RDR-1", b"{oops".to_vec())));
        assert!(tx.push(RawMessage::new("access/RDR-1", Vec::new())));
        push(&tx, "access/RDR-1", json!({"msg_sd_status": {"response": "online"}}));

        assert!(matches!(
            dispatcher.drain_once().await,
            CycleOutcome::Dropped(DecodeError::Json(_))
        ));
        assert_eq!(
            dispatcher.drain_once().await,
            CycleOutcome::Dropped(DecodeError::Empty)
        );
        assert_eq!(
            dispatcher.drain_once().await,
            CycleOutcome::General(GeneralOutcome::Logged)
        );
    }

    #[tokio::test]
    async fn test_routed_messages() {
        let (dispatcher, tx, _, _) = dispatcher(false);
        push(&tx, "access/ROC", json!({"routed_msg_type": "Other"}));
        push(&tx, "access/ROC", json!({"routed_msg_type": "FaceMatch", "_iD": "x"}));

        assert_eq!(
            dispatcher.drain_once().await,
            CycleOutcome::UnknownRouted("Other".into())
        );
        assert!(matches!(
            dispatcher.drain_once().await,
            CycleOutcome::Dropped(DecodeError::MissingFields(_))
        ));
    }

    #[tokio::test]
    async fn test_raw_payload_captured() {
        let (dispatcher, tx, diagnostics, _) = dispatcher(true);
        push(&tx, "access/RDR-1", json!({"msg_sd_get_inputs": {}}));
        dispatcher.drain_once().await;

        let paths = diagnostics.paths();
        assert_eq!(paths.len(), 1);
        assert!(paths[0].to_string_lossy().starts_with("diag/paho_alert_"));
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let (dispatcher, tx, _, publisher) = dispatcher(false);
        let dispatcher = Arc::new(dispatcher);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let runner = {
            let dispatcher = Arc::clone(&dispatcher);
            tokio::spawn(async move { dispatcher.run(shutdown_rx).await })
        };

        push(&tx, "access/RDR-1", json!({"msg_sd_get_sysinfo": {}}));
        for _ in 0..50 {
            if !publisher.published().is_empty() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert_eq!(publisher.published_with_tag("msg_str_sysinfo_request").len(), 1);

        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(std::time::Duration::from_secs(1), runner)
            .await
            .unwrap()
            .unwrap();
    }

    #[test]
    fn test_capture_file_name_layout() {
        let at = Local.with_ymd_and_hms(2024, 12, 18, 16, 49, 44).unwrap();
        let name = capture_file_name(std::path::Path::new("data/paho"), at);
        assert_eq!(name, PathBuf::from("data/paho_alert_2024-12-18_16-49-44-000"));
    }
}
