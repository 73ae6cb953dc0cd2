//! # Integration Test Flows
//!
//! Choreography across the dispatcher, both handlers and the correlation
//! table:
//!
//! 1. **FaceMatch → reader acknowledgement**: the decision registers a
//!    correlation entry that the reader's `msg_sd_log_transation` consumes
//! 2. **Queue hygiene**: loopback suppression and malformed payload drops
//!    never stall the queue
//! 3. **General envelopes**: lookups, diagnostics and sensor records from
//!    controller traffic

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use gate_runtime::{Announcer, MemoryIdentityStore, StoreSnapshot};
    use serde_json::json;
    use shared_bus::AckOutcome;
    use shared_types::DeviceEntry;
    use zg_03_face_match::FaceMatchOutcome;
    use zg_04_dispatcher::{CycleOutcome, DecodeError, GeneralOutcome};

    use crate::integration::harness::{
        face_match, general, TestGate, OWN_SERIAL, READER_SERIAL, ROC_SERIAL, WATCHLIST_ID,
    };

    // =============================================================================
    // FACEMATCH → ACKNOWLEDGEMENT
    // =============================================================================

    #[tokio::test]
    async fn test_reader_acknowledgement_consumes_correlation() {
        let gate = TestGate::new();
        gate.install_camera(1, 2, true);
        gate.install_identity("face-a", &[1, 2], 1, false);

        gate.deliver(ROC_SERIAL, &face_match("evt-1", WATCHLIST_ID, "face-a"))
            .await;
        assert_eq!(gate.core.correlations.len(), 1);

        let ack = general(
            "msg_sd_log_transation",
            json!({
                "_iD": "evt-1",
                "serialSource": READER_SERIAL,
                "dateTime": "2024/12/18 16:49:44",
                "transactionType": "RFE_Access",
                "idNumber": "C-face-a",
                "fullName": "Ada Lovelace"
            }),
        );
        let outcome = gate.deliver(READER_SERIAL, &ack).await;

        assert_eq!(
            outcome,
            CycleOutcome::General(GeneralOutcome::Acknowledged(AckOutcome::Matched {
                serial: READER_SERIAL.into()
            }))
        );
        assert!(gate.core.correlations.is_empty());

        let records = gate.transactions.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].transaction_type, "RFE_Access");
        assert_eq!(records[1].serial_source, READER_SERIAL);
    }

    #[tokio::test]
    async fn test_acknowledgement_from_wrong_reader_is_not_logged() {
        let gate = TestGate::new();
        gate.install_camera(1, 2, true);
        gate.install_identity("face-a", &[1, 2], 1, false);
        gate.deliver(ROC_SERIAL, &face_match("evt-1", WATCHLIST_ID, "face-a"))
            .await;

        let ack = general(
            "msg_sd_log_transation",
            json!({"_iD": "evt-1", "serialSource": "RDR-OTHER"}),
        );
        let outcome = gate.deliver("RDR-OTHER", &ack).await;

        assert!(matches!(
            outcome,
            CycleOutcome::General(GeneralOutcome::Acknowledged(AckOutcome::Mismatch { .. }))
        ));
        assert_eq!(gate.transactions.len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_event_keeps_one_correlation() {
        let gate = TestGate::new();
        gate.install_camera(1, 2, false);
        gate.install_identity("face-a", &[1, 2], 1, false);

        let event = face_match("evt-dup", WATCHLIST_ID, "face-a");
        gate.deliver(ROC_SERIAL, &event).await;
        gate.deliver(ROC_SERIAL, &event).await;

        assert_eq!(gate.core.correlations.len(), 1);
        assert_eq!(gate.responses().len(), 2);
    }

    #[tokio::test]
    async fn test_disconnected_publisher_still_records_transaction() {
        let gate = TestGate::new();
        gate.install_camera(1, 2, true);
        gate.install_identity("face-a", &[1, 2], 1, false);
        gate.publisher.set_connected(false);

        let outcome = gate
            .deliver(ROC_SERIAL, &face_match("evt-off", WATCHLIST_ID, "face-a"))
            .await;

        assert!(matches!(
            outcome,
            CycleOutcome::FaceMatch(FaceMatchOutcome::Granted { .. })
        ));
        assert!(gate.publisher.published().is_empty());
        assert_eq!(gate.transactions.len(), 1);
    }

    // =============================================================================
    // QUEUE HYGIENE
    // =============================================================================

    #[tokio::test]
    async fn test_own_messages_are_ignored() {
        let gate = TestGate::new();
        let outcome = gate
            .deliver(OWN_SERIAL, &general("msg_sd_get_sysinfo", json!({})))
            .await;

        assert_eq!(outcome, CycleOutcome::Loopback);
        assert!(gate.publisher.published().is_empty());
    }

    #[tokio::test]
    async fn test_bad_payload_does_not_block_queue() {
        let gate = TestGate::new();
        gate.push_raw(READER_SERIAL, b"{broken".to_vec());
        gate.push_raw(READER_SERIAL, Vec::new());
        gate.push(READER_SERIAL, &general("msg_sd_get_sysinfo", json!({})));

        assert!(matches!(
            gate.drain().await,
            CycleOutcome::Dropped(DecodeError::Json(_))
        ));
        assert_eq!(gate.drain().await, CycleOutcome::Dropped(DecodeError::Empty));
        assert_eq!(
            gate.drain().await,
            CycleOutcome::General(GeneralOutcome::Replied {
                tag: "msg_str_sysinfo_request"
            })
        );
        assert_eq!(gate.drain().await, CycleOutcome::Idle);
    }

    #[tokio::test]
    async fn test_face_match_missing_fields_dropped() {
        let gate = TestGate::new();
        gate.install_camera(1, 2, true);
        let mut event = face_match("evt-x", WATCHLIST_ID, "face-a");
        event.as_object_mut().unwrap().remove("faceId");

        let outcome = gate.deliver(ROC_SERIAL, &event).await;
        assert_eq!(
            outcome,
            CycleOutcome::Dropped(DecodeError::MissingFields(vec!["faceId".to_string()]))
        );
        assert!(gate.publisher.published().is_empty());
    }

    #[tokio::test]
    async fn test_other_routed_types_skipped() {
        let gate = TestGate::new();
        let outcome = gate
            .deliver(ROC_SERIAL, &json!({"routed_msg_type": "PersonUpdate"}))
            .await;
        assert_eq!(outcome, CycleOutcome::UnknownRouted("PersonUpdate".into()));
    }

    #[tokio::test]
    async fn test_raw_capture_when_enabled() {
        let mut config = TestGate::base_config();
        config.general.capture_raw_payloads = true;
        config.general.capture_path = PathBuf::from("capture/paho");
        let gate = TestGate::with_config(config);

        gate.push_raw(READER_SERIAL, b"not json".to_vec());
        gate.drain().await;

        let paths = gate.diagnostics.paths();
        assert_eq!(paths.len(), 1);
        assert!(paths[0]
            .to_string_lossy()
            .starts_with("capture/paho_alert_"));
    }

    // =============================================================================
    // GENERAL ENVELOPES
    // =============================================================================

    #[tokio::test]
    async fn test_pincode_lookup_replies_to_requester() {
        let gate = TestGate::new();
        gate.install_identity("face-a", &[1, 2], 1, false);

        let request = general(
            "msg_sd_msg_pincode",
            json!({"_iD": "req-9", "cardNumber": "C-face-a"}),
        );
        gate.deliver("CTL-7", &request).await;

        let responses = gate.responses();
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].object_id(), "req-9");
        assert_eq!(responses[0].destination(), Some("CTL-7"));
        assert_eq!(responses[0].field("granted"), Some(&json!(true)));
        assert_eq!(responses[0].field("fullName"), Some(&json!("Ada Lovelace")));
    }

    #[tokio::test]
    async fn test_envelope_for_other_instance_skipped() {
        let gate = TestGate::new();
        let request = json!({
            "msg_sd_get_sysinfo": {"broadCast": false, "serialDestination": "SN-OTHER"}
        });

        let outcome = gate.deliver("CTL-7", &request).await;
        assert_eq!(outcome, CycleOutcome::General(GeneralOutcome::NotAddressed));
        assert!(gate.publisher.published().is_empty());
    }

    #[tokio::test]
    async fn test_sysconfig_persisted_per_controller() {
        let gate = TestGate::new();
        let config = general(
            "msg_sd_sysconfig",
            json!({"sysConfig": {"SERIAL_LOCATION": {"z": 1, "a": 2}}}),
        );

        let outcome = gate.deliver("CTL-7", &config).await;
        let expected = PathBuf::from("data").join("config_CTL-7.json");
        assert_eq!(
            outcome,
            CycleOutcome::General(GeneralOutcome::Saved(expected.clone()))
        );
        assert!(gate.diagnostics.get(&expected).is_some());
    }

    #[tokio::test]
    async fn test_sensor_reading_recorded() {
        let gate = TestGate::new();
        let reading = general(
            "msg_sd_msg_cpu_sensor",
            json!({"_iD": "s-1", "sensorName": "BCM2711", "Temperature": 51.2}),
        );

        gate.deliver("CTL-7", &reading).await;
        let readings = gate.sensors.readings();
        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].serial_source, "CTL-7");
        assert_eq!(readings[0].temp_value, Some(51.2));
    }

    #[tokio::test]
    async fn test_unknown_tag_reported() {
        let gate = TestGate::new();
        let outcome = gate
            .deliver("CTL-7", &general("msg_sd_reboot", json!({})))
            .await;
        assert_eq!(
            outcome,
            CycleOutcome::General(GeneralOutcome::UnknownTag("msg_sd_reboot".into()))
        );
    }

    #[tokio::test]
    async fn test_peer_servers_go_quiet_after_announcement() {
        let east = TestGate::with_serial("SN-EAST");
        let west = TestGate::with_serial("SN-WEST");
        let announcer = Announcer::new(
            east.publisher.clone(),
            east.envelopes.clone(),
            east.sensors.clone(),
            true,
            false,
        );
        announcer.announce_online().await;

        // Relay each server's new traffic to the other until both stop talking.
        let (mut east_sent, mut west_sent) = (0, 0);
        for _ in 0..4 {
            let east_new = east.publisher.published()[east_sent..].to_vec();
            let west_new = west.publisher.published()[west_sent..].to_vec();
            if east_new.is_empty() && west_new.is_empty() {
                break;
            }
            east_sent += east_new.len();
            west_sent += west_new.len();
            west.receive_from("SN-EAST", &east_new).await;
            east.receive_from("SN-WEST", &west_new).await;
        }

        assert!(west.publisher.published_with_tag("msg_sd_get_config_file").is_empty());
        assert_eq!(east.publisher.published().len(), east_sent);
        assert_eq!(west.publisher.published().len(), west_sent);
    }

    // =============================================================================
    // STORE EXPORT
    // =============================================================================

    #[test]
    fn test_store_export_loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        let snapshot = StoreSnapshot {
            readers: vec![DeviceEntry::new("Front door", "RDR-1")],
            ..StoreSnapshot::default()
        };
        std::fs::write(&path, serde_json::to_vec(&snapshot).unwrap()).unwrap();

        let store = MemoryIdentityStore::load(&path).unwrap();
        assert_eq!(store.snapshot(), snapshot);
    }
}
