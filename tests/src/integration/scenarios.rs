//! # Zone Decision Scenarios
//!
//! FaceMatch events pushed through the dispatcher, checked against the
//! published reader response, the transaction log and the stored zone state.
//!
//! | Scenario | Identity | Camera | Expected |
//! |----------|----------|--------|----------|
//! | A | zones [1,2], current 1 | 1→2, update | granted, moved to 2 |
//! | B | zones [1,2], current 2 | 1→2, update | anti-passback deny |
//! | C | zones [3], current 0, free pass | 1→3, no update | granted, reset to perimeter |
//! | D | any | watchlist not permitted | nothing published |
//! | E | unknown faceId | 1→2 | `found = false`, no transaction |

#[cfg(test)]
mod tests {
    use serde_json::json;
    use shared_types::{DecisionReason, ZoneAction, FACE_IDENTIFIED};
    use zg_02_zone_policy::ZoneAccessApi;
    use zg_03_face_match::{DiscardReason, FaceMatchOutcome, UNNAMED_PERSON};
    use zg_04_dispatcher::CycleOutcome;

    use crate::integration::harness::{
        face_match, TestGate, CAMERA_ID, READER_SERIAL, ROC_SERIAL, WATCHLIST_ID,
    };

    // =============================================================================
    // SCENARIO A: STANDARD TRANSITION
    // =============================================================================

    #[tokio::test]
    async fn test_scenario_a_transition_grants_and_moves() {
        let gate = TestGate::new();
        gate.install_camera(1, 2, true);
        gate.install_identity("face-a", &[1, 2], 1, false);

        let outcome = gate
            .deliver(ROC_SERIAL, &face_match("evt-a", WATCHLIST_ID, "face-a"))
            .await;

        assert_eq!(
            outcome,
            CycleOutcome::FaceMatch(FaceMatchOutcome::Granted {
                reader_serial: READER_SERIAL.into(),
                found: true,
                verif_ident: false,
            })
        );
        assert_eq!(gate.identity("face-a").current_zone, 2);

        let responses = gate.responses();
        assert_eq!(responses.len(), 1);
        let response = &responses[0];
        assert_eq!(response.object_id(), "evt-a");
        assert_eq!(response.destination(), Some(READER_SERIAL));
        assert!(!response.header().broadcast);
        assert_eq!(response.field("granted"), Some(&json!(true)));
        assert_eq!(response.field("cardNumber"), Some(&json!("C-face-a")));
        assert_eq!(response.field("pinNumber"), Some(&json!("1234")));
        assert_eq!(response.field("fullName"), Some(&json!("Ada Lovelace")));

        let records = gate.transactions.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].transaction_type, FACE_IDENTIFIED);
        assert_eq!(records[0].id_number, "face-a");
        assert_eq!(records[0].unique_id, "person-face-a");
        assert_eq!(records[0].serial_source, READER_SERIAL);
    }

    #[tokio::test]
    async fn test_scenario_a_decision_reports_update() {
        let gate = TestGate::new();
        gate.install_camera(1, 2, true);
        gate.install_identity("face-a", &[1, 2], 1, false);

        let decision = gate.core.access.evaluate_access(Some("C-face-a"), CAMERA_ID);
        assert!(decision.allowed);
        assert_eq!(decision.zone_action, ZoneAction::Updated);
        assert!(!decision.used_free_pass);
    }

    // =============================================================================
    // SCENARIO B: ANTI-PASSBACK
    // =============================================================================

    #[tokio::test]
    async fn test_scenario_b_anti_passback_denies() {
        let gate = TestGate::new();
        gate.install_camera(1, 2, true);
        gate.install_identity("face-b", &[1, 2], 2, false);

        let outcome = gate
            .deliver(ROC_SERIAL, &face_match("evt-b", WATCHLIST_ID, "face-b"))
            .await;

        assert_eq!(
            outcome,
            CycleOutcome::FaceMatch(FaceMatchOutcome::Denied {
                reader_serial: READER_SERIAL.into(),
                reason: DecisionReason::AntiPassbackViolation,
            })
        );
        let responses = gate.responses();
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].field("granted"), Some(&json!(false)));
        assert_eq!(responses[0].field("verifIdent"), Some(&json!(false)));
        assert!(gate.transactions.is_empty());
        assert_eq!(gate.identity("face-b").current_zone, 2);
    }

    #[tokio::test]
    async fn test_scenario_b_same_state_same_decision() {
        let gate = TestGate::new();
        gate.install_camera(1, 2, true);
        gate.install_identity("face-b", &[1, 2], 2, false);

        let first = gate.core.access.evaluate_access(Some("C-face-b"), CAMERA_ID);
        let second = gate.core.access.evaluate_access(Some("C-face-b"), CAMERA_ID);
        assert_eq!(first, second);
        assert_eq!(first.reason, DecisionReason::AntiPassbackViolation);
    }

    #[tokio::test]
    async fn test_scenario_b_free_movement_passes_once() {
        let gate = TestGate::new();
        gate.install_camera(1, 2, false);
        gate.install_identity("face-b", &[1, 2], 2, true);

        gate.deliver(ROC_SERIAL, &face_match("evt-b1", WATCHLIST_ID, "face-b"))
            .await;
        let second = gate
            .deliver(ROC_SERIAL, &face_match("evt-b2", WATCHLIST_ID, "face-b"))
            .await;

        let granted: Vec<_> = gate
            .responses()
            .iter()
            .map(|r| r.field("granted").cloned())
            .collect();
        assert_eq!(granted, vec![Some(json!(true)), Some(json!(false))]);
        assert!(matches!(
            second,
            CycleOutcome::FaceMatch(FaceMatchOutcome::Denied { .. })
        ));
        assert!(!gate.identity("face-b").free_movement);
    }

    // =============================================================================
    // SCENARIO C: UNDEFINED ZONE WITH FREE PASS
    // =============================================================================

    #[tokio::test]
    async fn test_scenario_c_free_pass_resets_to_perimeter() {
        let gate = TestGate::new();
        gate.install_camera(1, 3, false);
        gate.install_identity("face-c", &[3], 0, true);

        let decision = gate.core.access.evaluate_access(Some("C-face-c"), CAMERA_ID);
        assert!(decision.allowed);
        assert!(decision.used_free_pass);
        assert_eq!(decision.zone_action, ZoneAction::SetToPerimeter);

        let identity = gate.identity("face-c");
        assert_eq!(identity.current_zone, 1);
        assert!(!identity.free_movement);
    }

    #[tokio::test]
    async fn test_scenario_c_through_dispatcher() {
        let gate = TestGate::new();
        gate.install_camera(1, 3, false);
        gate.install_identity("face-c", &[3], 0, true);

        let outcome = gate
            .deliver(ROC_SERIAL, &face_match("evt-c", WATCHLIST_ID, "face-c"))
            .await;

        assert!(matches!(
            outcome,
            CycleOutcome::FaceMatch(FaceMatchOutcome::Granted { found: true, .. })
        ));
        assert_eq!(gate.transactions.len(), 1);
        assert_eq!(gate.identity("face-c").current_zone, 1);
    }

    #[tokio::test]
    async fn test_undefined_zone_without_free_pass_denies() {
        let gate = TestGate::new();
        gate.install_camera(1, 3, false);
        gate.install_identity("face-c", &[3], 0, false);

        let outcome = gate
            .deliver(ROC_SERIAL, &face_match("evt-c", WATCHLIST_ID, "face-c"))
            .await;

        assert_eq!(
            outcome,
            CycleOutcome::FaceMatch(FaceMatchOutcome::Denied {
                reader_serial: READER_SERIAL.into(),
                reason: DecisionReason::ZoneUndefinedNoFreePass,
            })
        );
        assert_eq!(gate.identity("face-c").current_zone, 0);
    }

    #[tokio::test]
    async fn test_invalid_zone_pruned_and_denied() {
        let gate = TestGate::new();
        gate.install_camera(1, 2, true);
        gate.install_identity("face-z", &[0, 1, 2], 1, false);

        let outcome = gate
            .deliver(ROC_SERIAL, &face_match("evt-z", WATCHLIST_ID, "face-z"))
            .await;

        assert!(matches!(
            outcome,
            CycleOutcome::FaceMatch(FaceMatchOutcome::Denied {
                reason: DecisionReason::InvalidZonePresent,
                ..
            })
        ));
        assert!(!gate.identity("face-z").access_zones.contains(&0));

        // With zone 0 gone the next event passes
        gate.deliver(ROC_SERIAL, &face_match("evt-z2", WATCHLIST_ID, "face-z"))
            .await;
        assert_eq!(gate.identity("face-z").current_zone, 2);
    }

    // =============================================================================
    // SCENARIO D: WATCHLIST NOT PERMITTED
    // =============================================================================

    #[tokio::test]
    async fn test_scenario_d_foreign_watchlist_publishes_nothing() {
        let gate = TestGate::new();
        gate.install_camera(1, 2, true);
        gate.install_identity("face-d", &[1, 2], 1, false);

        let outcome = gate
            .deliver(ROC_SERIAL, &face_match("evt-d", "wl-visitors", "face-d"))
            .await;

        assert_eq!(
            outcome,
            CycleOutcome::FaceMatch(FaceMatchOutcome::Discarded(
                DiscardReason::WatchlistNotPermitted
            ))
        );
        assert!(gate.publisher.published().is_empty());
        assert!(gate.transactions.is_empty());
        assert!(gate.core.correlations.is_empty());
        assert_eq!(gate.identity("face-d").current_zone, 1);
    }

    #[tokio::test]
    async fn test_unknown_camera_publishes_nothing() {
        let gate = TestGate::new();
        gate.install_identity("face-d", &[1, 2], 1, false);

        gate.deliver(ROC_SERIAL, &face_match("evt-d", WATCHLIST_ID, "face-d"))
            .await;
        assert!(gate.publisher.published().is_empty());
    }

    // =============================================================================
    // SCENARIO E: UNKNOWN FACE
    // =============================================================================

    #[tokio::test]
    async fn test_scenario_e_unknown_face_not_found() {
        let gate = TestGate::new();
        gate.install_camera(1, 2, true);

        gate.deliver(ROC_SERIAL, &face_match("evt-e", WATCHLIST_ID, "face-nobody"))
            .await;

        let responses = gate.responses();
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].field("granted"), Some(&json!(false)));
        assert_eq!(responses[0].field("fullName"), Some(&json!(UNNAMED_PERSON)));
        assert_eq!(responses[0].destination(), Some(READER_SERIAL));
        assert!(gate.transactions.is_empty());
    }
}
