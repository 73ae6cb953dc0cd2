//! Zone Access Service - fetches state, runs the engine, applies commits.

use crate::domain::{evaluate, ZoneCommit, ZonePolicy, ZonePolicyError};
use crate::ports::{CameraDirectory, ZoneAccessApi, ZoneStore};
use shared_types::{AccessDecision, ZoneAction};
use std::sync::Arc;
use tracing::{debug, error, info};
use zone_telemetry::{metric_inc, ACCESS_DECISIONS};

/// Zone policy bound to its store and camera directory.
pub struct ZoneAccessService {
    policy: ZonePolicy,
    store: Arc<dyn ZoneStore>,
    cameras: Arc<dyn CameraDirectory>,
}

impl ZoneAccessService {
    #[must_use]
    pub fn new(
        policy: ZonePolicy,
        store: Arc<dyn ZoneStore>,
        cameras: Arc<dyn CameraDirectory>,
    ) -> Self {
        Self {
            policy,
            store,
            cameras,
        }
    }

    #[must_use]
    pub fn policy(&self) -> &ZonePolicy {
        &self.policy
    }

    fn try_evaluate(
        &self,
        card: Option<&str>,
        camera_id: &str,
    ) -> Result<AccessDecision, ZonePolicyError> {
        let card = card
            .filter(|card| !card.is_empty())
            .ok_or(ZonePolicyError::IdentityUnknown { card: None })?;

        let binding = self
            .cameras
            .camera_binding(camera_id)
            .filter(|binding| binding.enabled)
            .ok_or_else(|| ZonePolicyError::CameraUnknown {
                camera_id: camera_id.to_string(),
            })?;

        let snapshot =
            self.store
                .zone_snapshot(card)?
                .ok_or_else(|| ZonePolicyError::IdentityUnknown {
                    card: Some(card.to_string()),
                })?;

        let evaluation = evaluate(&snapshot, &binding.zones, &self.policy);
        let mut decision = evaluation.decision;

        for commit in &evaluation.commits {
            let applied = self.store.commit(card, commit)?;
            debug!(
                card = %card,
                commit = commit.label(),
                applied,
                "[zg-02] Zone commit"
            );
            if applied && matches!(commit, ZoneCommit::MoveTo { .. }) {
                decision = decision.with_zone_action(ZoneAction::Updated);
            }
        }

        Ok(decision)
    }
}

impl ZoneAccessApi for ZoneAccessService {
    fn evaluate_access(&self, card: Option<&str>, camera_id: &str) -> AccessDecision {
        let decision = match self.try_evaluate(card, camera_id) {
            Ok(decision) => decision,
            Err(ZonePolicyError::Store(e)) => {
                error!(camera_id = %camera_id, error = %e, "[zg-02] Zone evaluation failed");
                AccessDecision::deny(ZonePolicyError::Store(e).deny_reason())
            }
            Err(e) => {
                info!(camera_id = %camera_id, error = %e, "[zg-02] Access denied before evaluation");
                AccessDecision::deny(e.deny_reason())
            }
        };

        metric_inc!(
            ACCESS_DECISIONS,
            &[decision.outcome_label(), decision.reason.as_str()]
        );
        info!(
            camera_id = %camera_id,
            allowed = decision.allowed,
            reason = %decision.reason,
            zone_action = decision.zone_action.as_str(),
            used_free_pass = decision.used_free_pass,
            "[zg-02] Access decision"
        );
        decision
    }
}
