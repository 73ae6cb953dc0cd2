//! FaceMatch Handler - from a watchlist match to an access response.

use crate::domain::{DiscardReason, FaceMatchError, FaceMatchOutcome};
use crate::ports::{IdentityDirectory, TransactionSink};
use chrono::{DateTime, Local};
use shared_bus::{CorrelationTable, EnvelopePublisher, PublishOutcome};
use shared_types::{
    Command, EnvelopeFactory, FaceMatchEvent, Route, TransactionRecord, UserRecordResponse,
    FACE_IDENTIFIED,
};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use zg_02_zone_policy::{CameraDirectory, ZoneAccessApi};
use zone_telemetry::{metric_inc, CORRELATIONS_PENDING, DISPATCH_ERRORS, FACE_MATCH_DISCARDED};

/// Full name reported when the face id has no identity record.
pub const UNNAMED_PERSON: &str = "Person in DB Un-named!";

/// Collaborators of the FaceMatch handler.
pub struct FaceMatchDeps {
    pub identities: Arc<dyn IdentityDirectory>,
    pub cameras: Arc<dyn CameraDirectory>,
    pub access: Arc<dyn ZoneAccessApi>,
    pub publisher: Arc<dyn EnvelopePublisher>,
    pub transactions: Arc<dyn TransactionSink>,
    pub correlations: Arc<CorrelationTable>,
    pub envelopes: EnvelopeFactory,
}

/// Handles decoded FaceMatch events.
pub struct FaceMatchHandler {
    deps: FaceMatchDeps,
    /// Watchlists whose matches always require verification at the reader.
    verify_watchlists: HashSet<String>,
}

impl FaceMatchHandler {
    #[must_use]
    pub fn new(deps: FaceMatchDeps, verify_watchlists: impl IntoIterator<Item = String>) -> Self {
        Self {
            deps,
            verify_watchlists: verify_watchlists.into_iter().collect(),
        }
    }

    /// Handle one event. Errors are logged here and reported as
    /// [`FaceMatchOutcome::Failed`].
    pub async fn handle(&self, event: &FaceMatchEvent, received_at: DateTime<Local>) -> FaceMatchOutcome {
        info!(
            object_id = %event.object_id,
            camera_id = %event.camera_id,
            face_id = %event.face_id(),
            name = %event.reported_name(),
            watchlist_id = %event.watchlist_id,
            "[zg-03] FaceMatch received"
        );
        debug!(
            timestamp = %event.event_time(self.deps.envelopes.datetime_format()),
            created_by = %event.created_by,
            probe = %event.probe_face_camera_name,
            mqtt_target = %event.mqtt_target,
            "[zg-03] FaceMatch details"
        );

        match self.process(event, received_at).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(object_id = %event.object_id, error = %e, "[zg-03] FaceMatch handling failed");
                metric_inc!(DISPATCH_ERRORS, &["face_match"]);
                FaceMatchOutcome::Failed(e.to_string())
            }
        }
    }

    async fn process(
        &self,
        event: &FaceMatchEvent,
        received_at: DateTime<Local>,
    ) -> Result<FaceMatchOutcome, FaceMatchError> {
        let deps = &self.deps;

        let permitted = deps.cameras.permitted_watchlist_ids(&event.camera_id);
        if !permitted.contains(&event.watchlist_id) {
            info!(
                watchlist_id = %event.watchlist_id,
                camera_id = %event.camera_id,
                "[zg-03] Watchlist not permitted for camera, skipping"
            );
            return Ok(self.discard(DiscardReason::WatchlistNotPermitted));
        }

        let Some(reader_serial) = deps.cameras.reader_serial(&event.camera_id) else {
            info!(camera_id = %event.camera_id, "[zg-03] Camera has no reader, skipping");
            return Ok(self.discard(DiscardReason::NoReader));
        };

        if let Err(e) = deps
            .correlations
            .insert_if_absent(&event.object_id, reader_serial.clone())
        {
            warn!(error = %e, "[zg-03] Duplicate objectId detected");
        }
        CORRELATIONS_PENDING.set(deps.correlations.len() as f64);

        let face_id = event.face_id();
        let identity = deps
            .identities
            .find_by_face_id(face_id)
            .map_err(FaceMatchError::IdentityLookup)?;
        let found = identity.is_some();
        let full_name = identity
            .as_ref()
            .map(|record| record.full_name())
            .unwrap_or_else(|| UNNAMED_PERSON.to_string());
        let card_number = identity.as_ref().and_then(|r| r.active_card().cloned());
        let pin_number = identity.as_ref().and_then(|r| r.pin_number.clone());

        info!(
            face_id = %face_id,
            name = %full_name,
            card_number = ?card_number,
            "[zg-03] User lookup"
        );

        let decision = deps
            .access
            .evaluate_access(card_number.as_deref(), &event.camera_id);

        let mut response = UserRecordResponse {
            granted: false,
            face_id: Some(face_id.to_string()),
            pin_code: None,
            full_name: Some(full_name.clone()),
            pin_number,
            card_number: card_number.clone(),
            verif_ident: false,
        };

        if !decision.allowed {
            self.publish_response(event, &reader_serial, response).await?;
            info!(
                object_id = %event.object_id,
                reader = %reader_serial,
                reason = %decision.reason,
                "[zg-03] Access denied"
            );
            return Ok(FaceMatchOutcome::Denied {
                reader_serial,
                reason: decision.reason,
            });
        }

        let user_verif = identity.as_ref().map(|r| r.verif_ident).unwrap_or(false);
        let camera_verif = deps.cameras.camera_verif_ident(&event.camera_id);
        let watchlist_verif = self.verify_watchlists.contains(&event.watchlist_id);
        let verif_ident = user_verif || camera_verif || watchlist_verif;
        debug!(
            user_verif,
            camera_verif,
            watchlist_verif,
            mode = if verif_ident { "Verify" } else { "Ident" },
            "[zg-03] Verification flags"
        );

        response.granted = found;
        response.verif_ident = verif_ident;
        self.publish_response(event, &reader_serial, response).await?;

        let record = TransactionRecord {
            object_id: event.object_id.clone(),
            date_time: deps.envelopes.format_datetime(&received_at),
            transaction_type: FACE_IDENTIFIED.to_string(),
            id_number: face_id.to_string(),
            unique_id: event.person_id.clone(),
            full_name,
            serial_source: reader_serial.clone(),
        };
        deps.transactions
            .append_transaction(record)
            .map_err(FaceMatchError::Transaction)?;

        info!(
            object_id = %event.object_id,
            reader = %reader_serial,
            found,
            verif_ident,
            "[zg-03] Access granted"
        );
        Ok(FaceMatchOutcome::Granted {
            reader_serial,
            found,
            verif_ident,
        })
    }

    async fn publish_response(
        &self,
        event: &FaceMatchEvent,
        reader_serial: &str,
        response: UserRecordResponse,
    ) -> Result<(), FaceMatchError> {
        let envelope = self.deps.envelopes.build(
            &Command::UserRecordResponse(response),
            Route::to(reader_serial),
            Some(event.object_id.clone()),
        );
        match self.deps.publisher.publish(envelope).await {
            PublishOutcome::Failed(reason) => Err(FaceMatchError::Publish(reason)),
            // Skipped publishes were already logged by the publisher
            PublishOutcome::Sent | PublishOutcome::SkippedDisconnected => Ok(()),
        }
    }

    fn discard(&self, reason: DiscardReason) -> FaceMatchOutcome {
        metric_inc!(FACE_MATCH_DISCARDED, &[reason.as_str()]);
        FaceMatchOutcome::Discarded(reason)
    }
}
