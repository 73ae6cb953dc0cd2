//! # Policy Engine
//!
//! Rules are applied in order; the first rule that decides wins.
//!
//! | # | Rule | Outcome |
//! |---|------|---------|
//! | 1 | Zone 0 in access zones | prune, deny |
//! | 2 | Current zone undefined | free pass into `to_zone` or deny |
//! | 3 | Zone membership (switchable) | deny unless `from` and `to` permitted |
//! | 4 | Perimeter override | effective zone = perimeter when below it |
//! | 5 | Anti-passback (switchable) | deny unless effective zone = `from`, free pass once |
//! | 6 | Zone update | move to `to_zone` |
//! | 7 | Default | grant, zone unchanged |

use super::entities::{ZoneCommit, ZoneEvaluation, ZonePolicy, ZoneSnapshot};
use shared_types::{AccessDecision, CameraZoneConfig, DecisionReason, ZoneAction, UNDEFINED_ZONE};

/// Evaluate one passage through a door.
///
/// Pure: the same inputs always yield the same evaluation.
#[must_use]
pub fn evaluate(
    snapshot: &ZoneSnapshot,
    camera: &CameraZoneConfig,
    policy: &ZonePolicy,
) -> ZoneEvaluation {
    // Rule 1
    if snapshot.has_invalid_zone() {
        return ZoneEvaluation::new(AccessDecision::deny(DecisionReason::InvalidZonePresent))
            .with_commit(ZoneCommit::PruneAccessZones {
                zones: vec![UNDEFINED_ZONE],
            });
    }

    // Rule 2
    if snapshot.is_undefined() {
        return evaluate_undefined(snapshot, camera, policy);
    }

    // Rule 3
    if policy.access_zone_function
        && !(snapshot.contains(camera.from_zone) && snapshot.contains(camera.to_zone))
    {
        return ZoneEvaluation::new(AccessDecision::deny(DecisionReason::ZoneNotPermitted));
    }

    let mut decision = AccessDecision::grant(DecisionReason::Granted);
    let mut commits = Vec::new();

    if policy.anti_passback_function {
        // Rule 4
        let effective_zone = snapshot.current_zone.max(policy.perimeter_zone);

        // Rule 5
        if effective_zone != camera.from_zone {
            if !snapshot.free_movement {
                return ZoneEvaluation::new(AccessDecision::deny(
                    DecisionReason::AntiPassbackViolation,
                ));
            }
            decision = AccessDecision::grant(DecisionReason::GrantedViaFreeMovement).with_free_pass();
            commits.push(ZoneCommit::ConsumeFreePass);
        }
    }

    // Rule 6
    if camera.update_zone {
        commits.push(ZoneCommit::MoveTo {
            zone: camera.to_zone,
        });
    }

    // Rule 7
    ZoneEvaluation { decision, commits }
}

fn evaluate_undefined(
    snapshot: &ZoneSnapshot,
    camera: &CameraZoneConfig,
    policy: &ZonePolicy,
) -> ZoneEvaluation {
    if !(snapshot.free_movement && snapshot.contains(camera.to_zone)) {
        return ZoneEvaluation::new(AccessDecision::deny(DecisionReason::ZoneUndefinedNoFreePass));
    }

    let decision = AccessDecision::grant(DecisionReason::GrantedViaFreeMovement).with_free_pass();
    if camera.update_zone {
        ZoneEvaluation::new(decision).with_commit(ZoneCommit::MoveTo {
            zone: camera.to_zone,
        })
    } else {
        ZoneEvaluation::new(decision.with_zone_action(ZoneAction::SetToPerimeter)).with_commit(
            ZoneCommit::ResetToPerimeter {
                zone: policy.perimeter_zone,
            },
        )
    }
}
