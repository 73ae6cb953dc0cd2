//! # Zone Access Policy (zg-02)
//!
//! Decides whether an identified person may pass a door and where they are
//! afterwards. Each camera guards a transition `from_zone → to_zone`; each
//! identity carries its permitted zones, its current zone and a one-shot
//! free-movement override.
//!
//! ## Flow
//!
//! ```text
//! FaceMatch handler (zg-03)
//!        │ evaluate_access(card, camera_id)
//!        ↓
//! ┌────────────────────┐  zone_snapshot(card)  ┌──────────────┐
//! │ ZoneAccessService  │ ────────────────────→ │  ZoneStore   │
//! │                    │ ←──────────────────── │ (identity DB)│
//! │  evaluate() (pure) │                       │              │
//! │        │           │  commit(card, c)      │              │
//! │        └─ commits ─┼─────────────────────→ │ conditional  │
//! └────────────────────┘                       └──────────────┘
//! ```
//!
//! ## Guarantees
//!
//! | Guarantee | Enforcement |
//! |-----------|-------------|
//! | Zone 0 never survives an evaluation | rule 1 prunes it and denies |
//! | Current zone only changes through a commit | engine is pure; store writes are conditional |
//! | Same state, same decision | `evaluate` has no hidden inputs |
//! | Free pass is one-shot | every grant that uses it also clears it |

pub mod domain;
pub mod ports;
pub mod service;

pub use domain::{evaluate, ZoneCommit, ZoneEvaluation, ZonePolicy, ZonePolicyError, ZoneSnapshot};
pub use ports::{CameraDirectory, ZoneAccessApi, ZoneStore};
pub use service::ZoneAccessService;
