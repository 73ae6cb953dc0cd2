//! # Ports Layer
//!
//! - **Driving Ports (Inbound)**: [`ZoneAccessApi`], called by the FaceMatch
//!   handler.
//! - **Driven Ports (Outbound)**: [`ZoneStore`] and [`CameraDirectory`],
//!   implemented by the identity store adapter.

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;
