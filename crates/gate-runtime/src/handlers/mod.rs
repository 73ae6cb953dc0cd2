//! # Runtime Handlers
//!
//! Tasks the runtime drives besides the dispatcher.

pub mod announcements;

pub use announcements::Announcer;
