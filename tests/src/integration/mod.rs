//! Cross-subsystem flows exercised through the dispatcher.

pub mod harness;

mod flows;
mod scenarios;
