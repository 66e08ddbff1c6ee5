//! Core harvesting engine for the Telegram media harvester.
//!
//! This crate is intentionally transport-agnostic. The MTProto client and the
//! interactive login live behind ports (traits) implemented in adapter crates.

pub mod classify;
pub mod config;
pub mod domain;
pub mod errors;
pub mod harvest;
pub mod link;
pub mod logging;
pub mod naming;
pub mod ports;
pub mod progress;
pub mod strategy;

#[cfg(test)]
pub(crate) mod testing;

pub use errors::{Error, Result};
