//! Core domain + moderation logic for the gatekeeper bot.
//!
//! This crate is intentionally framework-agnostic. The messaging platform lives
//! behind ports (traits) implemented in adapter crates; the poll loop and the
//! membership enforcer only ever talk to those ports.

pub mod audit;
pub mod config;
pub mod domain;
pub mod enforcer;
pub mod errors;
pub mod logging;
pub mod poller;
pub mod ports;

pub use errors::{Error, Result};
