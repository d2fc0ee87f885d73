//! Core of the Gemini Telegram relay.
//!
//! Framework-agnostic: Telegram and Gemini live behind ports (traits) implemented
//! in the adapter crates.

pub mod config;
pub mod conversation;
pub mod delivery;
pub mod domain;
pub mod errors;
pub mod formatting;
pub mod logging;
pub mod messaging;
pub mod model;
pub mod relay;
pub mod session;
pub mod typing;

pub use errors::{Error, Result};
