//! Messenger-facing abstractions (Telegram adapter lives in `gtb-telegram`).

pub mod classify;
pub mod port;
pub mod types;
