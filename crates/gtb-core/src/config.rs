use std::{env, fmt, time::Duration};

use crate::{errors::Error, Result};

/// Gemini model used for every conversation. Not configurable at runtime.
pub const GEMINI_MODEL: &str = "gemini-2.5-flash";

/// Hard Telegram limit for a single message.
pub const TELEGRAM_MESSAGE_LIMIT: usize = 4096;

/// Typed configuration for the relay.
#[derive(Clone, PartialEq, Eq)]
pub struct Config {
    // Credentials
    pub telegram_bot_token: String,
    pub gemini_api_key: String,

    // Model
    pub gemini_model: String,
    pub request_timeout: Duration,

    // Session registry bounds
    pub history_max_turns: usize,
    pub session_max_chats: usize,
    pub session_idle_ttl: Duration,

    // Telegram limits
    pub telegram_safe_limit: usize,
}

impl Config {
    /// Load configuration from the process environment.
    ///
    /// A `.env` file in the working directory is applied first; variables already
    /// set in the environment take precedence over it.
    pub fn load() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let telegram_bot_token = required(&lookup, "TELEGRAM_BOT_TOKEN")?;
        let gemini_api_key = required(&lookup, "GEMINI_API_KEY")?;

        let request_timeout =
            Duration::from_secs(parse_or(&lookup, "GEMINI_TIMEOUT_SECS", 120u64).max(1));

        let history_max_turns = parse_or(&lookup, "HISTORY_MAX_TURNS", 40usize).max(2);
        let session_max_chats = parse_or(&lookup, "SESSION_MAX_CHATS", 1000usize).max(1);
        let session_idle_ttl =
            Duration::from_secs(parse_or(&lookup, "SESSION_IDLE_TTL_SECS", 86_400u64));

        let telegram_safe_limit = parse_or(&lookup, "TELEGRAM_SAFE_LIMIT", 4000usize)
            .clamp(200, TELEGRAM_MESSAGE_LIMIT);

        Ok(Self {
            telegram_bot_token,
            gemini_api_key,
            gemini_model: GEMINI_MODEL.to_string(),
            request_timeout,
            history_max_turns,
            session_max_chats,
            session_idle_ttl,
            telegram_safe_limit,
        })
    }
}

// Secrets stay out of logs and panic messages.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("telegram_bot_token", &"<redacted>")
            .field("gemini_api_key", &"<redacted>")
            .field("gemini_model", &self.gemini_model)
            .field("request_timeout", &self.request_timeout)
            .field("history_max_turns", &self.history_max_turns)
            .field("session_max_chats", &self.session_max_chats)
            .field("session_idle_ttl", &self.session_idle_ttl)
            .field("telegram_safe_limit", &self.telegram_safe_limit)
            .finish()
    }
}

fn required(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<String> {
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| Error::Config(format!("{key} environment variable is required")))
}

fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> T {
    lookup(key)
        .and_then(|s| s.trim().parse::<T>().ok())
        .unwrap_or(default)
}
