/// Core error type for the relay.
///
/// Adapter crates map their transport errors into this type so handlers can
/// decide between a user-facing apology, a plain-text fallback, or a log line.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("model error: {0}")]
    Model(String),

    #[error("messaging error: {0}")]
    Messaging(String),

    #[error("delivery failed (formatted: {formatted}; plain: {plain})")]
    Delivery { formatted: String, plain: String },

    #[error("external error: {0}")]
    External(String),
}

pub type Result<T> = std::result::Result<T, Error>;
