//! Reply delivery: formatted first, plain text once as the fallback.

use crate::{
    domain::{ChatId, MessageRef},
    errors::Error,
    formatting::{convert_markdown_to_html, split_message},
    messaging::port::MessagingPort,
    Result,
};

/// How a chunk reached the chat.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Delivery {
    Formatted(MessageRef),
    /// The HTML send was rejected; the raw text was sent instead.
    Plain {
        message: MessageRef,
        formatted_error: String,
    },
}

/// Both steps of the chain failed.
#[derive(Debug)]
pub struct DeliveryError {
    pub formatted: Error,
    pub plain: Error,
}

impl From<DeliveryError> for Error {
    fn from(e: DeliveryError) -> Self {
        Error::Delivery {
            formatted: e.formatted.to_string(),
            plain: e.plain.to_string(),
        }
    }
}

/// Send `text` rendered as HTML; if that fails, send the identical text unformatted.
///
/// The chain has exactly two steps, so the plain send happens at most once.
pub async fn deliver_with_fallback(
    messenger: &dyn MessagingPort,
    chat_id: ChatId,
    text: &str,
) -> std::result::Result<Delivery, DeliveryError> {
    let formatted = match messenger
        .send_html(chat_id, &convert_markdown_to_html(text))
        .await
    {
        Ok(message) => return Ok(Delivery::Formatted(message)),
        Err(e) => e,
    };

    tracing::warn!(
        chat_id = chat_id.0,
        error = %formatted,
        "formatted send failed, sending as plain text"
    );

    match messenger.send_plain(chat_id, text).await {
        Ok(message) => Ok(Delivery::Plain {
            message,
            formatted_error: formatted.to_string(),
        }),
        Err(plain) => Err(DeliveryError { formatted, plain }),
    }
}

/// Deliver a model reply, split into chunks that fit a single Telegram message.
///
/// Stops at the first chunk whose fallback chain fails.
pub async fn deliver_reply(
    messenger: &dyn MessagingPort,
    chat_id: ChatId,
    text: &str,
    chunk_limit: usize,
) -> Result<Vec<Delivery>> {
    let mut out = Vec::new();
    for chunk in split_message(text, chunk_limit) {
        out.push(deliver_with_fallback(messenger, chat_id, &chunk).await?);
    }
    Ok(out)
}
