//! Telegram update handlers.
//!
//! Each message is converted to the core's neutral form, classified, and routed to one of
//! two endpoints. Handler failures are logged here so one update never affects another.

use std::sync::Arc;

use teloxide::{prelude::*, types::Message};

use gtb_core::{
    domain::{ChatId, UserId},
    messaging::{
        classify::classify,
        types::{Command, InboundMessage, IncomingUpdate, Sender, TextMessage},
    },
};

use crate::router::AppState;

/// Neutral view of a Telegram message.
pub fn to_inbound(msg: &Message) -> InboundMessage {
    InboundMessage {
        chat_id: ChatId(msg.chat.id.0),
        sender: msg.from().map(|u| Sender {
            user_id: UserId(u.id.0 as i64),
            first_name: u.first_name.clone(),
            username: u.username.clone(),
        }),
        text: msg.text().map(str::to_string),
    }
}

/// Routing filter: `None` drops the update (ignored kinds are only logged).
pub fn classify_update(msg: Message) -> Option<IncomingUpdate> {
    match classify(to_inbound(&msg)) {
        IncomingUpdate::Ignored(kind) => {
            tracing::debug!(chat_id = msg.chat.id.0, ?kind, "ignoring message");
            None
        }
        update => Some(update),
    }
}

pub async fn handle_command(cmd: Command, state: Arc<AppState>) -> ResponseResult<()> {
    let chat_id = cmd.chat_id.0;
    if let Err(e) = state.relay.handle_command(cmd).await {
        tracing::error!(chat_id, error = %e, "command handling failed");
    }
    Ok(())
}

pub async fn handle_text(msg: TextMessage, state: Arc<AppState>) -> ResponseResult<()> {
    let chat_id = msg.chat_id.0;
    if let Err(e) = state.relay.handle_text(msg).await {
        tracing::error!(chat_id, error = %e, "reply could not be delivered");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use gtb_core::messaging::types::CommandKind;
    use serde_json::json;

    use super::*;

    fn message(text: &str) -> Message {
        serde_json::from_value(json!({
            "message_id": 5,
            "date": 1_700_000_000,
            "chat": {"id": 42, "type": "private", "first_name": "Ava"},
            "from": {"id": 7, "is_bot": false, "first_name": "Ava", "username": "ava"},
            "text": text
        }))
        .unwrap()
    }

    #[test]
    fn converts_sender_chat_and_text() {
        let inbound = to_inbound(&message("Hello"));
        assert_eq!(inbound.chat_id, ChatId(42));
        assert_eq!(inbound.text.as_deref(), Some("Hello"));

        let sender = inbound.sender.unwrap();
        assert_eq!(sender.user_id, UserId(7));
        assert_eq!(sender.first_name, "Ava");
        assert_eq!(sender.username.as_deref(), Some("ava"));
    }

    #[test]
    fn routes_start_and_text_drops_unknown_commands() {
        assert!(matches!(
            classify_update(message("/start")),
            Some(IncomingUpdate::Command(Command {
                kind: CommandKind::Start,
                ..
            }))
        ));
        assert!(matches!(
            classify_update(message("Hello")),
            Some(IncomingUpdate::Text(_))
        ));
        assert!(classify_update(message("/settings")).is_none());
    }
}
