//! Routing rule for inbound messages.

use crate::messaging::types::{
    Command, CommandKind, IgnoredKind, InboundMessage, IncomingUpdate, TextMessage,
};

/// Lowercase command name of `/cmd@botname args`; `None` if `text` is not a command.
pub fn parse_command(text: &str) -> Option<String> {
    let body = text.trim().strip_prefix('/')?;
    let first = body.split(char::is_whitespace).next().unwrap_or("");
    Some(first.split('@').next().unwrap_or("").to_lowercase())
}

/// Classify an inbound message into exactly one update kind.
pub fn classify(msg: InboundMessage) -> IncomingUpdate {
    let Some(sender) = msg.sender else {
        return IncomingUpdate::Ignored(IgnoredKind::NoSender);
    };
    let Some(text) = msg.text else {
        return IncomingUpdate::Ignored(IgnoredKind::NonText);
    };

    if let Some(name) = parse_command(&text) {
        return match CommandKind::from_name(&name) {
            Some(kind) => IncomingUpdate::Command(Command {
                chat_id: msg.chat_id,
                sender,
                kind,
            }),
            None => IncomingUpdate::Ignored(IgnoredKind::UnknownCommand),
        };
    }

    IncomingUpdate::Text(TextMessage {
        chat_id: msg.chat_id,
        sender,
        text,
    })
}
