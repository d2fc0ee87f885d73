use crate::domain::{ChatId, UserId};

/// Author of an inbound message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sender {
    pub user_id: UserId,
    /// Display name used in greetings (Telegram `first_name`).
    pub first_name: String,
    pub username: Option<String>,
}

/// Messenger-neutral view of an inbound message, before classification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InboundMessage {
    pub chat_id: ChatId,
    pub sender: Option<Sender>,
    pub text: Option<String>,
}

/// Classified inbound update.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IncomingUpdate {
    Command(Command),
    Text(TextMessage),
    Ignored(IgnoredKind),
}

/// Commands the bot answers. Anything else is `IgnoredKind::UnknownCommand`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandKind {
    Start,
}

impl CommandKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "start" => Some(CommandKind::Start),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Command {
    pub chat_id: ChatId,
    pub sender: Sender,
    pub kind: CommandKind,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextMessage {
    pub chat_id: ChatId,
    pub sender: Sender,
    pub text: String,
}

/// Inbound messages that are dropped on purpose.
///
/// Every dropped case is listed here so a new kind has to be added explicitly.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IgnoredKind {
    /// `/something` that is not a known command.
    UnknownCommand,
    /// Photos, stickers, voice notes, documents, service messages.
    NonText,
    /// Channel posts and other messages without a user.
    NoSender,
}

/// Outgoing "chat action" (typing indicator).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChatAction {
    Typing,
}

/// Limits of a messenger implementation.
#[derive(Clone, Copy, Debug)]
pub struct MessagingCapabilities {
    pub max_message_len: usize,
}
