use std::{sync::Arc, time::Duration};

use crate::{
    config::Config,
    delivery::{deliver_reply, Delivery},
    domain::MessageRef,
    formatting::escape_html,
    messaging::{
        port::MessagingPort,
        types::{Command, CommandKind, TextMessage},
    },
    session::SessionRegistry,
    typing::{TypingIndicator, TYPING_REFRESH},
    Result,
};

/// Sent instead of a reply when the model call fails. Error details stay in the logs.
pub const APOLOGY_TEXT: &str = "Sorry, I encountered an error while processing your request.";

/// Greeting for `/start`, as Telegram HTML.
pub fn welcome_html(first_name: &str) -> String {
    format!(
        "👋 Hi {}!\n\n\
         I'm an AI assistant powered by Google Gemini.\n\
         Just send me a message, and I'll do my best to respond!\n\n\
         💬 I have conversation memory, so I'll remember our chat context.",
        escape_html(first_name)
    )
}

/// What a handled update produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RelayOutcome {
    Welcomed(MessageRef),
    Replied(Vec<Delivery>),
    Apologized(MessageRef),
}

/// Command + text handlers, independent of the Telegram SDK.
pub struct Relay {
    sessions: Arc<SessionRegistry>,
    messenger: Arc<dyn MessagingPort>,
    chunk_limit: usize,
    typing_refresh: Duration,
}

impl Relay {
    pub fn new(
        cfg: &Config,
        sessions: Arc<SessionRegistry>,
        messenger: Arc<dyn MessagingPort>,
    ) -> Self {
        let chunk_limit = cfg
            .telegram_safe_limit
            .min(messenger.capabilities().max_message_len);
        Self {
            sessions,
            messenger,
            chunk_limit,
            typing_refresh: TYPING_REFRESH,
        }
    }

    pub fn sessions(&self) -> &Arc<SessionRegistry> {
        &self.sessions
    }

    pub async fn handle_command(&self, cmd: Command) -> Result<RelayOutcome> {
        match cmd.kind {
            CommandKind::Start => {
                tracing::info!(
                    chat_id = cmd.chat_id.0,
                    user_id = cmd.sender.user_id.0,
                    "welcome"
                );
                let sent = self
                    .messenger
                    .send_html(cmd.chat_id, &welcome_html(&cmd.sender.first_name))
                    .await?;
                Ok(RelayOutcome::Welcomed(sent))
            }
        }
    }

    /// Typing indicator → model turn → reply with formatting fallback, or the apology.
    pub async fn handle_text(&self, msg: TextMessage) -> Result<RelayOutcome> {
        let chat_id = msg.chat_id;
        tracing::info!(
            chat_id = chat_id.0,
            user_id = msg.sender.user_id.0,
            chars = msg.text.chars().count(),
            "received message"
        );
        tracing::debug!(chat_id = chat_id.0, text = %msg.text, "message text");

        let typing =
            TypingIndicator::start(self.messenger.clone(), chat_id, self.typing_refresh).await;
        let result = self.sessions.send_turn(chat_id, &msg.text).await;
        typing.stop().await;

        match result {
            Ok(reply) => {
                let deliveries =
                    deliver_reply(self.messenger.as_ref(), chat_id, &reply, self.chunk_limit)
                        .await?;
                tracing::info!(
                    chat_id = chat_id.0,
                    chunks = deliveries.len(),
                    "sent model reply"
                );
                Ok(RelayOutcome::Replied(deliveries))
            }
            Err(e) => {
                tracing::error!(chat_id = chat_id.0, error = %e, "model call failed");
                let sent = self.messenger.send_plain(chat_id, APOLOGY_TEXT).await?;
                Ok(RelayOutcome::Apologized(sent))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::GEMINI_MODEL,
        conversation::Turn,
        delivery::tests::FakeMessenger,
        domain::{ChatId, UserId},
        errors::Error,
        messaging::types::Sender,
        session::{tests::FakeModel, SessionLimits},
    };

    fn cfg() -> Config {
        Config {
            telegram_bot_token: "t".to_string(),
            gemini_api_key: "k".to_string(),
            gemini_model: GEMINI_MODEL.to_string(),
            request_timeout: Duration::from_secs(5),
            history_max_turns: 40,
            session_max_chats: 100,
            session_idle_ttl: Duration::from_secs(600),
            telegram_safe_limit: 4000,
        }
    }

    fn relay(model: Arc<FakeModel>, messenger: Arc<FakeMessenger>) -> Relay {
        let cfg = cfg();
        let sessions = Arc::new(SessionRegistry::new(model, SessionLimits::from_config(&cfg)));
        Relay::new(&cfg, sessions, messenger)
    }

    fn ava() -> Sender {
        Sender {
            user_id: UserId(7),
            first_name: "Ava".to_string(),
            username: Some("ava".to_string()),
        }
    }

    fn text(chat: i64, body: &str) -> TextMessage {
        TextMessage {
            chat_id: ChatId(chat),
            sender: ava(),
            text: body.to_string(),
        }
    }

    #[tokio::test]
    async fn start_sends_welcome_without_model_call() {
        let model = Arc::new(FakeModel::default());
        let messenger = Arc::new(FakeMessenger::default());
        let relay = relay(model.clone(), messenger.clone());

        let out = relay
            .handle_command(Command {
                chat_id: ChatId(1),
                sender: ava(),
                kind: CommandKind::Start,
            })
            .await
            .unwrap();

        assert!(matches!(out, RelayOutcome::Welcomed(_)));
        let html = messenger.html_sent();
        assert_eq!(html.len(), 1);
        assert!(html[0]
            .1
            .starts_with("👋 Hi Ava!\n\nI'm an AI assistant powered by Google Gemini.\n"));
        assert!(html[0].1.ends_with("I'll remember our chat context."));
        assert_eq!(model.calls(), 0);
        assert!(relay.sessions().history(ChatId(1)).await.is_empty());
    }

    #[test]
    fn welcome_escapes_the_name() {
        assert!(welcome_html("<Bob>").starts_with("👋 Hi &lt;Bob&gt;!"));
    }

    #[tokio::test]
    async fn text_is_relayed_and_recorded() {
        let model = Arc::new(FakeModel::default());
        let messenger = Arc::new(FakeMessenger::default());
        let relay = relay(model.clone(), messenger.clone());

        let out = relay.handle_text(text(1, "Hello")).await.unwrap();

        assert!(matches!(out, RelayOutcome::Replied(ref d) if d.len() == 1));
        assert_eq!(
            relay.sessions().history(ChatId(1)).await,
            vec![Turn::user("Hello"), Turn::model("reply:Hello")]
        );
        assert_eq!(
            messenger.html_sent(),
            vec![(ChatId(1), "reply:Hello".to_string())]
        );
        assert!(messenger.plain_sent().is_empty());
        assert!(!messenger.actions_sent().is_empty());
    }

    #[tokio::test]
    async fn model_failure_sends_only_the_apology() {
        let model = Arc::new(FakeModel::default());
        let messenger = Arc::new(FakeMessenger::default());
        let relay = relay(model.clone(), messenger.clone());

        let out = relay.handle_text(text(1, "make it fail")).await.unwrap();

        assert!(matches!(out, RelayOutcome::Apologized(_)));
        assert_eq!(
            messenger.plain_sent(),
            vec![(ChatId(1), APOLOGY_TEXT.to_string())]
        );
        assert!(messenger.html_sent().is_empty());
        assert_eq!(relay.sessions().history(ChatId(1)).await.len(), 1);
    }

    #[tokio::test]
    async fn rejected_formatting_delivers_plain_reply_once() {
        let model = Arc::new(FakeModel::default());
        let messenger = Arc::new(FakeMessenger {
            fail_html: true,
            ..Default::default()
        });
        let relay = relay(model, messenger.clone());

        let out = relay.handle_text(text(1, "*oops")).await.unwrap();

        assert!(matches!(
            out,
            RelayOutcome::Replied(ref d) if matches!(d[0], Delivery::Plain { .. })
        ));
        assert_eq!(
            messenger.plain_sent(),
            vec![(ChatId(1), "reply:*oops".to_string())]
        );
    }

    #[tokio::test]
    async fn double_send_failure_propagates_without_apology() {
        let model = Arc::new(FakeModel::default());
        let messenger = Arc::new(FakeMessenger {
            fail_html: true,
            fail_plain: true,
            ..Default::default()
        });
        let relay = relay(model, messenger.clone());

        let err = relay.handle_text(text(1, "hi")).await.unwrap_err();
        assert!(matches!(err, Error::Delivery { .. }));
        assert!(messenger.plain_sent().is_empty());
        // The exchange itself succeeded.
        assert_eq!(relay.sessions().history(ChatId(1)).await.len(), 2);
    }

    #[tokio::test]
    async fn typing_failure_does_not_block_the_reply() {
        let model = Arc::new(FakeModel::default());
        let messenger = Arc::new(FakeMessenger {
            fail_actions: true,
            ..Default::default()
        });
        let relay = relay(model, messenger.clone());

        let out = relay.handle_text(text(1, "Hello")).await.unwrap();
        assert!(matches!(out, RelayOutcome::Replied(_)));
        assert_eq!(messenger.html_sent().len(), 1);
    }

    #[tokio::test]
    async fn different_chats_keep_separate_context() {
        let model = Arc::new(FakeModel::default());
        let messenger = Arc::new(FakeMessenger::default());
        let relay = relay(model.clone(), messenger);

        relay.handle_text(text(1, "my name is Ava")).await.unwrap();
        relay.handle_text(text(2, "what is my name?")).await.unwrap();

        let seen = model.seen.lock().unwrap().clone();
        assert_eq!(seen[1], vec![Turn::user("what is my name?")]);
    }
}
