use std::{sync::Arc, time::Duration};

use tokio::{sync::oneshot, task::JoinHandle, time::Instant};

use crate::{
    domain::ChatId,
    messaging::{port::MessagingPort, types::ChatAction},
};

/// Telegram clears "typing" after ~5s, so it is re-sent while a reply is pending.
pub const TYPING_REFRESH: Duration = Duration::from_secs(4);

/// Background "typing…" indicator for one chat.
///
/// Best-effort: a failed chat action is logged at `debug` and never turns into the
/// apology reply. Only the model call and reply delivery decide the outcome of a turn.
pub struct TypingIndicator {
    stop: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl TypingIndicator {
    /// Send the first action inline, then keep refreshing every `refresh` until stopped.
    pub async fn start(
        messenger: Arc<dyn MessagingPort>,
        chat_id: ChatId,
        refresh: Duration,
    ) -> Self {
        send_typing(messenger.as_ref(), chat_id).await;

        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let mut tick = tokio::time::interval_at(Instant::now() + refresh, refresh);
            loop {
                tokio::select! {
                    _ = tick.tick() => send_typing(messenger.as_ref(), chat_id).await,
                    _ = &mut stop_rx => break,
                }
            }
        });

        Self {
            stop: Some(stop_tx),
            task: Some(task),
        }
    }

    pub async fn stop(mut self) {
        if let Some(tx) = self.stop.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for TypingIndicator {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn send_typing(messenger: &dyn MessagingPort, chat_id: ChatId) {
    if let Err(e) = messenger.send_chat_action(chat_id, ChatAction::Typing).await {
        tracing::debug!(chat_id = chat_id.0, error = %e, "typing indicator failed");
    }
}
