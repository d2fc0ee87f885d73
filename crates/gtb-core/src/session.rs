use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use tokio::sync::Mutex;

use crate::{
    config::Config,
    conversation::{Conversation, Turn},
    domain::ChatId,
    model::client::ChatModel,
    Result,
};

/// Bounds applied by the registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionLimits {
    pub max_turns: usize,
    pub max_chats: usize,
    pub idle_ttl: Duration,
}

impl SessionLimits {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            max_turns: cfg.history_max_turns,
            max_chats: cfg.session_max_chats,
            idle_ttl: cfg.session_idle_ttl,
        }
    }
}

struct Entry {
    conversation: Arc<Mutex<Conversation>>,
    last_used: Instant,
}

impl Entry {
    /// Some turn holds (or waits on) this conversation.
    fn in_use(&self) -> bool {
        Arc::strong_count(&self.conversation) > 1
    }
}

fn log_trim(chat_id: ChatId, dropped: usize) {
    if dropped > 0 {
        tracing::debug!(chat_id = chat_id.0, dropped, "trimmed conversation history");
    }
}

/// Per-chat conversation registry.
///
/// - a conversation is created on the first message of a chat
/// - each conversation has its own lock: one chat's turns never interleave with another's,
///   and concurrent events of the same chat are handled one after the other
/// - idle conversations expire after `idle_ttl`; above `max_chats` the least recently used
///   one is evicted. Conversations with a turn in flight are skipped, so the registry can
///   briefly hold more than `max_chats`
pub struct SessionRegistry {
    model: Arc<dyn ChatModel>,
    limits: SessionLimits,
    chats: Mutex<HashMap<ChatId, Entry>>,
}

impl SessionRegistry {
    pub fn new(model: Arc<dyn ChatModel>, limits: SessionLimits) -> Self {
        Self {
            model,
            limits,
            chats: Mutex::new(HashMap::new()),
        }
    }

    pub fn model_name(&self) -> &str {
        self.model.model_name()
    }

    /// Append `text` as a user turn, ask the model with the chat's history, record the reply.
    ///
    /// On failure the user turn stays in history and the error is returned as-is (no retry).
    pub async fn send_turn(&self, chat_id: ChatId, text: &str) -> Result<String> {
        let conversation = self.conversation_at(chat_id, Instant::now()).await;
        let mut conv = conversation.lock().await;

        // Trimmed on both sides of the call so failed turns cannot grow the history.
        conv.push(Turn::user(text));
        log_trim(chat_id, conv.trim());
        let reply = self.model.generate(conv.turns()).await?;
        conv.push(Turn::model(reply.clone()));
        log_trim(chat_id, conv.trim());

        Ok(reply)
    }

    /// Snapshot of a chat's history (empty if the chat has no session).
    pub async fn history(&self, chat_id: ChatId) -> Vec<Turn> {
        let conversation = {
            let chats = self.chats.lock().await;
            chats.get(&chat_id).map(|e| e.conversation.clone())
        };
        match conversation {
            Some(c) => c.lock().await.to_vec(),
            None => Vec::new(),
        }
    }

    pub async fn active_chats(&self) -> usize {
        self.chats.lock().await.len()
    }

    async fn conversation_at(&self, chat_id: ChatId, now: Instant) -> Arc<Mutex<Conversation>> {
        let mut chats = self.chats.lock().await;

        // A zero TTL disables idle expiry. Conversations held by a running turn are never
        // dropped: a new entry for the same chat would not share its lock.
        let ttl = self.limits.idle_ttl;
        if !ttl.is_zero() {
            let before = chats.len();
            chats.retain(|_, e| e.in_use() || now.saturating_duration_since(e.last_used) < ttl);
            let expired = before - chats.len();
            if expired > 0 {
                tracing::debug!(expired, "evicted idle conversations");
            }
        }

        if let Some(entry) = chats.get_mut(&chat_id) {
            entry.last_used = now;
            return entry.conversation.clone();
        }

        while chats.len() >= self.limits.max_chats {
            let Some(oldest) = chats
                .iter()
                .filter(|(_, e)| !e.in_use())
                .min_by_key(|(_, e)| e.last_used)
                .map(|(id, _)| *id)
            else {
                break;
            };
            chats.remove(&oldest);
            tracing::debug!(chat_id = oldest.0, "evicted least recently used conversation");
        }

        let conversation = Arc::new(Mutex::new(Conversation::new(self.limits.max_turns)));
        chats.insert(
            chat_id,
            Entry {
                conversation: conversation.clone(),
                last_used: now,
            },
        );
        conversation
    }
}
