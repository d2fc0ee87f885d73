//! Per-chat conversation history.

/// Author of a turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    User,
    Model,
}

impl Role {
    /// Role name as used by the Gemini `contents` payload.
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Model => "model",
        }
    }
}

/// One message in a conversation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            text: text.into(),
        }
    }
}

/// Ordered turn history for a single chat, capped at `max_turns`.
///
/// Trimming drops the oldest turns and keeps the retained window starting on a
/// user turn, which is what the provider expects as the first content.
#[derive(Clone, Debug)]
pub struct Conversation {
    turns: Vec<Turn>,
    max_turns: usize,
}

impl Conversation {
    pub fn new(max_turns: usize) -> Self {
        Self {
            turns: Vec::new(),
            max_turns: max_turns.max(1),
        }
    }

    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Snapshot of the history in order.
    pub fn to_vec(&self) -> Vec<Turn> {
        self.turns.clone()
    }

    /// Enforce the turn cap. Returns how many turns were dropped.
    pub fn trim(&mut self) -> usize {
        let mut cut = self.turns.len().saturating_sub(self.max_turns);
        while self.turns.get(cut).is_some_and(|t| t.role != Role::User) {
            cut += 1;
        }
        if cut == 0 {
            return 0;
        }
        self.turns.drain(..cut);
        cut
    }
}
