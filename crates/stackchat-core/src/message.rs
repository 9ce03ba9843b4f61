//! Conversation Turns
//!
//! Local dialogue history kept by the chat client.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who produced a turn
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// User input
    User,
    /// Assistant (platform) reply
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

/// What a turn carries
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnKind {
    /// Plain text
    Message,
    /// The assistant invoked a tool instead of answering in text. The chat
    /// loop only shows a placeholder for these and never records one.
    ToolInvocation,
}

/// A single entry in the dialogue. Never mutated after creation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub text: String,
    pub kind: TurnKind,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl ConversationTurn {
    fn new(role: Role, text: impl Into<String>, kind: TurnKind) -> Self {
        Self {
            role,
            text: text.into(),
            kind,
            timestamp: Utc::now(),
        }
    }

    /// Create a user message turn
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text, TurnKind::Message)
    }

    /// Create an assistant message turn
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, text, TurnKind::Message)
    }
}

/// Ordered dialogue history. Insertion order is dialogue order.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Conversation {
    turns: Vec<ConversationTurn>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one round: the user turn and, if there is one, the reply.
    ///
    /// Both land together; there is no way to append half a round.
    pub fn record_round(&mut self, user: ConversationTurn, reply: Option<ConversationTurn>) {
        self.turns.reserve(2);
        self.turns.push(user);
        self.turns.extend(reply);
    }

    /// Get all turns
    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    /// Get the last turn
    pub fn last(&self) -> Option<&ConversationTurn> {
        self.turns.last()
    }

    /// Discard every turn
    pub fn clear(&mut self) {
        self.turns.clear();
    }

    /// Number of turns
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}
