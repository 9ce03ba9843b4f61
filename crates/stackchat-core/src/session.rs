//! Conversation Session
//!
//! Holds the local turn history together with the identifiers and capability
//! flags produced by setup, and picks the instruction text sent with each turn.

use serde::{Deserialize, Serialize};

use crate::message::{Conversation, ConversationTurn};

/// Instructions given to the agent when it is created
pub const AGENT_INSTRUCTIONS: &str = "You are an expert assistant for ElectroShop. \
Use the RAG system to answer questions about ElectroShop's history and information, \
and use the MCP tools to interact with the ElectroShop sales database. \
Always provide helpful, accurate information.";

const INSTRUCTIONS_BOTH: &str = "Use the ElectroShop knowledge base for company information \
and the sales database tools for customer data operations.";

const INSTRUCTIONS_RAG: &str = "Use the ElectroShop knowledge base to answer questions \
about company history and information.";

const INSTRUCTIONS_TOOLS: &str =
    "Use the ElectroShop sales database tools for customer data operations.";

const INSTRUCTIONS_NONE: &str = "You are a helpful assistant for ElectroShop. \
No knowledge base or database tools are available, so answer from general knowledge \
and say so when you are unsure.";

/// Which optional capabilities setup managed to provision
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityFlags {
    pub rag_available: bool,
    pub tools_available: bool,
}

/// Per-turn instruction variant. Exactly one applies for a set of flags.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Instructions {
    Both,
    RagOnly,
    ToolsOnly,
    Neither,
}

impl Instructions {
    /// Pick the variant: both > RAG only > tools only > neither
    pub const fn for_flags(flags: CapabilityFlags) -> Self {
        match (flags.rag_available, flags.tools_available) {
            (true, true) => Self::Both,
            (true, false) => Self::RagOnly,
            (false, true) => Self::ToolsOnly,
            (false, false) => Self::Neither,
        }
    }

    pub const fn text(self) -> &'static str {
        match self {
            Self::Both => INSTRUCTIONS_BOTH,
            Self::RagOnly => INSTRUCTIONS_RAG,
            Self::ToolsOnly => INSTRUCTIONS_TOOLS,
            Self::Neither => INSTRUCTIONS_NONE,
        }
    }
}

/// Live conversation: history plus the immutable results of setup
#[derive(Clone, Debug)]
pub struct ConversationState {
    agent_id: String,
    session_id: String,
    capabilities: CapabilityFlags,
    conversation: Conversation,
}

impl ConversationState {
    pub fn new(
        agent_id: impl Into<String>,
        session_id: impl Into<String>,
        capabilities: CapabilityFlags,
    ) -> Self {
        Self {
            agent_id: agent_id.into(),
            session_id: session_id.into(),
            capabilities,
            conversation: Conversation::new(),
        }
    }

    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub const fn capabilities(&self) -> CapabilityFlags {
        self.capabilities
    }

    /// Instruction text to send with the next turn
    pub const fn instructions(&self) -> &'static str {
        Instructions::for_flags(self.capabilities).text()
    }

    pub const fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        self.conversation.turns()
    }

    /// Record a completed round (user turn plus optional reply)
    pub fn record_round(&mut self, user: ConversationTurn, reply: Option<ConversationTurn>) {
        self.conversation.record_round(user, reply);
    }

    /// Drop local history. Identifiers, flags and server-side state are kept.
    pub fn clear(&mut self) {
        self.conversation.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flags(rag: bool, tools: bool) -> CapabilityFlags {
        CapabilityFlags {
            rag_available: rag,
            tools_available: tools,
        }
    }

    #[test]
    fn test_instruction_priority() {
        assert_eq!(Instructions::for_flags(flags(true, true)), Instructions::Both);
        assert_eq!(Instructions::for_flags(flags(true, false)), Instructions::RagOnly);
        assert_eq!(Instructions::for_flags(flags(false, true)), Instructions::ToolsOnly);
        assert_eq!(Instructions::for_flags(flags(false, false)), Instructions::Neither);
    }

    #[test]
    fn test_variants_are_distinct() {
        let texts = [
            Instructions::Both.text(),
            Instructions::RagOnly.text(),
            Instructions::ToolsOnly.text(),
            Instructions::Neither.text(),
        ];
        for (i, a) in texts.iter().enumerate() {
            assert!(!a.is_empty());
            for b in &texts[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_clear_keeps_identifiers() {
        let mut state = ConversationState::new("agent_1", "session_1", flags(true, false));
        state.record_round(
            ConversationTurn::user("hello"),
            Some(ConversationTurn::assistant("hi")),
        );
        assert_eq!(state.turns().len(), 2);

        state.clear();
        assert_eq!(state.turns().len(), 0);
        assert_eq!(state.agent_id(), "agent_1");
        assert_eq!(state.session_id(), "session_1");
        assert_eq!(state.capabilities(), flags(true, false));
        assert_eq!(state.instructions(), Instructions::RagOnly.text());
    }
}
