//! Setup Configuration
//!
//! Everything the setup pipeline and chat loop need to know up front.
//! Values come from the environment (optionally via `.env`) with defaults.

use std::path::PathBuf;

use crate::error::{AgentError, Result};
use crate::platform::ToolGroupRegistration;

/// Default cap on tool invocations per agent turn
pub const DEFAULT_MAX_TOOL_ITERATIONS: u32 = 5;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SetupConfig {
    /// Model the agent is created with
    pub agent_model: String,

    /// Model used for each chat response
    pub response_model: String,

    pub vector_store_name: String,

    /// Optional document seeded into the vector store
    pub document: Option<PathBuf>,

    /// External tool endpoint to register
    pub tool_group: ToolGroupRegistration,

    pub session_name: String,

    pub max_tool_iterations: u32,
}

impl Default for SetupConfig {
    fn default() -> Self {
        Self {
            agent_model: "ollama/llama3.2:3b".into(),
            response_model: "ollama/llama3.2:1b".into(),
            vector_store_name: "ElectroShop Knowledge Base".into(),
            document: Some(PathBuf::from("electroshop_history.txt")),
            tool_group: ToolGroupRegistration {
                group_id: "electroshop-db".into(),
                provider_id: "model-context-protocol".into(),
                endpoint_uri: "http://127.0.0.1:8000/mcp".into(),
            },
            session_name: "ElectroShop Chat Session".into(),
            max_tool_iterations: DEFAULT_MAX_TOOL_ITERATIONS,
        }
    }
}

impl SetupConfig {
    /// Read configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; unset keys keep their defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(model) = lookup("STACKCHAT_AGENT_MODEL") {
            config.agent_model = model;
        }
        if let Some(model) = lookup("STACKCHAT_RESPONSE_MODEL") {
            config.response_model = model;
        }
        if let Some(name) = lookup("STACKCHAT_VECTOR_STORE_NAME") {
            config.vector_store_name = name;
        }
        if let Some(document) = lookup("STACKCHAT_DOCUMENT") {
            // empty disables seeding
            config.document = (!document.trim().is_empty()).then(|| PathBuf::from(document));
        }
        if let Some(id) = lookup("STACKCHAT_TOOLGROUP_ID") {
            config.tool_group.group_id = id;
        }
        if let Some(provider) = lookup("STACKCHAT_TOOLGROUP_PROVIDER") {
            config.tool_group.provider_id = provider;
        }
        if let Some(uri) = lookup("STACKCHAT_MCP_ENDPOINT") {
            config.tool_group.endpoint_uri = uri;
        }
        if let Some(name) = lookup("STACKCHAT_SESSION_NAME") {
            config.session_name = name;
        }
        if let Some(raw) = lookup("STACKCHAT_MAX_TOOL_ITERATIONS") {
            config.max_tool_iterations = raw.trim().parse().map_err(|_| {
                AgentError::Config(format!(
                    "STACKCHAT_MAX_TOOL_ITERATIONS must be a positive integer, got {raw:?}"
                ))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.agent_model.trim().is_empty() || self.response_model.trim().is_empty() {
            return Err(AgentError::Config("model identifiers must not be empty".into()));
        }
        if self.max_tool_iterations == 0 {
            return Err(AgentError::Config(
                "STACKCHAT_MAX_TOOL_ITERATIONS must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = SetupConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config, SetupConfig::default());
        assert_eq!(config.max_tool_iterations, 5);
        assert_eq!(config.tool_group.group_id, "electroshop-db");
    }

    #[test]
    fn test_overrides() {
        let config = SetupConfig::from_lookup(lookup(&[
            ("STACKCHAT_AGENT_MODEL", "ollama/llama3.1:8b"),
            ("STACKCHAT_DOCUMENT", ""),
            ("STACKCHAT_MAX_TOOL_ITERATIONS", "3"),
        ]))
        .unwrap();
        assert_eq!(config.agent_model, "ollama/llama3.1:8b");
        assert_eq!(config.document, None);
        assert_eq!(config.max_tool_iterations, 3);
    }

    #[test]
    fn test_bad_iteration_count() {
        let err = SetupConfig::from_lookup(lookup(&[("STACKCHAT_MAX_TOOL_ITERATIONS", "lots")]))
            .unwrap_err();
        assert!(matches!(err, AgentError::Config(_)));

        let err = SetupConfig::from_lookup(lookup(&[("STACKCHAT_MAX_TOOL_ITERATIONS", "0")]))
            .unwrap_err();
        assert!(matches!(err, AgentError::Config(_)));
    }
}
