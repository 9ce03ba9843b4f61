//! Remote Platform Facade
//!
//! Typed capability surface over the inference platform: model catalog,
//! vector stores and files, tool-group registry, agent/session lifecycle and
//! response creation. The setup pipeline and the chat loop only ever talk to
//! the platform through [`PlatformClient`].
//!
//! ## Usage
//!
//! ```rust,ignore
//! use stackchat_core::platform::PlatformClient;
//!
//! let client: Arc<dyn PlatformClient> = Arc::new(LlamaStackClient::from_env()?);
//! let models = client.list_models().await?;
//! ```

mod mock;

pub use mock::{MockPlatform, Operation};

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::response::RawResponsePayload;

/// Entry of the model catalog
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    pub identifier: String,
    #[serde(default)]
    pub provider_id: Option<String>,
    #[serde(default)]
    pub model_type: Option<String>,
}

impl ModelDescriptor {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            provider_id: None,
            model_type: None,
        }
    }
}

/// Registered tool group as listed by the platform
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolGroupDescriptor {
    pub identifier: String,
    #[serde(default)]
    pub provider_id: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VectorStoreHandle {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileHandle {
    pub id: String,
    #[serde(default)]
    pub filename: String,
}

/// Tool group registration request. Registering the same id twice is a no-op
/// on the platform side.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolGroupRegistration {
    pub group_id: String,
    pub provider_id: String,
    pub endpoint_uri: String,
}

/// Agent creation request
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentSpec {
    pub model: String,
    pub instructions: String,
    pub max_tool_iterations: u32,
    pub enable_session_persistence: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentHandle {
    pub agent_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionHandle {
    pub session_id: String,
}

/// One chat turn sent to the platform
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnRequest {
    pub model: String,
    pub agent_id: String,
    pub session_id: String,
    pub instructions: String,
    pub input: String,
}

/// Id of a created response, used to fetch the full payload
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseHandle {
    pub id: String,
}

/// Capability surface of the inference platform.
///
/// Every call blocks the caller until the platform answers; timeouts and
/// transport policy belong to the implementation.
#[async_trait]
pub trait PlatformClient: Send + Sync {
    /// List the model catalog
    async fn list_models(&self) -> Result<Vec<ModelDescriptor>>;

    /// List registered tool groups
    async fn list_tool_groups(&self) -> Result<Vec<ToolGroupDescriptor>>;

    async fn create_vector_store(&self, name: &str) -> Result<VectorStoreHandle>;

    /// Upload a local file. Fails with `AgentError::NotFound` if it is absent.
    async fn upload_file(&self, path: &Path) -> Result<FileHandle>;

    async fn attach_file(&self, store_id: &str, file_id: &str) -> Result<()>;

    async fn register_tool_group(&self, registration: &ToolGroupRegistration) -> Result<()>;

    async fn create_agent(&self, spec: &AgentSpec) -> Result<AgentHandle>;

    async fn create_session(&self, agent_id: &str, name: &str) -> Result<SessionHandle>;

    /// Create a response for one user input
    async fn send_turn(&self, request: &TurnRequest) -> Result<ResponseHandle>;

    /// Fetch the full response created by [`PlatformClient::send_turn`]
    async fn fetch_response(&self, handle: &ResponseHandle) -> Result<RawResponsePayload>;

    /// Platform name for display
    fn name(&self) -> &str;
}
