//! Mock Platform
//!
//! In-memory stand-in for the inference platform, for tests and offline runs.
//! Every call is logged; individual operations can be scripted to fail.

use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use uuid::Uuid;

use super::{
    AgentHandle, AgentSpec, FileHandle, ModelDescriptor, PlatformClient, ResponseHandle,
    SessionHandle, ToolGroupDescriptor, ToolGroupRegistration, TurnRequest, VectorStoreHandle,
};
use crate::error::{AgentError, Result};
use crate::response::{OutputItem, RawResponsePayload};

/// Facade operations, as recorded in the call log
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    ListModels,
    ListToolGroups,
    CreateVectorStore,
    UploadFile,
    AttachFile,
    RegisterToolGroup,
    CreateAgent,
    CreateSession,
    SendTurn,
    FetchResponse,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::ListModels => "list models",
            Self::ListToolGroups => "list tool groups",
            Self::CreateVectorStore => "create vector store",
            Self::UploadFile => "upload file",
            Self::AttachFile => "attach file",
            Self::RegisterToolGroup => "register tool group",
            Self::CreateAgent => "create agent",
            Self::CreateSession => "create session",
            Self::SendTurn => "send turn",
            Self::FetchResponse => "fetch response",
        };
        f.write_str(name)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Scripted platform
pub struct MockPlatform {
    models: Vec<ModelDescriptor>,
    files: HashSet<PathBuf>,
    failing: HashSet<Operation>,
    hang_on_send: bool,
    replies: Mutex<VecDeque<RawResponsePayload>>,
    tool_groups: Mutex<Vec<ToolGroupDescriptor>>,
    calls: Mutex<Vec<Operation>>,
    turns: Mutex<Vec<TurnRequest>>,
}

impl Default for MockPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPlatform {
    pub fn new() -> Self {
        Self {
            models: vec![
                ModelDescriptor::new("ollama/llama3.2:3b"),
                ModelDescriptor::new("ollama/llama3.2:1b"),
            ],
            files: HashSet::new(),
            failing: HashSet::new(),
            hang_on_send: false,
            replies: Mutex::new(VecDeque::new()),
            tool_groups: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
            turns: Mutex::new(Vec::new()),
        }
    }

    /// Replace the model catalog
    #[must_use]
    pub fn with_models(mut self, models: Vec<ModelDescriptor>) -> Self {
        self.models = models;
        self
    }

    /// Treat `path` as an existing local file
    #[must_use]
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.files.insert(path.into());
        self
    }

    /// Make `operation` fail with an HTTP 500
    #[must_use]
    pub fn failing(mut self, operation: Operation) -> Self {
        self.failing.insert(operation);
        self
    }

    /// Make `send_turn` never complete
    #[must_use]
    pub fn hanging_turns(mut self) -> Self {
        self.hang_on_send = true;
        self
    }

    /// Queue a payload for the next fetched response. With the queue empty,
    /// replies echo the input.
    #[must_use]
    pub fn with_reply(self, payload: RawResponsePayload) -> Self {
        lock(&self.replies).push_back(payload);
        self
    }

    /// Every operation invoked so far, in order
    pub fn calls(&self) -> Vec<Operation> {
        lock(&self.calls).clone()
    }

    /// Every turn request received so far
    pub fn turns(&self) -> Vec<TurnRequest> {
        lock(&self.turns).clone()
    }

    fn enter(&self, operation: Operation) -> Result<()> {
        lock(&self.calls).push(operation);
        if self.failing.contains(&operation) {
            return Err(AgentError::Http {
                status: 500,
                body: format!("{operation} failed"),
            });
        }
        Ok(())
    }

    fn new_id(prefix: &str) -> String {
        format!("{prefix}_{}", Uuid::new_v4().simple())
    }
}

#[async_trait]
impl PlatformClient for MockPlatform {
    async fn list_models(&self) -> Result<Vec<ModelDescriptor>> {
        self.enter(Operation::ListModels)?;
        Ok(self.models.clone())
    }

    async fn list_tool_groups(&self) -> Result<Vec<ToolGroupDescriptor>> {
        self.enter(Operation::ListToolGroups)?;
        Ok(lock(&self.tool_groups).clone())
    }

    async fn create_vector_store(&self, name: &str) -> Result<VectorStoreHandle> {
        self.enter(Operation::CreateVectorStore)?;
        Ok(VectorStoreHandle {
            id: Self::new_id("vs"),
            name: name.to_owned(),
        })
    }

    async fn upload_file(&self, path: &Path) -> Result<FileHandle> {
        self.enter(Operation::UploadFile)?;
        if !self.files.contains(path) {
            return Err(AgentError::NotFound(path.to_path_buf()));
        }
        Ok(FileHandle {
            id: Self::new_id("file"),
            filename: path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
        })
    }

    async fn attach_file(&self, _store_id: &str, _file_id: &str) -> Result<()> {
        self.enter(Operation::AttachFile)
    }

    async fn register_tool_group(&self, registration: &ToolGroupRegistration) -> Result<()> {
        self.enter(Operation::RegisterToolGroup)?;
        let mut groups = lock(&self.tool_groups);
        if !groups.iter().any(|g| g.identifier == registration.group_id) {
            groups.push(ToolGroupDescriptor {
                identifier: registration.group_id.clone(),
                provider_id: Some(registration.provider_id.clone()),
            });
        }
        Ok(())
    }

    async fn create_agent(&self, _spec: &AgentSpec) -> Result<AgentHandle> {
        self.enter(Operation::CreateAgent)?;
        Ok(AgentHandle {
            agent_id: Self::new_id("agent"),
        })
    }

    async fn create_session(&self, _agent_id: &str, _name: &str) -> Result<SessionHandle> {
        self.enter(Operation::CreateSession)?;
        Ok(SessionHandle {
            session_id: Self::new_id("session"),
        })
    }

    async fn send_turn(&self, request: &TurnRequest) -> Result<ResponseHandle> {
        self.enter(Operation::SendTurn)?;
        if self.hang_on_send {
            std::future::pending::<()>().await;
        }
        lock(&self.turns).push(request.clone());
        Ok(ResponseHandle {
            id: Self::new_id("resp"),
        })
    }

    async fn fetch_response(&self, handle: &ResponseHandle) -> Result<RawResponsePayload> {
        self.enter(Operation::FetchResponse)?;
        if let Some(payload) = lock(&self.replies).pop_front() {
            return Ok(payload);
        }
        let echo = lock(&self.turns)
            .last()
            .map(|turn| format!("You said: {}", turn.input))
            .unwrap_or_default();
        Ok(RawResponsePayload::new(
            handle.id.clone(),
            vec![OutputItem::message_text(&echo)],
        ))
    }

    fn name(&self) -> &str {
        "Mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_failure_is_logged() {
        let mock = MockPlatform::new().failing(Operation::ListModels);
        assert!(mock.list_models().await.is_err());
        assert_eq!(mock.calls(), vec![Operation::ListModels]);
    }

    #[tokio::test]
    async fn test_upload_missing_file() {
        let mock = MockPlatform::new().with_file("present.txt");
        let err = mock.upload_file(Path::new("absent.txt")).await.unwrap_err();
        assert!(err.is_not_found());

        let file = mock.upload_file(Path::new("present.txt")).await.unwrap();
        assert_eq!(file.filename, "present.txt");
    }

    #[tokio::test]
    async fn test_register_is_idempotent() {
        let mock = MockPlatform::new();
        let registration = ToolGroupRegistration {
            group_id: "electroshop-db".into(),
            provider_id: "model-context-protocol".into(),
            endpoint_uri: "http://127.0.0.1:8000/mcp".into(),
        };
        mock.register_tool_group(&registration).await.unwrap();
        mock.register_tool_group(&registration).await.unwrap();
        assert_eq!(mock.list_tool_groups().await.unwrap().len(), 1);
    }
}
