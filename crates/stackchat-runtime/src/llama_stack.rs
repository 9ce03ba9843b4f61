//! Llama Stack Platform Client
//!
//! Implementation of `PlatformClient` over the Llama Stack REST API.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Serialize};
use stackchat_core::{
    error::{AgentError, Result},
    platform::{
        AgentHandle, AgentSpec, FileHandle, ModelDescriptor, PlatformClient, ResponseHandle,
        SessionHandle, ToolGroupDescriptor, ToolGroupRegistration, TurnRequest,
        VectorStoreHandle,
    },
    response::RawResponsePayload,
};

/// Llama Stack connection configuration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LlamaStackConfig {
    /// Base URL, without the `/v1` prefix
    pub base_url: String,

    /// Sent as a bearer token
    pub api_key: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for LlamaStackConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8321".into(),
            api_key: "none".into(),
            timeout_secs: 120,
        }
    }
}

impl LlamaStackConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(url) = lookup("LLAMA_STACK_BASE_URL") {
            config.base_url = url;
        }
        if let Some(key) = lookup("LLAMA_STACK_API_KEY") {
            config.api_key = key;
        }
        if let Some(raw) = lookup("LLAMA_STACK_TIMEOUT_SECS") {
            config.timeout_secs = raw.trim().parse().map_err(|_| {
                AgentError::Config(format!(
                    "LLAMA_STACK_TIMEOUT_SECS must be a number, got {raw:?}"
                ))
            })?;
        }
        Ok(config)
    }
}

#[derive(Deserialize)]
struct DataList<T> {
    data: Vec<T>,
}

#[derive(Serialize)]
struct CreateVectorStoreBody<'a> {
    name: &'a str,
}

#[derive(Serialize)]
struct AttachFileBody<'a> {
    file_id: &'a str,
}

#[derive(Serialize)]
struct McpEndpoint<'a> {
    uri: &'a str,
}

#[derive(Serialize)]
struct RegisterToolGroupBody<'a> {
    toolgroup_id: &'a str,
    provider_id: &'a str,
    mcp_endpoint: McpEndpoint<'a>,
}

impl<'a> From<&'a ToolGroupRegistration> for RegisterToolGroupBody<'a> {
    fn from(registration: &'a ToolGroupRegistration) -> Self {
        Self {
            toolgroup_id: &registration.group_id,
            provider_id: &registration.provider_id,
            mcp_endpoint: McpEndpoint {
                uri: &registration.endpoint_uri,
            },
        }
    }
}

#[derive(Serialize)]
struct AgentConfigBody<'a> {
    model: &'a str,
    instructions: &'a str,
    enable_session_persistence: bool,
    max_infer_iters: u32,
}

#[derive(Serialize)]
struct CreateAgentBody<'a> {
    agent_config: AgentConfigBody<'a>,
}

impl<'a> From<&'a AgentSpec> for CreateAgentBody<'a> {
    fn from(spec: &'a AgentSpec) -> Self {
        Self {
            agent_config: AgentConfigBody {
                model: &spec.model,
                instructions: &spec.instructions,
                enable_session_persistence: spec.enable_session_persistence,
                max_infer_iters: spec.max_tool_iterations,
            },
        }
    }
}

#[derive(Serialize)]
struct CreateSessionBody<'a> {
    session_name: &'a str,
}

#[derive(Serialize)]
struct TurnMetadata<'a> {
    agent_id: &'a str,
    session_id: &'a str,
}

#[derive(Serialize)]
struct CreateResponseBody<'a> {
    model: &'a str,
    input: &'a str,
    instructions: &'a str,
    store: bool,
    metadata: TurnMetadata<'a>,
}

impl<'a> From<&'a TurnRequest> for CreateResponseBody<'a> {
    fn from(request: &'a TurnRequest) -> Self {
        Self {
            model: &request.model,
            input: &request.input,
            instructions: &request.instructions,
            store: true,
            metadata: TurnMetadata {
                agent_id: &request.agent_id,
                session_id: &request.session_id,
            },
        }
    }
}

/// Llama Stack platform client
pub struct LlamaStackClient {
    http: reqwest::Client,
    config: LlamaStackConfig,
}

impl LlamaStackClient {
    /// Create from configuration
    pub fn from_config(config: LlamaStackConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AgentError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, config })
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_config(LlamaStackConfig::from_env()?)
    }

    /// Create with default localhost settings
    pub fn localhost() -> Result<Self> {
        Self::from_config(LlamaStackConfig::default())
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/v1/{}",
            self.config.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Send a request and turn non-2xx statuses into errors
    async fn execute(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let response = request
            .bearer_auth(&self.config.api_key)
            .send()
            .await
            .map_err(|e| AgentError::Connection(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        tracing::debug!(%status, %body, "Platform returned an error");
        Err(AgentError::Http {
            status: status.as_u16(),
            body,
        })
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        response
            .json()
            .await
            .map_err(|e| AgentError::Decode(e.to_string()))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.url(path);
        tracing::debug!(%url, "GET");
        let response = self.execute(self.http.get(&url)).await?;
        Self::decode(response).await
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let url = self.url(path);
        tracing::debug!(%url, "POST");
        let response = self.execute(self.http.post(&url).json(body)).await?;
        Self::decode(response).await
    }
}

#[async_trait]
impl PlatformClient for LlamaStackClient {
    async fn list_models(&self) -> Result<Vec<ModelDescriptor>> {
        let list: DataList<ModelDescriptor> = self.get("models").await?;
        Ok(list.data)
    }

    async fn list_tool_groups(&self) -> Result<Vec<ToolGroupDescriptor>> {
        let list: DataList<ToolGroupDescriptor> = self.get("toolgroups").await?;
        Ok(list.data)
    }

    async fn create_vector_store(&self, name: &str) -> Result<VectorStoreHandle> {
        self.post("vector_stores", &CreateVectorStoreBody { name }).await
    }

    async fn upload_file(&self, path: &Path) -> Result<FileHandle> {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(AgentError::NotFound(path.to_path_buf()));
            }
            Err(e) => return Err(e.into()),
        };
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".into());

        let form = Form::new()
            .part("file", Part::bytes(bytes).file_name(filename))
            .text("purpose", "assistants");

        let url = self.url("files");
        tracing::debug!(%url, file = %path.display(), "POST multipart");
        let response = self.execute(self.http.post(&url).multipart(form)).await?;
        Self::decode(response).await
    }

    async fn attach_file(&self, store_id: &str, file_id: &str) -> Result<()> {
        let path = format!("vector_stores/{store_id}/files");
        let _: IgnoredAny = self.post(&path, &AttachFileBody { file_id }).await?;
        Ok(())
    }

    async fn register_tool_group(&self, registration: &ToolGroupRegistration) -> Result<()> {
        let url = self.url("toolgroups");
        tracing::debug!(%url, group = %registration.group_id, "POST");
        let body = RegisterToolGroupBody::from(registration);
        // the platform answers with an empty body
        self.execute(self.http.post(&url).json(&body)).await?;
        Ok(())
    }

    async fn create_agent(&self, spec: &AgentSpec) -> Result<AgentHandle> {
        self.post("agents", &CreateAgentBody::from(spec)).await
    }

    async fn create_session(&self, agent_id: &str, name: &str) -> Result<SessionHandle> {
        let path = format!("agents/{agent_id}/session");
        self.post(&path, &CreateSessionBody { session_name: name }).await
    }

    async fn send_turn(&self, request: &TurnRequest) -> Result<ResponseHandle> {
        self.post("responses", &CreateResponseBody::from(request)).await
    }

    async fn fetch_response(&self, handle: &ResponseHandle) -> Result<RawResponsePayload> {
        self.get(&format!("responses/{}", handle.id)).await
    }

    fn name(&self) -> &str {
        "Llama Stack"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = LlamaStackConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.base_url, "http://localhost:8321");
        assert_eq!(config.api_key, "none");
        assert_eq!(config.timeout_secs, 120);
    }

    #[test]
    fn test_config_rejects_bad_timeout() {
        let err = LlamaStackConfig::from_lookup(|key| {
            (key == "LLAMA_STACK_TIMEOUT_SECS").then(|| "soon".to_owned())
        })
        .unwrap_err();
        assert!(matches!(err, AgentError::Config(_)));
    }

    #[test]
    fn test_url_joining() {
        let client = LlamaStackClient::from_config(LlamaStackConfig {
            base_url: "http://stack:8321/".into(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(client.url("models"), "http://stack:8321/v1/models");
        assert_eq!(client.url("/responses/r1"), "http://stack:8321/v1/responses/r1");
    }

    #[test]
    fn test_register_body() {
        let registration = ToolGroupRegistration {
            group_id: "electroshop-db".into(),
            provider_id: "model-context-protocol".into(),
            endpoint_uri: "http://127.0.0.1:8000/mcp".into(),
        };
        let body = serde_json::to_value(RegisterToolGroupBody::from(&registration)).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "toolgroup_id": "electroshop-db",
                "provider_id": "model-context-protocol",
                "mcp_endpoint": {"uri": "http://127.0.0.1:8000/mcp"}
            })
        );
    }

    #[test]
    fn test_agent_and_turn_bodies() {
        let spec = AgentSpec {
            model: "ollama/llama3.2:3b".into(),
            instructions: "be helpful".into(),
            max_tool_iterations: 5,
            enable_session_persistence: true,
        };
        let body = serde_json::to_value(CreateAgentBody::from(&spec)).unwrap();
        assert_eq!(body["agent_config"]["max_infer_iters"], 5);
        assert_eq!(body["agent_config"]["enable_session_persistence"], true);

        let turn = TurnRequest {
            model: "ollama/llama3.2:1b".into(),
            agent_id: "agent_1".into(),
            session_id: "session_1".into(),
            instructions: "use the knowledge base".into(),
            input: "hello".into(),
        };
        let body = serde_json::to_value(CreateResponseBody::from(&turn)).unwrap();
        assert_eq!(body["store"], true);
        assert_eq!(body["input"], "hello");
        assert_eq!(body["metadata"]["session_id"], "session_1");
    }

    #[test]
    fn test_model_list_decoding() {
        let list: DataList<ModelDescriptor> = serde_json::from_str(
            r#"{"data": [
                {"identifier": "ollama/llama3.2:3b", "provider_id": "ollama", "model_type": "llm", "metadata": {}},
                {"identifier": "all-MiniLM-L6-v2", "model_type": "embedding"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(list.data.len(), 2);
        assert_eq!(list.data[0].provider_id.as_deref(), Some("ollama"));
        assert_eq!(list.data[1].provider_id, None);
    }

    #[tokio::test]
    async fn test_missing_upload_is_not_found() {
        let client = LlamaStackClient::localhost().unwrap();
        let err = client
            .upload_file(Path::new("definitely/not/here.txt"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    /// Serve one canned HTTP response on a local port
    async fn stub_server(status_line: &'static str, body: &'static str) -> LlamaStackClient {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await.unwrap();

            let response = format!(
                "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
        });

        LlamaStackClient::from_config(LlamaStackConfig {
            base_url: format!("http://{addr}"),
            ..LlamaStackConfig::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_error_status_maps_to_http() {
        let client = stub_server("503 Service Unavailable", r#"{"detail":"busy"}"#).await;
        match client.list_models().await {
            Err(AgentError::Http { status, body }) => {
                assert_eq!(status, 503);
                assert!(body.contains("busy"));
            }
            other => panic!("expected HTTP error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_success_status_is_decoded() {
        let client =
            stub_server("200 OK", r#"{"data": [{"identifier": "ollama/llama3.2:3b"}]}"#).await;
        let models = client.list_models().await.unwrap();
        assert_eq!(models.len(), 1);
        assert_eq!(models[0].identifier, "ollama/llama3.2:3b");
    }

    #[tokio::test]
    async fn test_unreachable_platform_maps_to_connection() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = LlamaStackClient::from_config(LlamaStackConfig {
            base_url: format!("http://{addr}"),
            ..LlamaStackConfig::default()
        })
        .unwrap();
        let err = client.list_models().await.unwrap_err();
        assert!(matches!(err, AgentError::Connection(_)), "{err:?}");
    }
}
