//! Setup Pipeline
//!
//! Provisions everything a chat needs, strictly in order:
//!
//! 1. list models            (fatal)
//! 2. create vector store    (fatal), seed the optional document (soft)
//! 3. register tool group    (soft)
//! 4. create agent           (fatal)
//! 5. create session         (fatal)
//!
//! A fatal failure stops the run before the next stage is attempted. A soft
//! failure is reported, recorded as a [`SetupWarning`] and leaves the matching
//! capability flag off.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use crate::config::SetupConfig;
use crate::error::{AgentError, Result, SetupError, SetupWarning};
use crate::platform::{AgentSpec, ModelDescriptor, PlatformClient, VectorStoreHandle};
use crate::session::{AGENT_INSTRUCTIONS, CapabilityFlags, ConversationState};

/// Provisioning stages, in execution order
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SetupStage {
    ListModels,
    VectorStore,
    Document,
    ToolGroup,
    CreateAgent,
    CreateSession,
}

impl std::fmt::Display for SetupStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::ListModels => "list models",
            Self::VectorStore => "create vector store",
            Self::Document => "seed document",
            Self::ToolGroup => "register tool group",
            Self::CreateAgent => "create agent",
            Self::CreateSession => "create session",
        };
        f.write_str(name)
    }
}

/// Everything setup produced
#[derive(Debug)]
pub struct SetupOutcome {
    pub state: ConversationState,
    pub models: Vec<ModelDescriptor>,
    pub vector_store: VectorStoreHandle,
    pub warnings: Vec<SetupWarning>,
}

pub struct SetupPipeline {
    client: Arc<dyn PlatformClient>,
    config: SetupConfig,
}

impl SetupPipeline {
    pub fn new(client: Arc<dyn PlatformClient>, config: SetupConfig) -> Self {
        Self { client, config }
    }

    /// Run every stage, writing progress lines to `out`
    pub async fn run<W: Write>(
        &self,
        out: &mut W,
    ) -> std::result::Result<SetupOutcome, SetupError> {
        let mut warnings = Vec::new();

        let stage = SetupStage::ListModels;
        let models = self
            .list_models(out, &mut warnings)
            .await
            .map_err(|e| fail(out, stage, e))?;

        let stage = SetupStage::VectorStore;
        let vector_store = self
            .create_vector_store(out)
            .await
            .map_err(|e| fail(out, stage, e))?;

        let stage = SetupStage::Document;
        let rag_available = self
            .seed_document(&vector_store, out, &mut warnings)
            .await
            .map_err(|e| fail(out, stage, e))?;

        let stage = SetupStage::ToolGroup;
        let tools_available = self
            .register_tool_group(out, &mut warnings)
            .await
            .map_err(|e| fail(out, stage, e))?;

        let stage = SetupStage::CreateAgent;
        let agent_id = self
            .create_agent(tools_available, out, &mut warnings)
            .await
            .map_err(|e| fail(out, stage, e))?;

        let stage = SetupStage::CreateSession;
        let session_id = self
            .create_session(&agent_id, out)
            .await
            .map_err(|e| fail(out, stage, e))?;

        let capabilities = CapabilityFlags {
            rag_available,
            tools_available,
        };
        tracing::info!(
            rag = capabilities.rag_available,
            tools = capabilities.tools_available,
            warnings = warnings.len(),
            "Setup complete"
        );

        Ok(SetupOutcome {
            state: ConversationState::new(agent_id, session_id, capabilities),
            models,
            vector_store,
            warnings,
        })
    }

    async fn list_models<W: Write>(
        &self,
        out: &mut W,
        warnings: &mut Vec<SetupWarning>,
    ) -> Result<Vec<ModelDescriptor>> {
        writeln!(out, "🔍 Step 1: Listing available models...")?;

        let models = self.client.list_models().await?;
        writeln!(out, "Found {} models:", models.len())?;
        for model in &models {
            writeln!(out, "  ✓ {}", model.identifier)?;
        }
        writeln!(out)?;

        let wanted = &self.config.agent_model;
        if !models.is_empty() && !models.iter().any(|m| &m.identifier == wanted) {
            degrade(
                out,
                warnings,
                SetupStage::ListModels,
                format!("Model {wanted} is not in the catalog, agent creation may fail"),
            )?;
        }
        Ok(models)
    }

    async fn create_vector_store<W: Write>(&self, out: &mut W) -> Result<VectorStoreHandle> {
        writeln!(out, "📚 Step 2: Setting up RAG system...")?;
        let name = &self.config.vector_store_name;
        writeln!(out, "📦 Creating vector store: {name}...")?;

        let store = self.client.create_vector_store(name).await?;
        writeln!(
            out,
            "  ✓ Created vector store: {} (ID: {})\n",
            store.name, store.id
        )?;
        tracing::info!(id = %store.id, "Vector store created");
        Ok(store)
    }

    /// Returns whether the document ended up attached. Upload and attach
    /// failures are soft; only console write errors come back as `Err`.
    async fn seed_document<W: Write>(
        &self,
        store: &VectorStoreHandle,
        out: &mut W,
        warnings: &mut Vec<SetupWarning>,
    ) -> Result<bool> {
        let stage = SetupStage::Document;
        let Some(path) = self.config.document.as_deref() else {
            degrade(out, warnings, stage, "No document configured, continuing without RAG data")?;
            return Ok(false);
        };

        match self.upload_and_attach(store, path, out).await {
            Ok(()) => Ok(true),
            Err(AgentError::NotFound(_)) => {
                degrade(
                    out,
                    warnings,
                    stage,
                    format!("File {} not found, continuing without RAG data", path.display()),
                )?;
                Ok(false)
            }
            Err(e) => {
                writeln!(out, "❌ Error seeding {}: {e}", path.display())?;
                degrade(out, warnings, stage, format!("{e}; continuing without RAG data"))?;
                Ok(false)
            }
        }
    }

    async fn upload_and_attach<W: Write>(
        &self,
        store: &VectorStoreHandle,
        path: &Path,
        out: &mut W,
    ) -> Result<()> {
        writeln!(out, "📁 Uploading file: {}...", path.display())?;
        let file = self.client.upload_file(path).await?;
        writeln!(out, "  ✓ File uploaded: {} (ID: {})", file.filename, file.id)?;

        writeln!(out, "🔗 Adding file to vector store...")?;
        self.client.attach_file(&store.id, &file.id).await?;
        writeln!(out, "  ✓ File added to vector store successfully\n")?;
        tracing::info!(file = %file.id, store = %store.id, "Document attached");
        Ok(())
    }

    async fn register_tool_group<W: Write>(
        &self,
        out: &mut W,
        warnings: &mut Vec<SetupWarning>,
    ) -> Result<bool> {
        let registration = &self.config.tool_group;
        writeln!(out, "🛠️  Step 3: Setting up MCP integration...")?;
        writeln!(out, "🛠️  Registering tool group {}...", registration.group_id)?;

        match self.client.register_tool_group(registration).await {
            Ok(()) => {
                writeln!(out, "  ✓ MCP tool group registered: {}\n", registration.group_id)?;
                tracing::info!(group = %registration.group_id, "Tool group registered");
                Ok(true)
            }
            Err(e) => {
                writeln!(out, "❌ Error setting up MCP: {e}")?;
                degrade(
                    out,
                    warnings,
                    SetupStage::ToolGroup,
                    format!(
                        "Continuing without MCP tools (make sure the MCP server is running at {})",
                        registration.endpoint_uri
                    ),
                )?;
                Ok(false)
            }
        }
    }

    async fn create_agent<W: Write>(
        &self,
        tools_available: bool,
        out: &mut W,
        warnings: &mut Vec<SetupWarning>,
    ) -> Result<String> {
        writeln!(out, "🤖 Step 4: Creating conversational agent...")?;

        match self.client.list_tool_groups().await {
            Ok(groups) => {
                tracing::debug!(count = groups.len(), "Tool groups listed");
            }
            Err(e) => degrade(
                out,
                warnings,
                SetupStage::CreateAgent,
                format!("Could not list tool groups: {e}"),
            )?,
        }
        if tools_available {
            writeln!(
                out,
                "   🛠️  MCP tool group available: {}",
                self.config.tool_group.group_id
            )?;
        }

        let spec = AgentSpec {
            model: self.config.agent_model.clone(),
            instructions: AGENT_INSTRUCTIONS.into(),
            max_tool_iterations: self.config.max_tool_iterations,
            enable_session_persistence: true,
        };
        let agent = self.client.create_agent(&spec).await?;
        writeln!(out, "  ✓ Agent created: {}\n", agent.agent_id)?;
        tracing::info!(agent = %agent.agent_id, model = %spec.model, "Agent created");
        Ok(agent.agent_id)
    }

    async fn create_session<W: Write>(&self, agent_id: &str, out: &mut W) -> Result<String> {
        writeln!(out, "🗣️  Step 5: Creating agent session...")?;
        let session = self
            .client
            .create_session(agent_id, &self.config.session_name)
            .await?;
        writeln!(out, "  ✓ Session created: {}\n", session.session_id)?;
        tracing::info!(session = %session.session_id, "Session created");
        Ok(session.session_id)
    }
}

fn fail<W: Write>(out: &mut W, stage: SetupStage, source: AgentError) -> SetupError {
    tracing::error!(%stage, error = %source, "Setup stage failed");
    // the stage error is what matters; a broken console must not mask it
    writeln!(out, "❌ Error during {stage}: {source}").ok();
    SetupError::new(stage, source)
}

fn degrade<W: Write>(
    out: &mut W,
    warnings: &mut Vec<SetupWarning>,
    stage: SetupStage,
    cause: impl Into<String>,
) -> Result<()> {
    let warning = SetupWarning::new(stage, cause);
    tracing::warn!(%stage, cause = %warning.cause, "Setup degraded");
    writeln!(out, "⚠️  {}", warning.cause)?;
    warnings.push(warning);
    Ok(())
}
