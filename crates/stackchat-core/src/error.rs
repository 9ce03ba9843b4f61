//! Error Types

use std::path::PathBuf;

use thiserror::Error;

use crate::setup::SetupStage;

/// Result type alias for facade and session operations
pub type Result<T> = std::result::Result<T, AgentError>;

/// Errors raised by the remote platform facade and local plumbing
#[derive(Error, Debug)]
pub enum AgentError {
    /// Non-2xx response from the platform
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Platform unreachable or the transport failed mid-request
    #[error("Connection error: {0}")]
    Connection(String),

    /// A local file the caller asked for does not exist
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Platform answered with a body we could not interpret
    #[error("Decode error: {0}")]
    Decode(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other/unknown error
    #[error("{0}")]
    Other(String),
}

impl AgentError {
    /// True when the error means "the local file is absent"
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Convert to a one-line user-facing message
    pub fn user_message(&self) -> String {
        match self {
            Self::Http { status, body } if body.is_empty() => {
                format!("The platform rejected the request (HTTP {status}).")
            }
            Self::Http { status, body } => {
                format!("The platform rejected the request (HTTP {status}): {body}")
            }
            Self::Connection(_) => {
                "The inference platform is unreachable. Is it running?".into()
            }
            Self::NotFound(path) => format!("File {} not found.", path.display()),
            Self::Decode(msg) => format!("The platform sent an unexpected response: {msg}"),
            Self::Config(msg) => format!("Invalid configuration: {msg}"),
            _ => self.to_string(),
        }
    }
}

/// A provisioning stage failed and the run must stop
#[derive(Error, Debug)]
#[error("{stage} failed: {source}")]
pub struct SetupError {
    pub stage: SetupStage,
    #[source]
    pub source: AgentError,
}

impl SetupError {
    pub const fn new(stage: SetupStage, source: AgentError) -> Self {
        Self { stage, source }
    }
}

/// A provisioning stage failed softly; the run continues with less capability
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SetupWarning {
    pub stage: SetupStage,
    pub cause: String,
}

impl SetupWarning {
    pub fn new(stage: SetupStage, cause: impl Into<String>) -> Self {
        Self {
            stage,
            cause: cause.into(),
        }
    }
}

impl std::fmt::Display for SetupWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.stage, self.cause)
    }
}
