//! # stackchat-runtime
//!
//! Platform clients for the stackchat system.
//!
//! ## Platforms
//!
//! - **Llama Stack** (default): models, vector stores, tool groups, agents
//!   and the Responses API over HTTP
//!
//! ## Usage
//!
//! ```rust,ignore
//! use stackchat_core::{SetupConfig, SetupPipeline};
//! use stackchat_runtime::LlamaStackClient;
//!
//! let client = Arc::new(LlamaStackClient::from_env()?);
//! let outcome = SetupPipeline::new(client, SetupConfig::from_env()?)
//!     .run(&mut std::io::stdout())
//!     .await?;
//! ```

#[cfg(feature = "llama-stack")]
pub mod llama_stack;

#[cfg(feature = "llama-stack")]
pub use llama_stack::{LlamaStackClient, LlamaStackConfig};

