//! # stackchat-core
//!
//! Setup pipeline, response resolution and conversation state for a chat
//! client driving a remote inference platform.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         ChatLoop                             │
//! │  ┌───────────────┐  ┌──────────────┐  ┌──────────────────┐   │
//! │  │ SetupPipeline │  │   resolve    │  │ ConversationState│   │
//! │  │  (run once)   │  │  (per turn)  │  │  (turn history)  │   │
//! │  └───────┬───────┘  └──────────────┘  └──────────────────┘   │
//! │          └────────────────┬──────────────────┘               │
//! │                    PlatformClient (facade)                   │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The `PlatformClient` trait is the only way the core reaches the platform;
//! `stackchat-runtime` provides the HTTP implementation and [`MockPlatform`]
//! an in-memory one.

pub mod chat;
pub mod config;
pub mod error;
pub mod message;
pub mod platform;
pub mod response;
pub mod session;
pub mod setup;

pub use chat::{ChatLoop, Command, LoopState};
pub use config::SetupConfig;
pub use error::{AgentError, Result, SetupError, SetupWarning};
pub use message::{Conversation, ConversationTurn, Role, TurnKind};
pub use platform::{MockPlatform, PlatformClient};
pub use response::{Outcome, RawResponsePayload, ResolvedReply, resolve};
pub use session::{CapabilityFlags, ConversationState, Instructions};
pub use setup::{SetupOutcome, SetupPipeline, SetupStage};
