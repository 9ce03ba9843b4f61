//! stackchat
//!
//! Provisions a RAG knowledge base, an MCP tool group, an agent and a session
//! on a Llama Stack server, then chats with it on the terminal.

mod state;

use std::io::Write;
use std::process::ExitCode;

use tokio::io::BufReader;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stackchat_core::{ChatLoop, SetupPipeline};

use crate::state::AppContext;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<ExitCode> {
    // Load environment first so RUST_LOG from .env applies
    dotenvy::dotenv().ok();

    // Initialize tracing; stdout belongs to the chat
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut stdout = std::io::stdout();
    writeln!(stdout, "🚀 LlamaStack Rust Client - RAG + MCP Demo")?;
    writeln!(stdout, "=========================================")?;

    let context = AppContext::from_env()?;

    let pipeline = SetupPipeline::new(context.client.clone(), context.setup.clone());
    let outcome = match pipeline.run(&mut stdout).await {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!(stage = %e.stage, "Setup aborted");
            return Ok(ExitCode::FAILURE);
        }
    };
    if !outcome.warnings.is_empty() {
        writeln!(
            stdout,
            "⚠️  Setup finished with {} warning(s)",
            outcome.warnings.len()
        )?;
    }

    writeln!(stdout, "💬 Step 6: Starting interactive chat...")?;
    let mut chat = ChatLoop::new(
        context.client,
        context.setup.response_model,
        outcome.state,
    );
    let input = BufReader::new(tokio::io::stdin());
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Cannot listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    if let Err(e) = chat.run(input, &mut stdout, shutdown).await {
        writeln!(stdout, "❌ Error in chat: {e}")?;
        return Ok(ExitCode::FAILURE);
    }

    writeln!(stdout, "🎉 Demo completed successfully!")?;
    Ok(ExitCode::SUCCESS)
}
