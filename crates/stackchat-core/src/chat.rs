//! Interactive Chat Loop
//!
//! Read a line, send it as a turn, resolve the reply, print it, repeat.
//!
//! ```text
//!            ┌──── empty / clear ────┐
//!            ▼                       │
//!   ──▶  Reading ────────────────────┘
//!          │  ▲
//!     line │  │ reply printed / error reported
//!          ▼  │
//!        Resolving
//!
//!   exit, end of input or shutdown ──▶ done
//! ```

use std::future::Future;
use std::io::Write;
use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::error::Result;
use crate::message::ConversationTurn;
use crate::platform::{PlatformClient, TurnRequest};
use crate::response::ResolvedReply;
use crate::session::ConversationState;

const TOOL_PLACEHOLDER: &str = "🛠️  Executing tools...";
const NO_TEXT_PLACEHOLDER: &str = "(No text response available)";

/// A parsed input line
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Exit,
    Clear,
    Empty,
    Chat(String),
}

impl Command {
    pub fn parse(line: &str) -> Self {
        match line.trim() {
            "" => Self::Empty,
            "exit" => Self::Exit,
            "clear" => Self::Clear,
            text => Self::Chat(text.to_owned()),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopState {
    /// Waiting for the next input line
    Reading,
    /// A turn is in flight
    Resolving,
}

pub struct ChatLoop {
    client: Arc<dyn PlatformClient>,
    model: String,
    state: ConversationState,
    loop_state: LoopState,
}

impl ChatLoop {
    /// `model` is the model each turn's response is generated with
    pub fn new(
        client: Arc<dyn PlatformClient>,
        model: impl Into<String>,
        state: ConversationState,
    ) -> Self {
        Self {
            client,
            model: model.into(),
            state,
            loop_state: LoopState::Reading,
        }
    }

    pub const fn state(&self) -> &ConversationState {
        &self.state
    }

    pub const fn loop_state(&self) -> LoopState {
        self.loop_state
    }

    /// Run until `exit`, end of input, or `shutdown` completes.
    ///
    /// A round cut short by `shutdown` records nothing.
    /// A line that is not valid UTF-8 is reported and skipped.
    pub async fn run<R, W, S>(&mut self, mut input: R, out: &mut W, shutdown: S) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: Write,
        S: Future<Output = ()>,
    {
        self.print_banner(out)?;

        let mut buf = Vec::new();
        tokio::pin!(shutdown);

        loop {
            self.loop_state = LoopState::Reading;
            write!(out, "\n🗨️  You: ")?;
            out.flush()?;

            buf.clear();
            let read = tokio::select! {
                () = &mut shutdown => {
                    writeln!(out, "\n👋 Interrupted, goodbye!")?;
                    break;
                }
                read = input.read_until(b'\n', &mut buf) => read?,
            };
            if read == 0 {
                writeln!(out)?;
                tracing::debug!("End of input");
                break;
            }
            let Ok(line) = std::str::from_utf8(&buf) else {
                tracing::warn!(bytes = buf.len(), "Input line is not valid UTF-8");
                writeln!(out, "⚠️  Ignoring input that is not valid UTF-8")?;
                continue;
            };

            match Command::parse(line) {
                Command::Empty => {}
                Command::Exit => {
                    writeln!(out, "👋 Goodbye!")?;
                    break;
                }
                Command::Clear => {
                    self.state.clear();
                    writeln!(out, "🧹 Conversation history cleared")?;
                }
                Command::Chat(text) => {
                    self.loop_state = LoopState::Resolving;
                    let round = tokio::select! {
                        () = &mut shutdown => {
                            tracing::debug!("Round cancelled");
                            writeln!(out, "\n👋 Interrupted, goodbye!")?;
                            break;
                        }
                        round = self.round(&text) => round,
                    };
                    match round {
                        Ok(reply) => present(&reply, out)?,
                        Err(e) => {
                            tracing::warn!(error = %e, "Turn failed");
                            writeln!(out, "❌ Error: {}", e.user_message())?;
                        }
                    }
                }
            }
        }

        self.loop_state = LoopState::Reading;
        Ok(())
    }

    /// Send one input and record the round.
    ///
    /// The user turn and its reply are recorded together once the reply is
    /// resolved. Only a text reply adds an assistant turn. On error nothing
    /// is recorded.
    pub async fn round(&mut self, text: &str) -> Result<ResolvedReply> {
        let reply = self.exchange(text).await?;

        let assistant = reply.text().map(ConversationTurn::assistant);
        self.state.record_round(ConversationTurn::user(text), assistant);
        Ok(reply)
    }

    async fn exchange(&self, text: &str) -> Result<ResolvedReply> {
        let request = TurnRequest {
            model: self.model.clone(),
            agent_id: self.state.agent_id().to_owned(),
            session_id: self.state.session_id().to_owned(),
            instructions: self.state.instructions().to_owned(),
            input: text.to_owned(),
        };

        let handle = self.client.send_turn(&request).await?;
        tracing::debug!(response = %handle.id, "Response created");

        let payload = self.client.fetch_response(&handle).await?;
        tracing::debug!(response = %payload.id, items = payload.output.len(), "Response fetched");

        Ok(payload.resolve())
    }

    fn print_banner<W: Write>(&self, out: &mut W) -> Result<()> {
        let flags = self.state.capabilities();
        let mark = |on: bool| if on { "✓" } else { "✗" };

        writeln!(out, "🎉 Starting interactive chat with RAG + MCP support!")?;
        writeln!(
            out,
            "   RAG {}  |  MCP tools {}",
            mark(flags.rag_available),
            mark(flags.tools_available)
        )?;
        writeln!(out, "Type 'exit' to quit, 'clear' to clear conversation history")?;
        writeln!(out, "Examples:")?;
        writeln!(out, "- Tell me about ElectroShop's history")?;
        writeln!(out, "- List all customers in the database")?;
        writeln!(out, "- Add a new customer named John Smith")?;
        writeln!(out, "=====================================")?;
        Ok(())
    }
}

fn present<W: Write>(reply: &ResolvedReply, out: &mut W) -> Result<()> {
    write!(out, "🤖 Assistant: ")?;
    match reply {
        ResolvedReply::Text(text) => writeln!(out, "{text}")?,
        ResolvedReply::ToolCall { kind } => {
            tracing::info!(%kind, "Assistant invoked a tool");
            writeln!(out, "{TOOL_PLACEHOLDER}")?;
        }
        ResolvedReply::Unreadable { reason } => {
            tracing::warn!(%reason, "Reply had no readable text");
            writeln!(out, "{NO_TEXT_PLACEHOLDER}")?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::message::{Role, TurnKind};
    use crate::platform::{MockPlatform, Operation};
    use crate::response::{OutputItem, RawResponsePayload};
    use crate::session::{CapabilityFlags, Instructions};

    const MODEL: &str = "ollama/llama3.2:1b";

    fn state(rag: bool, tools: bool) -> ConversationState {
        ConversationState::new(
            "agent_1",
            "session_1",
            CapabilityFlags {
                rag_available: rag,
                tools_available: tools,
            },
        )
    }

    async fn chat(
        mock: &Arc<MockPlatform>,
        input: &str,
        state: ConversationState,
    ) -> (ChatLoop, String) {
        let mut chat = ChatLoop::new(mock.clone(), MODEL, state);
        let mut out = Vec::new();
        chat.run(input.as_bytes(), &mut out, std::future::pending())
            .await
            .unwrap();
        (chat, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_command_parse() {
        assert_eq!(Command::parse("  exit "), Command::Exit);
        assert_eq!(Command::parse("clear"), Command::Clear);
        assert_eq!(Command::parse("   "), Command::Empty);
        assert_eq!(Command::parse(" hi there "), Command::Chat("hi there".into()));
        assert_eq!(Command::parse("exit now"), Command::Chat("exit now".into()));
    }

    #[tokio::test]
    async fn test_clear_discards_earlier_turns() {
        let mock = Arc::new(MockPlatform::new());
        let (chat, out) = chat(&mock, "hello\nclear\nworld\n", state(false, false)).await;

        let turns = chat.state().turns();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].role, Role::User);
        assert_eq!(turns[0].text, "world");
        assert_eq!(turns[1].role, Role::Assistant);
        assert_eq!(turns[1].text, "You said: world");
        assert_eq!(chat.state().agent_id(), "agent_1");
        assert_eq!(chat.state().session_id(), "session_1");
        assert!(out.contains("🧹 Conversation history cleared"));
        assert!(out.contains("🤖 Assistant: You said: hello"));
        assert_eq!(chat.loop_state(), LoopState::Reading);
    }

    #[tokio::test]
    async fn test_send_failure_records_nothing() {
        let mock = Arc::new(MockPlatform::new().failing(Operation::SendTurn));
        let (chat, out) = chat(&mock, "first\nsecond\n", state(true, true)).await;

        assert!(chat.state().turns().is_empty());
        assert_eq!(out.matches("❌ Error:").count(), 2);
        assert_eq!(mock.calls(), vec![Operation::SendTurn, Operation::SendTurn]);
    }

    #[tokio::test]
    async fn test_fetch_failure_records_nothing() {
        let mock = Arc::new(MockPlatform::new().failing(Operation::FetchResponse));
        let (chat, out) = chat(&mock, "hello\n", state(true, true)).await;

        assert!(chat.state().turns().is_empty());
        assert!(out.contains("❌ Error:"));
    }

    #[tokio::test]
    async fn test_rag_instructions_are_sent() {
        let mock = Arc::new(MockPlatform::new());
        chat(&mock, "Tell me about ElectroShop's history\n", state(true, false)).await;

        let turns = mock.turns();
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].instructions, Instructions::RagOnly.text());
        assert_eq!(turns[0].input, "Tell me about ElectroShop's history");
        assert_eq!(turns[0].model, MODEL);
        assert_eq!(turns[0].agent_id, "agent_1");
        assert_eq!(turns[0].session_id, "session_1");
    }

    #[tokio::test]
    async fn test_tool_call_reply() {
        let payload = RawResponsePayload::new("resp", vec![OutputItem::other("mcp_call")]);
        let mock = Arc::new(MockPlatform::new().with_reply(payload));
        let (chat, out) = chat(&mock, "List all customers\n", state(false, true)).await;

        assert!(out.contains("🤖 Assistant: 🛠️  Executing tools..."));
        let turns = chat.state().turns();
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].role, Role::User);
        assert_eq!(turns[0].kind, TurnKind::Message);
    }

    #[tokio::test]
    async fn test_invalid_utf8_line_is_skipped() {
        let mock = Arc::new(MockPlatform::new());
        let mut chat = ChatLoop::new(mock.clone(), MODEL, state(false, false));
        let mut out = Vec::new();

        chat.run(
            &b"hello\n\xff\xfe\nworld\n"[..],
            &mut out,
            std::future::pending(),
        )
        .await
        .unwrap();

        let out = String::from_utf8(out).unwrap();
        assert!(out.contains("not valid UTF-8"));
        assert!(out.contains("🤖 Assistant: You said: world"));
        assert_eq!(mock.turns().len(), 2);
        assert_eq!(chat.state().turns().len(), 4);
        assert_eq!(chat.state().turns()[2].text, "world");
    }

    #[tokio::test]
    async fn test_unreadable_reply_keeps_only_user_turn() {
        let payload = RawResponsePayload::new("resp", vec![OutputItem::message("[]")]);
        let mock = Arc::new(MockPlatform::new().with_reply(payload));
        let (chat, out) = chat(&mock, "hello\n", state(false, false)).await;

        assert!(out.contains("(No text response available)"));
        let turns = chat.state().turns();
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].role, Role::User);
    }

    #[tokio::test]
    async fn test_exit_and_blank_lines() {
        let mock = Arc::new(MockPlatform::new());
        let (chat, out) = chat(&mock, "\n   \nexit\nhello\n", state(false, false)).await;

        assert!(out.contains("👋 Goodbye!"));
        assert!(mock.calls().is_empty());
        assert!(chat.state().turns().is_empty());
    }

    #[tokio::test]
    async fn test_shutdown_mid_round_records_nothing() {
        let mock = Arc::new(MockPlatform::new().hanging_turns());
        let mut chat = ChatLoop::new(mock.clone(), MODEL, state(true, true));
        let mut out = Vec::new();

        chat.run(
            "hello\nworld\n".as_bytes(),
            &mut out,
            tokio::time::sleep(Duration::from_millis(20)),
        )
        .await
        .unwrap();

        assert!(chat.state().turns().is_empty());
        assert_eq!(mock.calls(), vec![Operation::SendTurn]);
        assert!(String::from_utf8(out).unwrap().contains("Interrupted"));
    }
}
