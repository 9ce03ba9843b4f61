//! Response Resolution
//!
//! A response fetched from the platform is a list of output items. A message
//! item carries its content items as a separately-encoded JSON array, which is
//! only decoded here. [`resolve`] turns the payload into at most one readable
//! answer.
//!
//! ```text
//! output: [ message | other ... ]
//!              │
//!              └── content (raw JSON): [ output_text | other ... ]
//! ```

use serde::Deserialize;
use serde_json::value::RawValue;

use crate::error::{AgentError, Result};

const NO_MESSAGE: &str = "Response contained no output.";
const NO_READABLE_CONTENT: &str = "No readable content found in response.";
const UNPARSEABLE_CONTENT: &str = "Unable to parse response content.";

/// Full response as fetched by id
#[derive(Clone, Debug, Deserialize)]
pub struct RawResponsePayload {
    pub id: String,
    #[serde(default)]
    pub output: Vec<OutputItem>,
}

impl RawResponsePayload {
    pub fn new(id: impl Into<String>, output: Vec<OutputItem>) -> Self {
        Self {
            id: id.into(),
            output,
        }
    }

    /// Shorthand for [`resolve`]
    pub fn resolve(&self) -> ResolvedReply {
        resolve(self)
    }
}

/// One entry of the response's output sequence, tagged by `type`
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(from = "WireOutputItem")]
pub enum OutputItem {
    Message(MessageItem),
    /// Anything else (`mcp_call`, `function_call`, `file_search_call`, ...)
    Other { kind: String },
}

impl OutputItem {
    /// A message item whose content is the given raw JSON text
    pub fn message(raw_content: impl Into<String>) -> Self {
        Self::Message(MessageItem {
            id: None,
            role: Some("assistant".into()),
            content: Some(raw_content.into()),
        })
    }

    /// A message item with a single `output_text` content item
    pub fn message_text(text: &str) -> Self {
        let content = serde_json::json!([{ "type": "output_text", "text": text }]);
        Self::message(content.to_string())
    }

    pub fn other(kind: impl Into<String>) -> Self {
        Self::Other { kind: kind.into() }
    }

    /// The item's `type` tag
    pub fn kind(&self) -> &str {
        match self {
            Self::Message(_) => "message",
            Self::Other { kind } => kind.as_str(),
        }
    }

    pub const fn as_message(&self) -> Option<&MessageItem> {
        match self {
            Self::Message(msg) => Some(msg),
            Self::Other { .. } => None,
        }
    }
}

/// A message output item. Its content stays encoded until decoded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageItem {
    pub id: Option<String>,
    pub role: Option<String>,
    content: Option<String>,
}

impl MessageItem {
    /// The undecoded content array, if the platform sent one
    pub fn raw_content(&self) -> Option<&str> {
        self.content.as_deref()
    }

    /// Decode the embedded content array
    pub fn decode_content(&self) -> Result<Vec<ContentItem>> {
        let raw = self
            .content
            .as_deref()
            .ok_or_else(|| AgentError::Decode("message has no content".into()))?;
        Ok(serde_json::from_str(raw)?)
    }
}

/// One entry of a message's content array, tagged by `type`
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(from = "WireContentItem")]
pub enum ContentItem {
    OutputText { text: String },
    Other { kind: String },
}

#[derive(Deserialize)]
struct WireOutputItem {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    content: Option<Box<RawValue>>,
}

impl From<WireOutputItem> for OutputItem {
    fn from(wire: WireOutputItem) -> Self {
        if wire.kind == "message" {
            Self::Message(MessageItem {
                id: wire.id,
                role: wire.role,
                content: wire.content.map(|raw| raw.get().to_owned()),
            })
        } else {
            Self::Other { kind: wire.kind }
        }
    }
}

#[derive(Deserialize)]
struct WireContentItem {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

impl From<WireContentItem> for ContentItem {
    fn from(wire: WireContentItem) -> Self {
        match (wire.kind.as_str(), wire.text) {
            ("output_text", Some(text)) => Self::OutputText { text },
            ("output_text", None) => Self::OutputText {
                text: String::new(),
            },
            _ => Self::Other { kind: wire.kind },
        }
    }
}

/// Coarse classification of a [`ResolvedReply`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Text,
    ToolCall,
    Unreadable,
}

/// What a response boiled down to
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResolvedReply {
    /// Readable assistant text
    Text(String),
    /// The response is a tool invocation; `kind` is the output item's tag
    ToolCall { kind: String },
    /// Nothing displayable; `reason` says why
    Unreadable { reason: String },
}

impl ResolvedReply {
    fn unreadable(reason: impl Into<String>) -> Self {
        Self::Unreadable {
            reason: reason.into(),
        }
    }

    pub const fn outcome(&self) -> Outcome {
        match self {
            Self::Text(_) => Outcome::Text,
            Self::ToolCall { .. } => Outcome::ToolCall,
            Self::Unreadable { .. } => Outcome::Unreadable,
        }
    }

    /// The answer text, only for [`Outcome::Text`]
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text.as_str()),
            _ => None,
        }
    }
}

/// Extract at most one readable answer from a response.
///
/// Only the first message item is inspected, and within it the first
/// non-empty `output_text` wins. With no message item at all, a non-empty
/// output is reported as a tool call. Pure: no I/O, never fails.
pub fn resolve(payload: &RawResponsePayload) -> ResolvedReply {
    let Some(message) = payload.output.iter().find_map(OutputItem::as_message) else {
        return payload.output.first().map_or_else(
            || ResolvedReply::unreadable(NO_MESSAGE),
            |item| ResolvedReply::ToolCall {
                kind: item.kind().to_owned(),
            },
        );
    };

    if message.raw_content().is_none() {
        return ResolvedReply::unreadable(UNPARSEABLE_CONTENT);
    }

    let items = match message.decode_content() {
        Ok(items) => items,
        Err(e) => return ResolvedReply::unreadable(format!("Error parsing response: {e}")),
    };

    items
        .into_iter()
        .find_map(|item| match item {
            ContentItem::OutputText { text } if !text.is_empty() => Some(text),
            _ => None,
        })
        .map_or_else(
            || ResolvedReply::unreadable(NO_READABLE_CONTENT),
            ResolvedReply::Text,
        )
}
