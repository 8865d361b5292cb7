//! Typed event model produced by the stream interpreter.
//!
//! The JSON form of these types is what browser clients receive over SSE:
//! tagged by `type`, camelCase field names, absent optionals omitted.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Name reported for a tool result whose originating tool use was never seen.
pub const UNKNOWN_TOOL_NAME: &str = "unknown";

/// Message carried by the `system/complete` chunk.
pub const COMPLETE_MESSAGE: &str = "Response complete";

/// A UI-consumable event decoded from one raw upstream chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ParsedChunk {
    /// New assistant text.
    Text(TextChunk),
    /// The agent announced a tool invocation.
    ToolUse(ToolUseChunk),
    /// The outcome of a previously announced tool invocation.
    ToolResult(ToolResultChunk),
    /// Lifecycle or status signal.
    System(SystemChunk),
    /// Internal reasoning, kept apart from answer text.
    Thinking {
        /// The reasoning text.
        content: String,
    },
    /// A failure reported by the upstream stream.
    Error(ErrorChunk),
}

/// A text delta together with everything seen so far in the stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextChunk {
    /// Text added by this chunk.
    pub content: String,
    /// All text emitted by the interpreter up to and including this chunk.
    pub accumulated_text: String,
}

/// A tool invocation announced by the agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolUseChunk {
    /// Identifier later referenced by the matching tool result.
    pub id: String,
    /// Full tool name, including any `mcp__<server>__` prefix.
    pub name: String,
    /// Tool name with the MCP server prefix removed.
    pub display_name: String,
    /// Tool arguments as sent by the agent.
    pub input: Value,
}

/// The outcome of a tool invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResultChunk {
    /// Identifier of the tool use this result answers.
    pub tool_use_id: String,
    /// Display name of the originating tool, or [`UNKNOWN_TOOL_NAME`].
    pub name: String,
    /// Tool output, passed through untouched.
    pub result: Value,
    /// Whether the tool reported a failure.
    pub is_error: bool,
}

/// Kind of lifecycle signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SystemSubtype {
    /// The agent session started.
    Init,
    /// Intermediate status update.
    Status,
    /// The response finished.
    Complete,
}

impl SystemSubtype {
    /// Maps an upstream `subtype` string; anything unrecognised is a status update.
    #[must_use]
    pub fn from_upstream(subtype: Option<&str>) -> Self {
        match subtype {
            Some("init") => Self::Init,
            Some("complete") => Self::Complete,
            _ => Self::Status,
        }
    }
}

/// A lifecycle or status signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemChunk {
    /// What kind of signal this is.
    pub subtype: SystemSubtype,
    /// Optional human-readable message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Upstream session identifier, usually present on `init`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl SystemChunk {
    /// The chunk emitted when the upstream stream reports its final result.
    #[must_use]
    pub fn complete() -> Self {
        Self {
            subtype: SystemSubtype::Complete,
            message: Some(COMPLETE_MESSAGE.to_string()),
            session_id: None,
        }
    }
}

/// A failure signal from the upstream stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorChunk {
    /// Human-readable error message.
    pub message: String,
    /// Extra structured detail, when upstream supplied any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ParsedChunk {
    /// Returns true for the `system/complete` chunk.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::System(SystemChunk { subtype: SystemSubtype::Complete, .. }))
    }

    /// Returns the session id carried by a `system` chunk, if any.
    #[must_use]
    pub fn session_id(&self) -> Option<&str> {
        match self {
            Self::System(chunk) => chunk.session_id.as_deref(),
            _ => None,
        }
    }
}
