//! # investigation-stream
//!
//! Decodes the `stream-json` output of an investigation agent (Claude Code
//! with MCP tools) into a small set of typed events a chat UI can render,
//! and carries those events to the browser as Server-Sent Events.
//!
//! ## Features
//!
//! - [`StreamInterpreter`]: stateful decoder with running text and
//!   tool-use/tool-result correlation
//! - [`hint_from_chunk`]: status line for a "what is happening now" indicator
//! - [`SseWriter`]: `data: <json>` framing
//! - [`SessionStore`]: thread to upstream-session mapping for resumed turns
//! - [`AgentSession`]: runs the agent CLI and yields decoded events
//!
//! ## Example
//!
//! ```
//! use investigation_stream::{ParsedChunk, StreamInterpreter};
//! use serde_json::json;
//!
//! let mut interpreter = StreamInterpreter::new();
//! let chunk = interpreter.interpret(&json!({
//!     "type": "assistant",
//!     "message": { "content": [{ "type": "text", "text": "Found 3 datasets." }] }
//! }));
//! assert!(matches!(chunk, Some(ParsedChunk::Text(_))));
//! assert_eq!(interpreter.accumulated_text(), "Found 3 datasets.");
//! ```

#![deny(missing_docs)]
#![deny(clippy::all)]

mod config;
mod error;
mod events;
mod hint;
mod interpreter;
mod process;
mod session;
mod sse;
mod store;
mod stream;

pub use config::{AgentConfig, ToolPolicy, API_KEY_ENV_VAR, DEFAULT_BINARY};
pub use error::{Error, Result};
pub use events::{
    ErrorChunk, ParsedChunk, SystemChunk, SystemSubtype, TextChunk, ToolResultChunk, ToolUseChunk,
    COMPLETE_MESSAGE, UNKNOWN_TOOL_NAME,
};
pub use hint::hint_from_chunk;
pub use interpreter::{display_name, StreamInterpreter};
pub use process::build_args;
pub use session::{AgentSession, EventIterator};
pub use sse::{encode_event, SseWriter};
pub use store::{FileSessionStore, MemorySessionStore, SessionStore};
