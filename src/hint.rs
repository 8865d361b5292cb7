//! Short status strings for a "what is happening now" indicator.

use crate::events::{ParsedChunk, SystemSubtype};

/// Maps a chunk to a status hint.
///
/// `None` means the indicator should be cleared (or, for chunks that carry
/// no status, left as the caller sees fit).
#[must_use]
pub fn hint_from_chunk(chunk: &ParsedChunk) -> Option<String> {
    match chunk {
        ParsedChunk::System(system) => match system.subtype {
            SystemSubtype::Init => Some("Agent initialized, processing query...".to_string()),
            SystemSubtype::Complete => None,
            SystemSubtype::Status => system.message.clone(),
        },
        ParsedChunk::ToolUse(tool) => Some(format!("Calling tool: {}", tool.display_name)),
        ParsedChunk::Thinking { .. } => Some("Thinking...".to_string()),
        ParsedChunk::Error(error) => Some(format!("Error: {}", error.message)),
        ParsedChunk::Text(_) | ParsedChunk::ToolResult(_) => None,
    }
}
