//! Stateful decoder for Claude Code `stream-json` chunks.
//!
//! Raw chunks are JSON objects with a `type` field. Known types:
//! - `system`: lifecycle signals, `init` carries the session id
//! - `assistant`: a message whose `content` mixes text, tool-use and
//!   tool-result fragments
//! - `tool_result`: a tool outcome sent outside an assistant message
//! - `result`: end of the response
//! - `thinking`: reasoning text
//! - `error`: upstream failure
//!
//! Each call to [`StreamInterpreter::interpret`] yields at most one event.
//! An assistant message with several fragments is drained by calling again
//! with the fragments that were not consumed, which
//! [`StreamInterpreter::interpret_all`] does.

use crate::events::{
    ErrorChunk, ParsedChunk, SystemChunk, SystemSubtype, TextChunk, ToolResultChunk, ToolUseChunk,
    UNKNOWN_TOOL_NAME,
};
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::LazyLock;

#[allow(clippy::expect_used)]
static MCP_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^mcp__[^_]+__").expect("MCP prefix pattern is valid"));

/// Strips a leading `mcp__<server>__` prefix from a tool name.
#[must_use]
pub fn display_name(name: &str) -> String {
    MCP_PREFIX.replace(name, "").into_owned()
}

/// Converts raw upstream chunks into [`ParsedChunk`]s for one streamed response.
///
/// Chunks must be fed in arrival order: text accumulation and tool-result
/// correlation both depend on earlier chunks.
#[derive(Debug, Default, Clone)]
pub struct StreamInterpreter {
    accumulated_text: String,
    tool_calls: Vec<ToolUseChunk>,
    tool_index: HashMap<String, usize>,
}

impl StreamInterpreter {
    /// Creates an interpreter with empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes one raw chunk.
    ///
    /// Returns `None` for anything that is not an object with a known `type`.
    pub fn interpret(&mut self, raw: &Value) -> Option<ParsedChunk> {
        let chunk_type = raw.as_object()?.get("type")?.as_str()?;
        match chunk_type {
            "system" => Some(parse_system(raw)),
            "assistant" => {
                let content = raw.get("message")?.get("content")?.as_array()?;
                self.extract_fragment(content)
            }
            "tool_result" => Some(self.parse_tool_result(raw)),
            "result" => Some(ParsedChunk::System(SystemChunk::complete())),
            "thinking" => Some(parse_thinking(raw)),
            "error" => Some(parse_error(raw)),
            _ => None,
        }
    }

    /// Decodes one raw chunk, repeating the assistant-message step of
    /// [`Self::interpret`] until every recognised fragment has been consumed.
    ///
    /// Consumption per call: the first tool result, all text, or the first
    /// tool use. Fragments of unknown type are left behind.
    pub fn interpret_all(&mut self, raw: &Value) -> Vec<ParsedChunk> {
        let Some(mut remaining) = assistant_fragments(raw) else {
            return self.interpret(raw).into_iter().collect();
        };
        let mut events = Vec::new();
        loop {
            let Some(event) = self.extract_fragment(&remaining) else {
                break;
            };
            let consumed = consume(&mut remaining, &event);
            events.push(event);
            if !consumed {
                break;
            }
        }
        events
    }

    /// Returns all text emitted so far.
    #[must_use]
    pub fn accumulated_text(&self) -> &str {
        &self.accumulated_text
    }

    /// Returns the tool uses seen so far, in announcement order.
    #[must_use]
    pub fn active_tool_calls(&self) -> Vec<ToolUseChunk> {
        self.tool_calls.clone()
    }

    /// Clears accumulated text and known tool calls for a new turn.
    pub fn reset(&mut self) {
        self.accumulated_text.clear();
        self.tool_calls.clear();
        self.tool_index.clear();
    }

    fn extract_fragment(&mut self, content: &[Value]) -> Option<ParsedChunk> {
        if let Some(fragment) = content.iter().find(|f| fragment_type(f) == "tool_result") {
            let tool_use_id = str_field(fragment, &["tool_use_id"]).unwrap_or_default();
            return Some(self.tool_result(tool_use_id, fragment));
        }
        let texts: Vec<&Value> = content.iter().filter(|f| fragment_type(f) == "text").collect();
        if !texts.is_empty() {
            let new_text: String = texts
                .iter()
                .filter_map(|f| f.get("text").and_then(Value::as_str))
                .collect();
            self.accumulated_text.push_str(&new_text);
            return Some(ParsedChunk::Text(TextChunk {
                content: new_text,
                accumulated_text: self.accumulated_text.clone(),
            }));
        }
        let fragment = content.iter().find(|f| fragment_type(f) == "tool_use")?;
        let tool_use = parse_tool_use(fragment);
        self.register(tool_use.clone());
        Some(ParsedChunk::ToolUse(tool_use))
    }

    fn parse_tool_result(&self, raw: &Value) -> ParsedChunk {
        let tool_use_id = str_field(raw, &["tool_use_id", "toolUseId", "id"]).unwrap_or_default();
        self.tool_result(tool_use_id, raw)
    }

    fn tool_result(&self, tool_use_id: &str, source: &Value) -> ParsedChunk {
        let name = self.resolve_name(tool_use_id);
        let result = source
            .get("content")
            .or_else(|| source.get("result"))
            .cloned()
            .unwrap_or(Value::Null);
        let is_error = source
            .get("is_error")
            .or_else(|| source.get("isError"))
            .and_then(Value::as_bool)
            .unwrap_or(false);
        ParsedChunk::ToolResult(ToolResultChunk {
            tool_use_id: tool_use_id.to_string(),
            name,
            result,
            is_error,
        })
    }

    fn resolve_name(&self, tool_use_id: &str) -> String {
        match self.tool_index.get(tool_use_id) {
            Some(&index) => self.tool_calls[index].display_name.clone(),
            None => {
                log::debug!("tool result for unseen tool use id {tool_use_id:?}");
                UNKNOWN_TOOL_NAME.to_string()
            }
        }
    }

    fn register(&mut self, tool_use: ToolUseChunk) {
        if let Some(&index) = self.tool_index.get(&tool_use.id) {
            self.tool_calls[index] = tool_use;
        } else {
            self.tool_index.insert(tool_use.id.clone(), self.tool_calls.len());
            self.tool_calls.push(tool_use);
        }
    }
}

fn parse_system(raw: &Value) -> ParsedChunk {
    let subtype = SystemSubtype::from_upstream(raw.get("subtype").and_then(Value::as_str));
    ParsedChunk::System(SystemChunk {
        subtype,
        message: str_field(raw, &["message"]).map(String::from),
        session_id: str_field(raw, &["session_id", "sessionId"]).map(String::from),
    })
}

fn parse_tool_use(fragment: &Value) -> ToolUseChunk {
    let name = str_field(fragment, &["name"]).unwrap_or_default().to_string();
    ToolUseChunk {
        id: str_field(fragment, &["id"]).unwrap_or_default().to_string(),
        display_name: display_name(&name),
        name,
        input: fragment.get("input").cloned().unwrap_or(Value::Null),
    }
}

fn parse_thinking(raw: &Value) -> ParsedChunk {
    let content = str_field(raw, &["thinking", "content"]).unwrap_or_default();
    ParsedChunk::Thinking {
        content: content.to_string(),
    }
}

fn parse_error(raw: &Value) -> ParsedChunk {
    let message = raw
        .get("error")
        .and_then(error_message)
        .or_else(|| raw.get("message").and_then(error_message))
        .unwrap_or_else(|| "Unknown error".to_string());
    ParsedChunk::Error(ErrorChunk {
        message,
        details: raw.get("details").cloned(),
    })
}

fn error_message(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Object(_) => value.get("message").and_then(Value::as_str).map(String::from),
        _ => None,
    }
}

/// First string value among `keys`, in order.
fn str_field<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|key| value.get(*key).and_then(Value::as_str))
}

fn fragment_type(fragment: &Value) -> &str {
    fragment.get("type").and_then(Value::as_str).unwrap_or("")
}

fn assistant_fragments(raw: &Value) -> Option<Vec<Value>> {
    if raw.get("type").and_then(Value::as_str) != Some("assistant") {
        return None;
    }
    raw.get("message")?.get("content")?.as_array().cloned()
}

/// Removes the fragments an `interpret` call turned into `event`.
fn consume(remaining: &mut Vec<Value>, event: &ParsedChunk) -> bool {
    match event {
        ParsedChunk::ToolResult(_) => remove_first(remaining, "tool_result"),
        ParsedChunk::ToolUse(_) => remove_first(remaining, "tool_use"),
        ParsedChunk::Text(_) => {
            let before = remaining.len();
            remaining.retain(|f| fragment_type(f) != "text");
            remaining.len() != before
        }
        _ => false,
    }
}

fn remove_first(remaining: &mut Vec<Value>, kind: &str) -> bool {
    match remaining.iter().position(|f| fragment_type(f) == kind) {
        Some(index) => {
            remaining.remove(index);
            true
        }
        None => false,
    }
}
