//! Behavioural properties of the stream interpreter.

use investigation_stream::{
    display_name, ParsedChunk, StreamInterpreter, SystemChunk, SystemSubtype, TextChunk,
    ToolResultChunk, ToolUseChunk, COMPLETE_MESSAGE, UNKNOWN_TOOL_NAME,
};
use serde_json::{json, Value};

fn assistant(content: Value) -> Value {
    json!({ "type": "assistant", "message": { "content": content } })
}

fn text(t: &str) -> Value {
    assistant(json!([{ "type": "text", "text": t }]))
}

fn tool_use(id: &str, name: &str) -> Value {
    assistant(json!([{ "type": "tool_use", "id": id, "name": name, "input": {} }]))
}

#[test]
fn test_text_accumulates_across_chunks() {
    let mut interpreter = StreamInterpreter::new();
    let parts = ["Looking ", "at the ", "monitoring ", "datasets."];
    let mut expected = String::new();
    for part in parts {
        expected.push_str(part);
        let chunk = interpreter.interpret(&text(part));
        assert_eq!(
            chunk,
            Some(ParsedChunk::Text(TextChunk {
                content: part.to_string(),
                accumulated_text: expected.clone(),
            }))
        );
    }
    assert_eq!(interpreter.accumulated_text(), "Looking at the monitoring datasets.");
}

#[test]
fn test_all_text_fragments_in_one_message_are_joined() {
    let mut interpreter = StreamInterpreter::new();
    let raw = assistant(json!([
        { "type": "text", "text": "Found " },
        { "type": "tool_use", "id": "t1", "name": "search", "input": {} },
        { "type": "text", "text": "3 datasets." }
    ]));
    let Some(ParsedChunk::Text(chunk)) = interpreter.interpret(&raw) else {
        panic!("expected a text chunk");
    };
    assert_eq!(chunk.content, "Found 3 datasets.");
    assert!(interpreter.active_tool_calls().is_empty());
}

#[test]
fn test_tool_result_resolves_stripped_name() {
    let mut interpreter = StreamInterpreter::new();
    let announced = interpreter.interpret(&tool_use("abc", "mcp__omni-api__discover_datasets"));
    let Some(ParsedChunk::ToolUse(announced)) = announced else {
        panic!("expected a tool_use chunk");
    };
    assert_eq!(announced.name, "mcp__omni-api__discover_datasets");
    assert_eq!(announced.display_name, "discover_datasets");

    let result = interpreter.interpret(&assistant(json!([
        { "type": "tool_result", "tool_use_id": "abc", "content": "ok" }
    ])));
    assert_eq!(
        result,
        Some(ParsedChunk::ToolResult(ToolResultChunk {
            tool_use_id: "abc".to_string(),
            name: "discover_datasets".to_string(),
            result: json!("ok"),
            is_error: false,
        }))
    );
}

#[test]
fn test_unseen_tool_result_is_unknown() {
    let mut interpreter = StreamInterpreter::new();
    let result = interpreter.interpret(&assistant(json!([
        { "type": "tool_result", "tool_use_id": "never-seen", "content": "x", "is_error": true }
    ])));
    let Some(ParsedChunk::ToolResult(result)) = result else {
        panic!("expected a tool_result chunk");
    };
    assert_eq!(result.name, UNKNOWN_TOOL_NAME);
    assert!(result.is_error);
}

#[test]
fn test_top_level_tool_result_id_fallbacks() {
    let mut interpreter = StreamInterpreter::new();
    interpreter.interpret(&tool_use("a", "run_query"));
    interpreter.interpret(&tool_use("b", "mcp__grafana__list_alerts"));
    interpreter.interpret(&tool_use("c", "fetch_logs"));

    let by_snake = interpreter.interpret(&json!({ "type": "tool_result", "tool_use_id": "a" }));
    let by_camel = interpreter.interpret(&json!({ "type": "tool_result", "toolUseId": "b", "isError": true }));
    let by_id = interpreter.interpret(&json!({ "type": "tool_result", "id": "c", "result": [1, 2] }));

    let names: Vec<(String, bool, Value)> = [by_snake, by_camel, by_id]
        .into_iter()
        .map(|chunk| match chunk {
            Some(ParsedChunk::ToolResult(r)) => (r.name, r.is_error, r.result),
            other => panic!("expected tool_result, got {other:?}"),
        })
        .collect();
    assert_eq!(
        names,
        vec![
            ("run_query".to_string(), false, Value::Null),
            ("list_alerts".to_string(), true, Value::Null),
            ("fetch_logs".to_string(), false, json!([1, 2])),
        ]
    );
}

#[test]
fn test_reset_clears_turn_state() {
    let mut interpreter = StreamInterpreter::new();
    interpreter.interpret(&text("previous turn"));
    interpreter.interpret(&tool_use("t1", "mcp__omni-api__discover_datasets"));
    interpreter.reset();
    assert_eq!(interpreter.accumulated_text(), "");
    assert!(interpreter.active_tool_calls().is_empty());

    let result = interpreter.interpret(&json!({ "type": "tool_result", "tool_use_id": "t1" }));
    assert!(matches!(result, Some(ParsedChunk::ToolResult(r)) if r.name == UNKNOWN_TOOL_NAME));
}

#[test]
fn test_malformed_input_yields_none() {
    let mut interpreter = StreamInterpreter::new();
    let inputs = [
        Value::Null,
        json!(42),
        json!("system"),
        json!([{ "type": "system" }]),
        json!({}),
        json!({ "type": 7 }),
        json!({ "type": "unknown_future_type" }),
        json!({ "type": "assistant" }),
        json!({ "type": "assistant", "message": { "content": "plain string" } }),
        assistant(json!([])),
        assistant(json!([{ "type": "image", "source": {} }])),
    ];
    for input in &inputs {
        assert_eq!(interpreter.interpret(input), None, "input: {input}");
    }
    assert_eq!(interpreter.accumulated_text(), "");
}

#[test]
fn test_result_always_completes() {
    let mut interpreter = StreamInterpreter::new();
    for raw in [
        json!({ "type": "result" }),
        json!({ "type": "result", "subtype": "error_max_turns", "session_id": "s9", "message": "x" }),
    ] {
        let chunk = interpreter.interpret(&raw);
        assert_eq!(
            chunk,
            Some(ParsedChunk::System(SystemChunk {
                subtype: SystemSubtype::Complete,
                message: Some(COMPLETE_MESSAGE.to_string()),
                session_id: None,
            }))
        );
        assert!(chunk.is_some_and(|c| c.is_complete()));
    }
}

#[test]
fn test_system_subtypes_and_session_id() {
    let mut interpreter = StreamInterpreter::new();
    let init = interpreter.interpret(&json!({ "type": "system", "subtype": "init", "session_id": "s1" }));
    assert_eq!(init.as_ref().and_then(ParsedChunk::session_id), Some("s1"));

    let camel = interpreter.interpret(&json!({ "type": "system", "subtype": "init", "sessionId": "s2" }));
    assert_eq!(camel.as_ref().and_then(ParsedChunk::session_id), Some("s2"));

    let status = interpreter.interpret(&json!({ "type": "system", "message": "Compacting" }));
    assert_eq!(
        status,
        Some(ParsedChunk::System(SystemChunk {
            subtype: SystemSubtype::Status,
            message: Some("Compacting".to_string()),
            session_id: None,
        }))
    );

    let other = interpreter.interpret(&json!({ "type": "system", "subtype": "compact_boundary" }));
    assert!(matches!(other, Some(ParsedChunk::System(s)) if s.subtype == SystemSubtype::Status));
}

#[test]
fn test_thinking_and_error_fallbacks() {
    let mut interpreter = StreamInterpreter::new();
    let thinking = interpreter.interpret(&json!({ "type": "thinking", "thinking": "check the alerts" }));
    assert_eq!(thinking, Some(ParsedChunk::Thinking { content: "check the alerts".to_string() }));
    let fallback = interpreter.interpret(&json!({ "type": "thinking", "content": "then the logs" }));
    assert_eq!(fallback, Some(ParsedChunk::Thinking { content: "then the logs".to_string() }));

    let error = interpreter.interpret(&json!({ "type": "error", "error": "rate limited", "details": { "retry": 5 } }));
    let Some(ParsedChunk::Error(error)) = error else {
        panic!("expected an error chunk");
    };
    assert_eq!(error.message, "rate limited");
    assert_eq!(error.details, Some(json!({ "retry": 5 })));

    let from_message = interpreter.interpret(&json!({ "type": "error", "message": "overloaded" }));
    assert!(matches!(from_message, Some(ParsedChunk::Error(e)) if e.message == "overloaded" && e.details.is_none()));

    let nested = interpreter.interpret(&json!({ "type": "error", "error": { "message": "bad gateway" } }));
    assert!(matches!(nested, Some(ParsedChunk::Error(e)) if e.message == "bad gateway"));
}

#[test]
fn test_single_call_emits_only_first_tool_use() {
    let mut interpreter = StreamInterpreter::new();
    let raw = assistant(json!([
        { "type": "tool_use", "id": "t1", "name": "mcp__omni-api__discover_datasets", "input": {} },
        { "type": "tool_use", "id": "t2", "name": "mcp__omni-api__query_dataset", "input": {} }
    ]));
    let chunk = interpreter.interpret(&raw);
    assert!(matches!(chunk, Some(ParsedChunk::ToolUse(ref t)) if t.id == "t1"));
    let ids: Vec<String> = interpreter.active_tool_calls().into_iter().map(|t| t.id).collect();
    assert_eq!(ids, vec!["t1".to_string()]);

    let again = interpreter.interpret(&raw);
    assert!(matches!(again, Some(ParsedChunk::ToolUse(ref t)) if t.id == "t1"));
    assert_eq!(interpreter.active_tool_calls().len(), 1);
}

#[test]
fn test_tool_result_takes_priority_over_text_and_tool_use() {
    let mut interpreter = StreamInterpreter::new();
    interpreter.interpret(&tool_use("t1", "lookup"));
    let raw = assistant(json!([
        { "type": "tool_use", "id": "t2", "name": "other", "input": {} },
        { "type": "text", "text": "narration" },
        { "type": "tool_result", "tool_use_id": "t1", "content": "done" }
    ]));
    let chunk = interpreter.interpret(&raw);
    assert!(matches!(chunk, Some(ParsedChunk::ToolResult(ref r)) if r.name == "lookup"));
    assert_eq!(interpreter.accumulated_text(), "");
}

#[test]
fn test_active_tool_calls_keep_announcement_order() {
    let mut interpreter = StreamInterpreter::new();
    interpreter.interpret(&tool_use("t1", "first"));
    interpreter.interpret(&tool_use("t2", "second"));
    interpreter.interpret(&assistant(json!([
        { "type": "tool_use", "id": "t1", "name": "first", "input": { "retry": true } }
    ])));
    let calls = interpreter.active_tool_calls();
    assert_eq!(
        calls,
        vec![
            ToolUseChunk {
                id: "t1".to_string(),
                name: "first".to_string(),
                display_name: "first".to_string(),
                input: json!({ "retry": true }),
            },
            ToolUseChunk {
                id: "t2".to_string(),
                name: "second".to_string(),
                display_name: "second".to_string(),
                input: json!({}),
            },
        ]
    );
}

#[test]
fn test_display_name_prefix_rule() {
    assert_eq!(display_name("mcp__omni-api__discover_datasets"), "discover_datasets");
    assert_eq!(display_name("mcp__grafana__query__range"), "query__range");
    assert_eq!(display_name("Bash"), "Bash");
    assert_eq!(display_name("mcp__with_underscore__tool"), "mcp__with_underscore__tool");
    assert_eq!(display_name("x_mcp__srv__tool"), "x_mcp__srv__tool");
}

#[test]
fn test_separate_interpreters_do_not_share_state() {
    let mut first = StreamInterpreter::new();
    let mut second = StreamInterpreter::new();
    first.interpret(&text("tab one"));
    first.interpret(&tool_use("t1", "mcp__omni-api__discover_datasets"));
    assert_eq!(second.accumulated_text(), "");
    let result = second.interpret(&json!({ "type": "tool_result", "tool_use_id": "t1" }));
    assert!(matches!(result, Some(ParsedChunk::ToolResult(r)) if r.name == UNKNOWN_TOOL_NAME));
}
