//! Conversions between `conduit-core`/`conduit-runtime` types and the
//! OpenAI Chat Completions wire shapes.

use serde_json::{json, Value};

use conduit_core::{Message, Role, ToolCall};
use conduit_runtime::{Delta, FinishReason, ToolCallDelta, ToolDefinition};

pub(super) fn message_to_openai(message: &Message) -> Value {
    let role = match message.role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::Tool => "tool",
    };

    let mut out = json!({
        "role": role,
        "content": message.content,
    });

    if !message.tool_calls.is_empty() {
        out["tool_calls"] = json!(message
            .tool_calls
            .iter()
            .map(tool_call_to_openai)
            .collect::<Vec<_>>());
    }
    if let Some(id) = &message.tool_call_id {
        out["tool_call_id"] = json!(id);
    }
    out
}

fn tool_call_to_openai(call: &ToolCall) -> Value {
    json!({
        "id": call.id,
        "type": "function",
        "function": {
            "name": call.name,
            "arguments": call.arguments,
        }
    })
}

pub(super) fn tool_definition_to_openai(def: &ToolDefinition) -> Value {
    json!({
        "type": "function",
        "function": {
            "name": def.name,
            "description": def.description,
            "parameters": def.input_schema,
        }
    })
}

fn finish_reason_from_str(s: &str) -> FinishReason {
    match s {
        "stop" => FinishReason::Stop,
        "tool_calls" => FinishReason::ToolCalls,
        "length" => FinishReason::Length,
        "content_filter" => FinishReason::ContentFilter,
        other => FinishReason::Other(other.to_string()),
    }
}

/// Parses one `data: {...}` JSON payload into zero or more [`Delta`]s.
pub(super) fn parse_chunk(data: &str) -> Vec<Delta> {
    let Ok(parsed) = serde_json::from_str::<Value>(data) else {
        return Vec::new();
    };
    let mut deltas = Vec::new();
    let Some(choice) = parsed["choices"].get(0) else {
        return deltas;
    };

    if let Some(content) = choice["delta"]["content"].as_str() {
        if !content.is_empty() {
            deltas.push(Delta::Content(content.to_string()));
        }
    }

    if let Some(tool_calls) = choice["delta"]["tool_calls"].as_array() {
        for tc in tool_calls {
            let index = tc["index"].as_u64().unwrap_or(0) as usize;
            deltas.push(Delta::ToolCall(ToolCallDelta {
                index,
                id: tc["id"].as_str().map(String::from),
                name: tc["function"]["name"].as_str().map(String::from),
                arguments_delta: tc["function"]["arguments"].as_str().map(String::from),
            }));
        }
    }

    if let Some(reason) = choice["finish_reason"].as_str() {
        deltas.push(Delta::Finish(finish_reason_from_str(reason)));
    }

    deltas
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_with_tool_calls_round_trips_shape() {
        let message = Message::assistant_tool_calls(
            "",
            vec![ToolCall {
                id: "call_1".into(),
                name: "echo".into(),
                arguments: "{}".into(),
            }],
            None,
        );
        let json = message_to_openai(&message);
        assert_eq!(json["tool_calls"][0]["function"]["name"], "echo");
    }

    #[test]
    fn parses_content_delta() {
        let deltas = parse_chunk(r#"{"choices":[{"delta":{"content":"hi"}}]}"#);
        assert!(matches!(&deltas[0], Delta::Content(s) if s == "hi"));
    }

    #[test]
    fn parses_tool_call_delta_fragment() {
        let deltas = parse_chunk(
            r#"{"choices":[{"delta":{"tool_calls":[{"index":0,"id":"call_1","function":{"name":"echo","arguments":"{\"a\":1}"}}]}}]}"#,
        );
        assert!(matches!(&deltas[0], Delta::ToolCall(d) if d.id.as_deref() == Some("call_1")));
    }

    #[test]
    fn parses_finish_reason() {
        let deltas = parse_chunk(r#"{"choices":[{"delta":{},"finish_reason":"tool_calls"}]}"#);
        assert!(matches!(&deltas[0], Delta::Finish(FinishReason::ToolCalls)));
    }
}
