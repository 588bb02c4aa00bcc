//! End-to-end scenarios against the public `run()` entry point, using the
//! `test-utils` mock provider in place of a real streaming backend.

use std::sync::Arc;

use conduit_runtime::mock::MockChatProvider;
use conduit_runtime::{
    Agent, AgentRegistry, ContextCarrier, Delta, Event, FinishReason, Handoff, ModelConfig,
    ParamField, ParamType, RunInput, RunOptions, Tool, ToolCallDelta, ToolDefinition, ToolError,
    ToolOutput,
};
use serde_json::Value;

struct WeatherTool;

#[async_trait::async_trait]
impl Tool for WeatherTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "get_weather",
            "Look up the current weather for a city.",
            &[ParamField::new("city", ParamType::String).required()],
        )
    }

    async fn invoke(&self, args: Value, _ctx: &ContextCarrier) -> Result<ToolOutput, ToolError> {
        let city = args
            .get("city")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolError::ToolArgsInvalid("missing 'city'".to_string()))?;
        Ok(ToolOutput::Text(format!("sunny in {city}")))
    }
}

/// Slow-ish tool used to exercise dispatch ordering: dispatched calls finish
/// in the reverse of their input order, but events must still publish in
/// input order.
struct OrderProbeTool;

#[async_trait::async_trait]
impl Tool for OrderProbeTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "probe",
            "Echoes back an index after a delay inversely proportional to it.",
            &[ParamField::new("n", ParamType::Number).required()],
        )
    }

    async fn invoke(&self, args: Value, _ctx: &ContextCarrier) -> Result<ToolOutput, ToolError> {
        let n = args.get("n").and_then(|v| v.as_u64()).unwrap_or(0);
        let delay_ms = 30u64.saturating_sub(n * 10);
        tokio::time::sleep(std::time::Duration::from_millis(delay_ms)).await;
        Ok(ToolOutput::Text(n.to_string()))
    }
}

async fn drain(mut rx: tokio::sync::mpsc::UnboundedReceiver<Event>) -> Vec<Event> {
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn s1_plain_reply_no_tools() {
    let provider = Arc::new(MockChatProvider::new());
    provider.queue_response(vec![
        Delta::Content("hello".into()),
        Delta::Content(" there".into()),
        Delta::Finish(FinishReason::Stop),
    ]);

    let mut registry = AgentRegistry::new();
    registry
        .register(Agent::new("assistant", "be helpful", ModelConfig::new("mock")))
        .unwrap();

    let response = conduit_runtime::run(
        Arc::new(registry),
        "assistant",
        RunInput::Text("hello".to_string()),
        ContextCarrier::empty(),
        provider,
        RunOptions::default(),
    )
    .await;

    let events = drain(response.stream()).await;
    let tokens: String = events
        .iter()
        .filter_map(|e| match e {
            Event::Token { text, .. } => Some(text.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(tokens, "hello there");
    assert_eq!(response.final_message().content, "hello there");
}

#[tokio::test]
async fn s2_single_tool_call_round_trip() {
    let provider = Arc::new(MockChatProvider::new());
    provider.queue_response(vec![
        Delta::ToolCall(ToolCallDelta {
            index: 0,
            id: Some("call_1".into()),
            name: Some("get_weather".into()),
            arguments_delta: Some(r#"{"city":"Lisbon"}"#.into()),
        }),
        Delta::Finish(FinishReason::ToolCalls),
    ]);
    provider.queue_text("it's sunny in Lisbon");

    let mut registry = AgentRegistry::new();
    registry
        .register(Agent::new("assistant", "be helpful", ModelConfig::new("mock")).with_tool(WeatherTool))
        .unwrap();

    let response = conduit_runtime::run(
        Arc::new(registry),
        "assistant",
        RunInput::Text("what's the weather in Lisbon?".to_string()),
        ContextCarrier::empty(),
        provider,
        RunOptions::default(),
    )
    .await;

    let events = drain(response.stream()).await;
    assert!(events
        .iter()
        .any(|e| matches!(e, Event::ToolResult { output, is_error, .. } if output == "sunny in Lisbon" && !is_error)));
    let conversation = response.final_conversation();
    let tool_message = conversation.iter().find(|m| m.role == conduit_core::Role::Tool).unwrap();
    assert_eq!(tool_message.tool_call_id.as_deref(), Some("call_1"));
    assert_eq!(response.final_message().content, "it's sunny in Lisbon");
}

#[tokio::test]
async fn s3_parallel_tool_calls_preserve_order() {
    let provider = Arc::new(MockChatProvider::new());
    provider.queue_response(vec![
        Delta::ToolCall(ToolCallDelta {
            index: 0,
            id: Some("c1".into()),
            name: Some("probe".into()),
            arguments_delta: Some(r#"{"n":0}"#.into()),
        }),
        Delta::ToolCall(ToolCallDelta {
            index: 1,
            id: Some("c2".into()),
            name: Some("probe".into()),
            arguments_delta: Some(r#"{"n":1}"#.into()),
        }),
        Delta::ToolCall(ToolCallDelta {
            index: 2,
            id: Some("c3".into()),
            name: Some("probe".into()),
            arguments_delta: Some(r#"{"n":2}"#.into()),
        }),
        Delta::Finish(FinishReason::ToolCalls),
    ]);
    provider.queue_text("done");

    let mut registry = AgentRegistry::new();
    registry
        .register(Agent::new("assistant", "be helpful", ModelConfig::new("mock")).with_tool(OrderProbeTool))
        .unwrap();

    let response = conduit_runtime::run(
        Arc::new(registry),
        "assistant",
        RunInput::Text("go".to_string()),
        ContextCarrier::empty(),
        provider,
        RunOptions::default(),
    )
    .await;

    let events = drain(response.stream()).await;
    let tool_result_ids: Vec<String> = events
        .iter()
        .filter_map(|e| match e {
            Event::ToolResult { call, .. } => Some(call.id.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(tool_result_ids, vec!["c1", "c2", "c3"]);
}

#[tokio::test]
async fn s4_handoff_switches_agent_and_carries_prompt() {
    let provider = Arc::new(MockChatProvider::new());
    provider.queue_response(vec![
        Delta::ToolCall(ToolCallDelta {
            index: 0,
            id: Some("call_1".into()),
            name: Some("transfer_to_billing".into()),
            arguments_delta: Some(r#"{"prompt":"take over"}"#.into()),
        }),
        Delta::Finish(FinishReason::ToolCalls),
    ]);
    provider.queue_text("billing agent here");

    let mut registry = AgentRegistry::new();
    registry
        .register(Agent::new("triage", "route requests", ModelConfig::new("mock")).with_handoff(Handoff::to("billing")))
        .unwrap();
    registry
        .register(Agent::new("billing", "handle billing", ModelConfig::new("mock")))
        .unwrap();

    let response = conduit_runtime::run(
        Arc::new(registry),
        "triage",
        RunInput::Text("I have a billing question".to_string()),
        ContextCarrier::empty(),
        provider,
        RunOptions::default(),
    )
    .await;

    let events = drain(response.stream()).await;
    let handoff = events
        .iter()
        .find_map(|e| match e {
            Event::Handoff { from_agent, to_agent, prompt, .. } => {
                Some((from_agent.clone(), to_agent.clone(), prompt.clone()))
            }
            _ => None,
        })
        .expect("expected a handoff event");
    assert_eq!(handoff, ("triage".to_string(), "billing".to_string(), Some("take over".to_string())));

    let conversation = response.final_conversation();
    let tool_message = conversation
        .iter()
        .find(|m| m.tool_call_id.as_deref() == Some("call_1"))
        .unwrap();
    assert_eq!(tool_message.content, "handoff_executed");
    assert_eq!(response.final_message().content, "billing agent here");
}

#[tokio::test]
async fn s5_invalid_tool_arguments_continue_the_loop() {
    let provider = Arc::new(MockChatProvider::new());
    provider.queue_response(vec![
        Delta::ToolCall(ToolCallDelta {
            index: 0,
            id: Some("call_1".into()),
            name: Some("get_weather".into()),
            arguments_delta: Some("{not json".into()),
        }),
        Delta::Finish(FinishReason::ToolCalls),
    ]);
    provider.queue_text("sorry, could not look that up");

    let mut registry = AgentRegistry::new();
    registry
        .register(Agent::new("assistant", "be helpful", ModelConfig::new("mock")).with_tool(WeatherTool))
        .unwrap();

    let response = conduit_runtime::run(
        Arc::new(registry),
        "assistant",
        RunInput::Text("weather?".to_string()),
        ContextCarrier::empty(),
        provider,
        RunOptions::default(),
    )
    .await;

    let events = drain(response.stream()).await;
    assert!(events
        .iter()
        .any(|e| matches!(e, Event::ToolResult { is_error, .. } if *is_error)));
    assert_eq!(response.final_message().content, "sorry, could not look that up");
}

#[tokio::test]
async fn s6_iteration_cap_terminates_the_run() {
    let provider = Arc::new(MockChatProvider::new());
    for _ in 0..20 {
        provider.queue_response(vec![
            Delta::ToolCall(ToolCallDelta {
                index: 0,
                id: Some("call_1".into()),
                name: Some("get_weather".into()),
                arguments_delta: Some(r#"{"city":"Porto"}"#.into()),
            }),
            Delta::Finish(FinishReason::ToolCalls),
        ]);
    }

    let mut registry = AgentRegistry::new();
    registry
        .register(Agent::new("assistant", "be helpful", ModelConfig::new("mock")).with_tool(WeatherTool))
        .unwrap();

    let response = conduit_runtime::run(
        Arc::new(registry),
        "assistant",
        RunInput::Text("weather?".to_string()),
        ContextCarrier::empty(),
        provider,
        RunOptions { max_iterations: 3 },
    )
    .await;

    let events = drain(response.stream()).await;
    assert!(events
        .iter()
        .any(|e| matches!(e, Event::Error { message, .. } if message.contains("iteration cap"))));
}
