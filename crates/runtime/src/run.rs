//! Public entry points: start a run, or wrap an agent as a callable tool for
//! another agent (nested, non-event-sharing sub-runs).

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::agent::AgentRegistry;
use crate::cancel::CancelToken;
use crate::context::ContextCarrier;
use crate::event::EventHub;
use crate::loop_engine::{self, RunInput, RunOptions};
use crate::provider::ChatProvider;
use crate::response::Response;
use crate::tool::{ParamField, ParamType, Tool, ToolDefinition, ToolError, ToolOutput};

/// Starts a run. Returns immediately with a [`Response`] handle; the loop
/// itself drives on a spawned task and publishes to the handle's event hub.
pub async fn run(
    registry: Arc<AgentRegistry>,
    starting_agent_name: impl Into<String>,
    input: RunInput,
    ctx: ContextCarrier,
    provider: Arc<dyn ChatProvider>,
    options: RunOptions,
) -> Response {
    let starting_agent_name = starting_agent_name.into();
    let hub = EventHub::new();
    let cancel = CancelToken::new();
    let starting_messages = match &input {
        RunInput::Conversation(messages) => messages.clone(),
        RunInput::Text(_) => Vec::new(),
    };

    let task_hub = hub.clone();
    let task_cancel = cancel.clone();
    tokio::spawn(async move {
        loop_engine::drive(
            registry,
            starting_agent_name,
            input,
            ctx,
            provider,
            task_hub,
            task_cancel,
            options,
        )
        .await;
    });

    Response::new(hub, starting_messages, cancel)
}

/// Wraps a nested agent run as a `Tool` another agent can call. The nested
/// run gets its own event hub — it does not publish into the caller's
/// stream — and the tool's output is the nested run's final message text.
pub struct AgentAsTool {
    tool_name: String,
    description: String,
    target_agent_name: String,
    registry: Arc<AgentRegistry>,
    provider: Arc<dyn ChatProvider>,
}

impl AgentAsTool {
    pub fn new(
        tool_name: impl Into<String>,
        description: impl Into<String>,
        target_agent_name: impl Into<String>,
        registry: Arc<AgentRegistry>,
        provider: Arc<dyn ChatProvider>,
    ) -> Self {
        Self {
            tool_name: tool_name.into(),
            description: description.into(),
            target_agent_name: target_agent_name.into(),
            registry,
            provider,
        }
    }
}

#[async_trait]
impl Tool for AgentAsTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            self.tool_name.clone(),
            self.description.clone(),
            &[ParamField::new("prompt", ParamType::String)
                .required()
                .described("The input to hand to the nested agent.")],
        )
    }

    async fn invoke(&self, args: Value, ctx: &ContextCarrier) -> Result<ToolOutput, ToolError> {
        let prompt = args
            .get("prompt")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolError::ToolArgsInvalid("missing 'prompt' field".to_string()))?
            .to_string();

        let response = run(
            self.registry.clone(),
            self.target_agent_name.clone(),
            RunInput::Text(prompt),
            ctx.clone(),
            self.provider.clone(),
            RunOptions::default(),
        )
        .await;

        // Drain the nested run to completion; its events are not forwarded.
        let mut rx = response.stream();
        while rx.recv().await.is_some() {}

        Ok(ToolOutput::Text(response.final_message().content))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::Agent;
    use crate::provider::mock::MockChatProvider;
    use crate::provider::ModelConfig;

    #[tokio::test]
    async fn run_returns_response_that_eventually_closes() {
        let provider = Arc::new(MockChatProvider::new());
        provider.queue_text("hi there");
        let mut registry = AgentRegistry::new();
        registry
            .register(Agent::new("assistant", "be helpful", ModelConfig::new("mock")))
            .unwrap();

        let response = run(
            Arc::new(registry),
            "assistant",
            RunInput::Text("hello".to_string()),
            ContextCarrier::empty(),
            provider,
            RunOptions::default(),
        )
        .await;

        let mut rx = response.stream();
        while rx.recv().await.is_some() {}
        assert!(response.is_finished());
        assert_eq!(response.final_message().content, "hi there");
    }

    #[tokio::test]
    async fn agent_as_tool_returns_nested_final_message() {
        let provider = Arc::new(MockChatProvider::new());
        provider.queue_text("nested reply");
        let mut registry = AgentRegistry::new();
        registry
            .register(Agent::new("helper", "assist", ModelConfig::new("mock")))
            .unwrap();
        let registry = Arc::new(registry);

        let tool = AgentAsTool::new("ask_helper", "ask the helper agent", "helper", registry, provider);
        let ctx = ContextCarrier::empty();
        let output = tool
            .invoke(serde_json::json!({"prompt": "hi"}), &ctx)
            .await
            .unwrap();
        assert_eq!(output.into_content(), "nested reply");
    }
}
