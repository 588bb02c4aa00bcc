//! The agentic loop: stream a turn, dispatch tool calls (or follow a
//! handoff), and repeat until the model stops calling tools.
//!
//! Grounded in the teacher crate's `AgenticLoop::run_streaming`, generalized
//! to support multiple named agents and handoffs instead of a single fixed
//! system.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use futures::StreamExt;

use conduit_core::{Message, ToolCall};

use crate::agent::{Agent, AgentRegistry};
use crate::cancel::CancelToken;
use crate::context::ContextCarrier;
use crate::dispatcher::{dispatch_calls, DispatchError};
use crate::event::{Event, EventHub};
use crate::handoff::{resolve_handoff, synthesize_handoff_tools};
use crate::provider::{ChatProvider, Delta, ResponseFormat};
use crate::registry::ToolRegistry;
use crate::tool::ToolDefinition;

#[derive(Debug, thiserror::Error)]
pub enum LoopError {
    #[error("agent '{0}' is not registered")]
    UnknownAgent(String),
    #[error("a tool and a synthesized handoff tool both use the name '{0}'")]
    ToolNamespaceCollision(String),
    #[error("the model produced neither content nor a tool call")]
    EmptyCompletion,
    #[error("the run exceeded its iteration cap of {0}")]
    IterationCapExceeded(usize),
    #[error("structured output failed schema validation: {0}")]
    StructuredOutputInvalid(String),
    #[error("a hook rejected the run: {0}")]
    HookRejected(String),
    #[error("provider error: {0}")]
    Provider(String),
    #[error("the run was cancelled")]
    Cancelled,
}

/// Default cap on model turns within one run, guarding against infinite
/// tool-call/handoff loops.
pub const DEFAULT_MAX_ITERATIONS: usize = 10;

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub max_iterations: usize,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

#[derive(Debug, Clone)]
pub enum RunInput {
    Text(String),
    Conversation(Vec<Message>),
}

impl RunInput {
    fn into_messages(self) -> Vec<Message> {
        match self {
            RunInput::Text(text) => vec![Message::user(text)],
            RunInput::Conversation(messages) => messages,
        }
    }
}

#[derive(Default, Clone)]
struct PartialToolCall {
    id: String,
    name: String,
    arguments: String,
}

fn build_tool_registry(agent: &Agent) -> Result<(ToolRegistry, Vec<ToolDefinition>), LoopError> {
    let mut registry = ToolRegistry::new();
    for tool in &agent.tools {
        registry
            .register_arc(tool.clone())
            .map_err(|_| LoopError::ToolNamespaceCollision(tool.definition().name))?;
    }
    let mut defs = registry.list();
    for handoff_def in synthesize_handoff_tools(agent) {
        if registry.get(&handoff_def.name).is_some() {
            return Err(LoopError::ToolNamespaceCollision(handoff_def.name));
        }
        defs.push(handoff_def);
    }
    Ok((registry, defs))
}

/// Drives the loop to completion, publishing every event to `hub` and
/// closing it exactly once before returning.
pub async fn drive(
    registry: Arc<AgentRegistry>,
    starting_agent_name: String,
    input: RunInput,
    ctx: ContextCarrier,
    provider: Arc<dyn ChatProvider>,
    hub: EventHub,
    cancel: CancelToken,
    options: RunOptions,
) {
    if let Err(err) = drive_inner(
        registry,
        starting_agent_name,
        input,
        ctx,
        provider,
        &hub,
        cancel,
        options,
    )
    .await
    {
        hub.publish(Event::Error {
            message: err.to_string(),
            at: Utc::now(),
        });
    }
    hub.close();
}

async fn drive_inner(
    registry: Arc<AgentRegistry>,
    starting_agent_name: String,
    input: RunInput,
    ctx: ContextCarrier,
    provider: Arc<dyn ChatProvider>,
    hub: &EventHub,
    cancel: CancelToken,
    options: RunOptions,
) -> Result<(), LoopError> {
    let mut messages = input.into_messages();
    let mut current_agent_name = starting_agent_name.clone();
    let mut system_prompt_set = messages
        .first()
        .map(|m| m.role == conduit_core::Role::System)
        .unwrap_or(false);

    // Initial transition (§4.5, step 2): before_run fires exactly once, for
    // the starting agent, before the loop begins — not again on handoff.
    let starting_agent = registry
        .get(&starting_agent_name)
        .map_err(|_| LoopError::UnknownAgent(starting_agent_name.clone()))?;
    starting_agent
        .hooks
        .before_run(&starting_agent.name, &ctx)
        .await
        .map_err(|e| LoopError::HookRejected(e.to_string()))?;

    let mut iteration = 0usize;
    loop {
        if iteration == options.max_iterations {
            return Err(LoopError::IterationCapExceeded(options.max_iterations));
        }
        iteration += 1;

        if cancel.is_cancelled() {
            return Err(LoopError::Cancelled);
        }

        let agent = registry
            .get(&current_agent_name)
            .map_err(|_| LoopError::UnknownAgent(current_agent_name.clone()))?;

        if !system_prompt_set {
            messages.insert(0, Message::system(agent.instructions.resolve(&ctx)));
            system_prompt_set = true;
        }

        let (tool_registry, tool_defs) = build_tool_registry(&agent)?;

        let mut stream = provider
            .stream_chat(&agent.model_config, &messages, &tool_defs, &agent.response_format)
            .await
            .map_err(|e| LoopError::Provider(e.to_string()))?;

        let mut content = String::new();
        let mut tool_call_parts: BTreeMap<usize, PartialToolCall> = BTreeMap::new();
        let mut finish_reason = None;

        while let Some(item) = stream.next().await {
            if cancel.is_cancelled() {
                return Err(LoopError::Cancelled);
            }
            match item.map_err(|e| LoopError::Provider(e.to_string()))? {
                Delta::Content(text) => {
                    hub.publish(Event::Token {
                        text: text.clone(),
                        at: Utc::now(),
                    });
                    content.push_str(&text);
                }
                Delta::ToolCall(delta) => {
                    let entry = tool_call_parts.entry(delta.index).or_default();
                    if let Some(id) = delta.id {
                        entry.id = id;
                    }
                    if let Some(name) = delta.name {
                        entry.name = name;
                    }
                    if let Some(fragment) = delta.arguments_delta {
                        entry.arguments.push_str(&fragment);
                    }
                }
                Delta::Finish(reason) => {
                    finish_reason = Some(reason.clone());
                    hub.publish(Event::Finished { reason, at: Utc::now() });
                }
                Delta::Usage(_) => {}
            }
        }

        let tool_calls: Vec<ToolCall> = tool_call_parts
            .into_values()
            .map(|part| ToolCall {
                id: part.id,
                name: part.name,
                arguments: if part.arguments.is_empty() {
                    "{}".to_string()
                } else {
                    part.arguments
                },
            })
            .collect();

        if finish_reason.is_none() || (content.is_empty() && tool_calls.is_empty()) {
            return Err(LoopError::EmptyCompletion);
        }

        let assistant_message = if tool_calls.is_empty() {
            Message::assistant_text(content.clone(), Some(agent.name.clone()))
        } else {
            Message::assistant_tool_calls(content.clone(), tool_calls.clone(), Some(agent.name.clone()))
        };
        hub.publish(Event::Message {
            message: assistant_message.clone(),
            at: Utc::now(),
        });
        messages.push(assistant_message);

        if tool_calls.is_empty() {
            if let ResponseFormat::JsonSchema { schema, .. } = &agent.response_format {
                validate_structured_output(&content, schema)?;
            }
            agent
                .hooks
                .after_run(&agent.name, messages.last().unwrap(), &ctx)
                .await
                .map_err(|e| LoopError::HookRejected(e.to_string()))?;
            return Ok(());
        }

        let handoff_index = tool_calls
            .iter()
            .position(|call| resolve_handoff(&agent, &call.name).is_some());

        let (regular_calls, handoff_call, suppressed_calls): (Vec<ToolCall>, Option<ToolCall>, Vec<ToolCall>) =
            match handoff_index {
                Some(idx) => (
                    tool_calls[..idx].to_vec(),
                    Some(tool_calls[idx].clone()),
                    tool_calls[idx + 1..].to_vec(),
                ),
                None => (tool_calls.clone(), None, Vec::new()),
            };

        if !regular_calls.is_empty() {
            let results = dispatch_calls(
                regular_calls,
                Arc::new(tool_registry),
                ctx.clone(),
                agent.hooks.clone(),
                cancel.clone(),
            )
            .await;
            // Every already-completed result in this batch is published
            // before we act on a cancellation, so a cancelled call never
            // discards a sibling call that finished in the same dispatch.
            let mut any_cancelled = false;
            for result in results {
                let (content, is_error) = match result.outcome {
                    Ok(output) => (output, false),
                    Err(DispatchError::ToolCancelled) => {
                        any_cancelled = true;
                        continue;
                    }
                    Err(e) => (format!("error: {e}"), true),
                };
                hub.publish(Event::ToolResult {
                    call: result.call.clone(),
                    output: content.clone(),
                    is_error,
                    at: Utc::now(),
                });
                let tool_message = Message::tool_result(result.call.id, content);
                hub.publish(Event::Message {
                    message: tool_message.clone(),
                    at: Utc::now(),
                });
                messages.push(tool_message);
            }
            if any_cancelled {
                return Err(LoopError::Cancelled);
            }
        }

        if let Some(call) = handoff_call {
            let handoff = resolve_handoff(&agent, &call.name)
                .expect("handoff_index was computed from resolve_handoff")
                .clone();
            let prompt = crate::handoff::extract_prompt(&call.arguments);
            let tool_message = Message::tool_result(call.id, "handoff_executed");
            hub.publish(Event::Message {
                message: tool_message.clone(),
                at: Utc::now(),
            });
            messages.push(tool_message);
            hub.publish(Event::Handoff {
                from_agent: agent.name.clone(),
                to_agent: handoff.target_agent_name.clone(),
                prompt,
                at: Utc::now(),
            });
            current_agent_name = handoff.target_agent_name;
        }

        for suppressed in suppressed_calls {
            let tool_message = Message::tool_result(
                suppressed.id,
                "skipped: a handoff was already dispatched for this turn",
            );
            hub.publish(Event::Message {
                message: tool_message.clone(),
                at: Utc::now(),
            });
            messages.push(tool_message);
        }
    }
}

fn validate_structured_output(content: &str, schema: &serde_json::Value) -> Result<(), LoopError> {
    let value: serde_json::Value = serde_json::from_str(content)
        .map_err(|e| LoopError::StructuredOutputInvalid(format!("not valid JSON: {e}")))?;
    let validator = jsonschema::validator_for(schema)
        .map_err(|e| LoopError::StructuredOutputInvalid(format!("invalid schema: {e}")))?;
    if let Err(e) = validator.validate(&value) {
        return Err(LoopError::StructuredOutputInvalid(e.to_string()));
    }
    Ok(())
}
