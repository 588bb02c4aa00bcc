//! Parallel tool-call dispatch, preserving result order by input index.
//!
//! Each call runs on its own `tokio::spawn`'d task so a slow tool doesn't
//! block its siblings; `futures::future::join_all` then collects results in
//! the same order the calls were spawned in, regardless of completion order.

use std::sync::Arc;

use conduit_core::ToolCall;

use crate::cancel::CancelToken;
use crate::context::ContextCarrier;
use crate::hooks::AgentHooks;
use crate::registry::ToolRegistry;
use crate::tool::ToolError;

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error(transparent)]
    Tool(#[from] ToolError),
    #[error("tool call was cancelled before it started")]
    ToolCancelled,
    #[error("tool task panicked: {0}")]
    ToolPanicked(String),
    #[error("hook rejected tool call: {0}")]
    HookRejected(String),
}

/// One call's outcome, always in the same slot as its input `ToolCall`.
pub struct DispatchResult {
    pub call: ToolCall,
    pub outcome: Result<String, DispatchError>,
}

/// Runs every call in `calls` concurrently against `registry`, invoking
/// `hooks` around each, and returns results in the same order as `calls`.
pub async fn dispatch_calls(
    calls: Vec<ToolCall>,
    registry: Arc<ToolRegistry>,
    ctx: ContextCarrier,
    hooks: Arc<dyn AgentHooks>,
    cancel: CancelToken,
) -> Vec<DispatchResult> {
    let tasks = calls.into_iter().map(|call| {
        let registry = registry.clone();
        let ctx = ctx.clone();
        let hooks = hooks.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { run_one(call, registry, ctx, hooks, cancel).await })
    });

    let joined = futures::future::join_all(tasks).await;
    joined
        .into_iter()
        .map(|joined| match joined {
            Ok(result) => result,
            // The call is gone (consumed by the spawned task before it
            // panicked or was cancelled); callers needing it should read it
            // back off the original input list by position.
            Err(join_err) => DispatchResult {
                call: ToolCall {
                    id: String::new(),
                    name: String::new(),
                    arguments: String::new(),
                },
                outcome: Err(DispatchError::ToolPanicked(join_err.to_string())),
            },
        })
        .collect()
}

async fn run_one(
    call: ToolCall,
    registry: Arc<ToolRegistry>,
    ctx: ContextCarrier,
    hooks: Arc<dyn AgentHooks>,
    cancel: CancelToken,
) -> DispatchResult {
    if cancel.is_cancelled() {
        return DispatchResult {
            call,
            outcome: Err(DispatchError::ToolCancelled),
        };
    }

    let args: serde_json::Value = match serde_json::from_str(&call.arguments) {
        Ok(v) => v,
        Err(_) => {
            return DispatchResult {
                call: call.clone(),
                outcome: Err(DispatchError::Tool(ToolError::ToolArgsInvalid(
                    call.arguments.clone(),
                ))),
            };
        }
    };

    if let Err(e) = hooks.before_tool_call(&call.name, &args, &ctx).await {
        return DispatchResult {
            call,
            outcome: Err(DispatchError::HookRejected(e.to_string())),
        };
    }

    let tool = match registry.get(&call.name) {
        Some(t) => t,
        None => {
            return DispatchResult {
                call: call.clone(),
                outcome: Err(DispatchError::Tool(ToolError::UnknownTool(call.name.clone()))),
            };
        }
    };

    let outcome = tool.invoke(args, &ctx).await.map(|out| out.into_content());

    if let Ok(content) = &outcome {
        // Hook failures after a successful call surface as the call's own
        // error; the tool ran, but the run can't continue past it.
        if let Err(e) = hooks.after_tool_call(&call.name, content, &ctx).await {
            return DispatchResult {
                call,
                outcome: Err(DispatchError::HookRejected(e.to_string())),
            };
        }
    }

    DispatchResult {
        call,
        outcome: outcome.map_err(DispatchError::Tool),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::NoopHooks;
    use crate::tool::EchoTool;

    fn calls(n: usize) -> Vec<ToolCall> {
        (0..n)
            .map(|i| ToolCall {
                id: format!("call_{i}"),
                name: "echo".to_string(),
                arguments: format!(r#"{{"message":"{i}"}}"#),
            })
            .collect()
    }

    #[tokio::test]
    async fn results_preserve_input_order() {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool).unwrap();
        let results = dispatch_calls(
            calls(5),
            Arc::new(registry),
            ContextCarrier::empty(),
            Arc::new(NoopHooks),
            CancelToken::new(),
        )
        .await;
        assert_eq!(results.len(), 5);
        for (i, result) in results.iter().enumerate() {
            assert_eq!(result.call.id, format!("call_{i}"));
            assert_eq!(result.outcome.as_deref().unwrap(), i.to_string());
        }
    }

    #[tokio::test]
    async fn unknown_tool_reports_unknown_tool_error() {
        let registry = ToolRegistry::new();
        let results = dispatch_calls(
            vec![ToolCall {
                id: "call_0".into(),
                name: "missing".into(),
                arguments: "{}".into(),
            }],
            Arc::new(registry),
            ContextCarrier::empty(),
            Arc::new(NoopHooks),
            CancelToken::new(),
        )
        .await;
        assert!(matches!(
            results[0].outcome,
            Err(DispatchError::Tool(ToolError::UnknownTool(_)))
        ));
    }

    #[tokio::test]
    async fn cancelled_token_short_circuits_calls() {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool).unwrap();
        let cancel = CancelToken::new();
        cancel.cancel();
        let results = dispatch_calls(
            calls(1),
            Arc::new(registry),
            ContextCarrier::empty(),
            Arc::new(NoopHooks),
            cancel,
        )
        .await;
        assert!(matches!(results[0].outcome, Err(DispatchError::ToolCancelled)));
    }

    #[tokio::test]
    async fn invalid_arguments_are_reported_with_raw_call_preserved() {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool).unwrap();
        let results = dispatch_calls(
            vec![ToolCall {
                id: "call_0".into(),
                name: "echo".into(),
                arguments: "not json".into(),
            }],
            Arc::new(registry),
            ContextCarrier::empty(),
            Arc::new(NoopHooks),
            CancelToken::new(),
        )
        .await;
        assert_eq!(results[0].call.id, "call_0");
        assert!(matches!(
            results[0].outcome,
            Err(DispatchError::Tool(ToolError::ToolArgsInvalid(_)))
        ));
    }
}
