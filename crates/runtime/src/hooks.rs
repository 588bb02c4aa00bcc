//! Lifecycle hooks an embedder can attach to an agent's run.
//!
//! Default no-op methods mean a hook implementor only overrides the points
//! it cares about, matching the teacher crate's permission-hook shape in
//! `permission.rs`.

use async_trait::async_trait;
use serde_json::Value;

use conduit_core::Message;

use crate::context::ContextCarrier;

#[derive(Debug, thiserror::Error)]
pub enum HookError {
    #[error("hook rejected the run: {0}")]
    Rejected(String),
}

/// Observation and interception points around the agent loop.
///
/// Any method returning `Err` aborts the run; the error surfaces to the
/// caller as the run's terminal event rather than as a panic.
#[async_trait]
pub trait AgentHooks: Send + Sync {
    async fn before_run(&self, _agent_name: &str, _ctx: &ContextCarrier) -> Result<(), HookError> {
        Ok(())
    }

    async fn after_run(
        &self,
        _agent_name: &str,
        _final_message: &Message,
        _ctx: &ContextCarrier,
    ) -> Result<(), HookError> {
        Ok(())
    }

    async fn before_tool_call(
        &self,
        _tool_name: &str,
        _args: &Value,
        _ctx: &ContextCarrier,
    ) -> Result<(), HookError> {
        Ok(())
    }

    async fn after_tool_call(
        &self,
        _tool_name: &str,
        _output: &str,
        _ctx: &ContextCarrier,
    ) -> Result<(), HookError> {
        Ok(())
    }
}

/// The hook set used when an agent doesn't configure its own.
pub struct NoopHooks;

impl AgentHooks for NoopHooks {}
