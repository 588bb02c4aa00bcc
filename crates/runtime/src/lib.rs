//! Streaming agent execution runtime: the agentic loop, typed tool
//! dispatch, a replayable event stream, and named-agent handoffs.

pub mod agent;
pub mod cancel;
pub mod context;
pub mod dispatcher;
pub mod event;
pub mod handoff;
pub mod hooks;
pub mod loop_engine;
pub mod provider;
pub mod registry;
pub mod response;
pub mod run;
pub mod tool;

pub use agent::{Agent, AgentRegistry, AgentRegistryError, Handoff, Instructions};
pub use cancel::CancelToken;
pub use context::{ContextCarrier, ContextError};
pub use dispatcher::{DispatchError, DispatchResult};
pub use event::{Event, EventHub};
pub use hooks::{AgentHooks, HookError, NoopHooks};
pub use loop_engine::{LoopError, RunInput, RunOptions, DEFAULT_MAX_ITERATIONS};
pub use provider::{ChatProvider, Delta, DeltaStream, FinishReason, LlmError, ModelConfig, ResponseFormat, ToolCallDelta, Usage};
pub use registry::{RegistryError, ToolRegistry};
pub use response::Response;
pub use run::{run, AgentAsTool};
pub use tool::{ParamField, ParamType, Tool, ToolDefinition, ToolError, ToolOutput};

#[cfg(any(test, feature = "test-utils"))]
pub use provider::mock;
