//! Agent definitions and the registry that resolves handoffs by name.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::context::ContextCarrier;
use crate::hooks::{AgentHooks, NoopHooks};
use crate::provider::{ModelConfig, ResponseFormat};
use crate::tool::Tool;

/// An agent's system prompt, either fixed or computed per-run from the
/// current context carrier (e.g. to inject a session id or user profile).
#[derive(Clone)]
pub enum Instructions {
    Literal(String),
    Dynamic(Arc<dyn Fn(&ContextCarrier) -> String + Send + Sync>),
}

impl Instructions {
    pub fn resolve(&self, ctx: &ContextCarrier) -> String {
        match self {
            Instructions::Literal(s) => s.clone(),
            Instructions::Dynamic(f) => f(ctx),
        }
    }
}

impl fmt::Debug for Instructions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instructions::Literal(s) => f.debug_tuple("Literal").field(s).finish(),
            Instructions::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

impl From<&str> for Instructions {
    fn from(value: &str) -> Self {
        Instructions::Literal(value.to_string())
    }
}

impl From<String> for Instructions {
    fn from(value: String) -> Self {
        Instructions::Literal(value)
    }
}

/// Declares that an agent can transfer control to another named agent.
///
/// The loop synthesizes a tool for this at run start; see [`crate::handoff`].
#[derive(Debug, Clone)]
pub struct Handoff {
    pub target_agent_name: String,
    pub tool_name: Option<String>,
    pub tool_description: Option<String>,
}

impl Handoff {
    pub fn to(target_agent_name: impl Into<String>) -> Self {
        Self {
            target_agent_name: target_agent_name.into(),
            tool_name: None,
            tool_description: None,
        }
    }

    pub fn with_tool_name(mut self, name: impl Into<String>) -> Self {
        self.tool_name = Some(name.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.tool_description = Some(description.into());
        self
    }
}

/// One participant in the run: instructions, model config, its own tools,
/// and the agents it may hand control off to.
pub struct Agent {
    pub name: String,
    pub instructions: Instructions,
    pub model_config: ModelConfig,
    pub tools: Vec<Arc<dyn Tool>>,
    pub handoffs: Vec<Handoff>,
    pub hooks: Arc<dyn AgentHooks>,
    pub response_format: ResponseFormat,
}

impl Agent {
    pub fn new(name: impl Into<String>, instructions: impl Into<Instructions>, model_config: ModelConfig) -> Self {
        Self {
            name: name.into(),
            instructions: instructions.into(),
            model_config,
            tools: Vec::new(),
            handoffs: Vec::new(),
            hooks: Arc::new(NoopHooks),
            response_format: ResponseFormat::Text,
        }
    }

    pub fn with_tool(mut self, tool: impl Tool + 'static) -> Self {
        self.tools.push(Arc::new(tool));
        self
    }

    pub fn with_handoff(mut self, handoff: Handoff) -> Self {
        self.handoffs.push(handoff);
        self
    }

    pub fn with_hooks(mut self, hooks: impl AgentHooks + 'static) -> Self {
        self.hooks = Arc::new(hooks);
        self
    }

    pub fn with_response_format(mut self, response_format: ResponseFormat) -> Self {
        self.response_format = response_format;
        self
    }
}

impl fmt::Debug for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Agent")
            .field("name", &self.name)
            .field("tools", &self.tools.len())
            .field("handoffs", &self.handoffs)
            .finish()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AgentRegistryError {
    #[error("no agent named '{0}' is registered")]
    UnknownAgent(String),
    #[error("agent name '{0}' is already registered")]
    DuplicateName(String),
}

/// Owns every agent in a handoff graph by name, so cyclic handoffs (A -> B ->
/// A) don't require owned cyclic pointers between `Agent` values.
#[derive(Default)]
pub struct AgentRegistry {
    agents: HashMap<String, Arc<Agent>>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self {
            agents: HashMap::new(),
        }
    }

    pub fn register(&mut self, agent: Agent) -> Result<(), AgentRegistryError> {
        if self.agents.contains_key(&agent.name) {
            return Err(AgentRegistryError::DuplicateName(agent.name));
        }
        self.agents.insert(agent.name.clone(), Arc::new(agent));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<Arc<Agent>, AgentRegistryError> {
        self.agents
            .get(name)
            .cloned()
            .ok_or_else(|| AgentRegistryError::UnknownAgent(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.agents.contains_key(name)
    }
}
