use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::context::ContextCarrier;
use crate::tool::{Tool, ToolDefinition, ToolError};

/// Manages available tools, their schemas, and name-based lookup.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool. Returns an error if the name is already registered —
    /// this is the namespace check from §4.2, applied uniformly to real
    /// tools and, at loop start, to synthesized handoff tools.
    pub fn register(&mut self, tool: impl Tool + 'static) -> Result<(), RegistryError> {
        let def = tool.definition();
        if self.tools.contains_key(&def.name) {
            return Err(RegistryError::DuplicateName(def.name));
        }
        self.tools.insert(def.name, Arc::new(tool));
        Ok(())
    }

    pub fn register_arc(&mut self, tool: Arc<dyn Tool>) -> Result<(), RegistryError> {
        let name = tool.definition().name;
        if self.tools.contains_key(&name) {
            return Err(RegistryError::DuplicateName(name));
        }
        self.tools.insert(name, tool);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn list(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|t| t.definition()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Parse `args_string`, then dispatch to the resolved tool. Preserves the
    /// raw argument string on parse failure so the caller can surface it.
    pub async fn invoke(
        &self,
        name: &str,
        args_string: &str,
        ctx: &ContextCarrier,
    ) -> Result<Value, ToolError> {
        let tool = self
            .get(name)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;
        let args: Value = serde_json::from_str(args_string)
            .map_err(|_| ToolError::ToolArgsInvalid(args_string.to_string()))?;
        tool.invoke(args, ctx).await.map(|out| match out {
            crate::tool::ToolOutput::Json(v) => v,
            other => Value::String(other.into_content()),
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("tool with name '{0}' is already registered")]
    DuplicateName(String),
}
