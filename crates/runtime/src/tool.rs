//! Tool description and the `Tool` extension point.
//!
//! Mirrors the shape the teacher crate sends to Claude/OpenAI: a name, a
//! human-readable description, and a JSON-Schema-shaped parameter object —
//! but built here from a small typed field model instead of hand-written
//! `serde_json::json!` literals, since schema *generation* from a Rust type
//! is out of scope and callers otherwise tend to hand-roll inconsistent
//! schemas.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::fmt;

use crate::context::ContextCarrier;

/// The shape of one parameter accepted by a tool.
#[derive(Debug, Clone)]
pub enum ParamType {
    String,
    Number,
    Boolean,
    Array(Box<ParamType>),
    Object(Vec<ParamField>),
}

impl ParamType {
    fn to_schema(&self) -> Value {
        match self {
            ParamType::String => serde_json::json!({ "type": "string" }),
            ParamType::Number => serde_json::json!({ "type": "number" }),
            ParamType::Boolean => serde_json::json!({ "type": "boolean" }),
            ParamType::Array(item) => serde_json::json!({
                "type": "array",
                "items": item.to_schema(),
            }),
            ParamType::Object(fields) => object_schema(fields),
        }
    }
}

/// A single field in a tool's parameter object.
#[derive(Debug, Clone)]
pub struct ParamField {
    /// The field identifier as it appears in the JSON arguments.
    /// Defaults to the snake-case of the declared identifier; override here.
    pub json_name: String,
    pub param_type: ParamType,
    pub required: bool,
    pub description: String,
}

impl ParamField {
    pub fn new(json_name: impl Into<String>, param_type: ParamType) -> Self {
        Self {
            json_name: json_name.into(),
            param_type,
            required: false,
            description: String::new(),
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn described(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

fn object_schema(fields: &[ParamField]) -> Value {
    let mut properties = serde_json::Map::new();
    let mut required = Vec::new();
    for field in fields {
        let mut schema = field.param_type.to_schema();
        if !field.description.is_empty() {
            schema["description"] = Value::String(field.description.clone());
        }
        properties.insert(field.json_name.clone(), schema);
        if field.required {
            required.push(Value::String(field.json_name.clone()));
        }
    }
    serde_json::json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

/// Describes a tool's interface for LLM consumption.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

impl ToolDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>, fields: &[ParamField]) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema: object_schema(fields),
        }
    }
}

impl fmt::Display for ToolDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.description)
    }
}

/// The opaque value a tool hands back, which the dispatcher renders to a
/// string for the tool-role message.
#[derive(Debug, Clone)]
pub enum ToolOutput {
    Text(String),
    Bytes(Vec<u8>),
    Json(Value),
}

impl ToolOutput {
    pub fn into_content(self) -> String {
        match self {
            ToolOutput::Text(s) => s,
            ToolOutput::Bytes(b) => String::from_utf8_lossy(&b).into_owned(),
            ToolOutput::Json(v) => {
                serde_json::to_string(&v).unwrap_or_else(|_| format!("{v:?}"))
            }
        }
    }
}

impl From<String> for ToolOutput {
    fn from(value: String) -> Self {
        ToolOutput::Text(value)
    }
}

impl From<&str> for ToolOutput {
    fn from(value: &str) -> Self {
        ToolOutput::Text(value.to_string())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("invalid tool arguments: {0}")]
    ToolArgsInvalid(String),
    #[error("tool invocation failed: {0}")]
    ToolInvocationError(String),
    #[error("unknown tool: {0}")]
    UnknownTool(String),
    #[error("context carrier is empty")]
    NoContext,
    #[error("context carrier holds the wrong type")]
    ContextTypeMismatch,
}

impl From<crate::context::ContextError> for ToolError {
    fn from(err: crate::context::ContextError) -> Self {
        match err {
            crate::context::ContextError::NoContext => ToolError::NoContext,
            crate::context::ContextError::ContextTypeMismatch { .. } => {
                ToolError::ContextTypeMismatch
            }
        }
    }
}

/// The primary extension point: all tools implement this trait.
///
/// A tool that never touches `ctx` is the "non-contextual" flavor described
/// in the design notes; one that calls [`ContextCarrier::get`] is the
/// "contextual" flavor — the distinction lives entirely in the
/// implementation, not in a separate dispatch path.
#[async_trait]
pub trait Tool: Send + Sync {
    fn definition(&self) -> ToolDefinition;

    async fn invoke(&self, args: Value, ctx: &ContextCarrier) -> Result<ToolOutput, ToolError>;
}

/// Simple echo tool, useful for wiring tests and demos.
pub struct EchoTool;

#[async_trait]
impl Tool for EchoTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "echo",
            "Echoes back the input message. For testing.",
            &[ParamField::new("message", ParamType::String)
                .required()
                .described("The message to echo back")],
        )
    }

    async fn invoke(&self, args: Value, _ctx: &ContextCarrier) -> Result<ToolOutput, ToolError> {
        let message = args
            .get("message")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolError::ToolArgsInvalid("missing 'message' field".to_string()))?;
        Ok(ToolOutput::Text(message.to_string()))
    }
}
