use serde::{Deserialize, Serialize};

/// The role a [`Message`] plays in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// An LLM requesting execution of a tool. The id is opaque and model-assigned;
/// it is preserved verbatim so the provider can reconcile it with the result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    /// Raw JSON text for the tool's parameters, exactly as the model produced it.
    pub arguments: String,
}

/// A single turn in the conversation record.
///
/// Invariant (enforced by the loop, not by this type): a `Role::Tool` message
/// must carry a `tool_call_id` matching some prior assistant `ToolCall`, and an
/// assistant message with non-empty `tool_calls` must be followed — before the
/// next assistant turn — by one tool message per call, in the same order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    /// Populated on assistant messages to record the emitting agent.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub name: Option<String>,
    /// Present only on assistant role.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub tool_calls: Vec<ToolCall>,
    /// Populated only on tool role, linking this message to the call it answers.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub tool_call_id: Option<String>,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
            name: None,
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            name: None,
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn assistant_text(content: impl Into<String>, name: Option<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            name,
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn assistant_tool_calls(
        content: impl Into<String>,
        tool_calls: Vec<ToolCall>,
        name: Option<String>,
    ) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            name,
            tool_calls,
            tool_call_id: None,
        }
    }

    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: content.into(),
            name: None,
            tool_calls: Vec::new(),
            tool_call_id: Some(tool_call_id.into()),
        }
    }
}

impl Default for Message {
    /// The empty assistant message returned by `final_message()` when a run
    /// never produced one.
    fn default() -> Self {
        Self {
            role: Role::Assistant,
            content: String::new(),
            name: None,
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }
}
