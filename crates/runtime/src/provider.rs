//! Streaming chat-completion provider contract.
//!
//! This trait lives in `conduit-runtime` (not in `conduit-llm`) because it's
//! defined by the consumer — the agent loop — not by any particular
//! provider. Concrete implementations (e.g. an OpenAI-compatible SSE client)
//! live in `conduit-llm` and depend on this crate, mirroring the teacher
//! crate's `tool-runtime` / `llm` split.

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

use conduit_core::Message;

use crate::tool::ToolDefinition;

/// Model selection and sampling parameters for one provider call.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub model: String,
    pub base_url: Option<String>,
    pub temperature: Option<f32>,
}

impl ModelConfig {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            base_url: None,
            temperature: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// Constrains the final assistant message to validate against a JSON Schema.
#[derive(Debug, Clone, Default)]
pub enum ResponseFormat {
    #[default]
    Text,
    JsonSchema {
        name: String,
        description: Option<String>,
        schema: serde_json::Value,
        strict: bool,
    },
}

/// A partial tool-call update, addressed by the provider-assigned index so
/// fragments across deltas can be merged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolCallDelta {
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub arguments_delta: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FinishReason {
    Stop,
    ToolCalls,
    Length,
    ContentFilter,
    Other(String),
}

#[derive(Debug, Clone, Default)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

/// One incremental update from the provider's streaming chat endpoint.
#[derive(Debug, Clone)]
pub enum Delta {
    Content(String),
    ToolCall(ToolCallDelta),
    Finish(FinishReason),
    Usage(Usage),
}

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },
    #[error("network error: {0}")]
    NetworkError(String),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("rate limited: retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },
    #[error("authentication failed")]
    AuthError,
    #[error("stream error: {0}")]
    StreamError(String),
}

pub type DeltaStream = Pin<Box<dyn Stream<Item = Result<Delta, LlmError>> + Send>>;

/// Trait for LLM providers that support tool use and streaming.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    async fn stream_chat(
        &self,
        model_cfg: &ModelConfig,
        messages: &[Message],
        tools: &[ToolDefinition],
        response_format: &ResponseFormat,
    ) -> Result<DeltaStream, LlmError>;

    /// Provider name for logging/debugging (e.g. "openai", "mock").
    fn provider_name(&self) -> &str;
}

/// Mock provider for testing the agent loop without real API calls.
#[cfg(any(test, feature = "test-utils"))]
pub mod mock {
    use super::*;
    use futures::stream;
    use std::sync::Mutex;

    pub struct MockChatProvider {
        responses: Mutex<Vec<Vec<Delta>>>,
    }

    impl MockChatProvider {
        pub fn new() -> Self {
            Self {
                responses: Mutex::new(Vec::new()),
            }
        }

        /// Queue a response. Responses are returned in FIFO order.
        pub fn queue_response(&self, deltas: Vec<Delta>) {
            self.responses.lock().unwrap().push(deltas);
        }

        pub fn queue_text(&self, text: &str) {
            self.queue_response(vec![
                Delta::Content(text.to_string()),
                Delta::Finish(FinishReason::Stop),
            ]);
        }
    }

    impl Default for MockChatProvider {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl ChatProvider for MockChatProvider {
        async fn stream_chat(
            &self,
            _model_cfg: &ModelConfig,
            _messages: &[Message],
            _tools: &[ToolDefinition],
            _response_format: &ResponseFormat,
        ) -> Result<DeltaStream, LlmError> {
            let mut queue = self.responses.lock().unwrap();
            let deltas = if queue.is_empty() {
                vec![Delta::Finish(FinishReason::Stop)]
            } else {
                queue.remove(0)
            };
            Ok(Box::pin(stream::iter(deltas.into_iter().map(Ok))))
        }

        fn provider_name(&self) -> &str {
            "mock"
        }
    }
}
