//! A `ChatProvider` for OpenAI-compatible Chat Completions endpoints
//! (OpenAI itself, and the many self-hosted servers that mirror its wire
//! format), with SSE streaming.
//!
//! Grounded in the teacher crate's `ClaudeToolProvider`: same request/stream
//! shape, retargeted at `choices[0].delta.{content,tool_calls}` instead of
//! Anthropic content blocks.

use async_trait::async_trait;
use futures::stream::{self, Stream, StreamExt};
use serde_json::json;
use std::pin::Pin;
use tracing::debug;

use conduit_core::Message;
use conduit_runtime::{ChatProvider, Delta, DeltaStream, LlmError, ModelConfig, ResponseFormat, ToolDefinition};

use super::sse::{SseLine, SseLineBuffer};
use super::translate::{message_to_openai, parse_chunk, tool_definition_to_openai};

pub struct OpenAiCompatibleProvider {
    client: reqwest::Client,
    api_key: String,
    default_base_url: String,
}

impl OpenAiCompatibleProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            default_base_url: "https://api.openai.com/v1".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.default_base_url = base_url.into();
        self
    }
}

#[async_trait]
impl ChatProvider for OpenAiCompatibleProvider {
    async fn stream_chat(
        &self,
        model_cfg: &ModelConfig,
        messages: &[Message],
        tools: &[ToolDefinition],
        response_format: &ResponseFormat,
    ) -> Result<DeltaStream, LlmError> {
        let base_url = model_cfg.base_url.as_deref().unwrap_or(&self.default_base_url);
        let url = format!("{base_url}/chat/completions");

        let api_messages: Vec<_> = messages.iter().map(message_to_openai).collect();
        let mut body = json!({
            "model": model_cfg.model,
            "messages": api_messages,
            "stream": true,
        });
        if let Some(temperature) = model_cfg.temperature {
            body["temperature"] = json!(temperature);
        }
        if !tools.is_empty() {
            body["tools"] = json!(tools.iter().map(tool_definition_to_openai).collect::<Vec<_>>());
        }
        match response_format {
            ResponseFormat::Text => {}
            ResponseFormat::JsonSchema {
                name,
                description,
                schema,
                strict,
            } => {
                body["response_format"] = json!({
                    "type": "json_schema",
                    "json_schema": {
                        "name": name,
                        "description": description,
                        "schema": schema,
                        "strict": strict,
                    }
                });
            }
        }

        debug!(model = %model_cfg.model, url = %url, "starting chat completion stream");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::NetworkError(e.to_string()))?;

        let status = response.status().as_u16();
        if status != 200 {
            let body_text = response.text().await.unwrap_or_default();
            if status == 401 {
                return Err(LlmError::AuthError);
            }
            if status == 429 {
                let retry_after = serde_json::from_str::<serde_json::Value>(&body_text)
                    .ok()
                    .and_then(|v| v["error"]["retry_after_secs"].as_u64())
                    .unwrap_or(30);
                return Err(LlmError::RateLimited {
                    retry_after_secs: retry_after,
                });
            }
            return Err(LlmError::ApiError {
                status,
                message: body_text,
            });
        }

        let byte_stream = response.bytes_stream();

        type ByteStream = Pin<Box<dyn Stream<Item = Result<bytes::Bytes, reqwest::Error>> + Send>>;

        struct State {
            bytes: ByteStream,
            lines: SseLineBuffer,
            pending: Vec<Delta>,
            done: bool,
        }

        let state = State {
            bytes: Box::pin(byte_stream),
            lines: SseLineBuffer::new(),
            pending: Vec::new(),
            done: false,
        };

        let delta_stream = stream::unfold(state, |mut state| async move {
            loop {
                if let Some(delta) = state.pending.pop() {
                    return Some((Ok(delta), state));
                }
                if state.done {
                    return None;
                }

                match state.lines.next_line() {
                    Some(SseLine::Done) => {
                        state.done = true;
                        continue;
                    }
                    Some(SseLine::Data(data)) => {
                        let mut deltas = parse_chunk(&data);
                        deltas.reverse();
                        state.pending = deltas;
                        continue;
                    }
                    None => match state.bytes.next().await {
                        Some(Ok(chunk)) => {
                            state.lines.push(&chunk);
                            continue;
                        }
                        Some(Err(e)) => {
                            return Some((Err(LlmError::StreamError(e.to_string())), state));
                        }
                        None => {
                            state.done = true;
                            continue;
                        }
                    },
                }
            }
        });

        Ok(Box::pin(delta_stream))
    }

    fn provider_name(&self) -> &str {
        "openai-compatible"
    }
}
