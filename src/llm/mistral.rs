//! Streaming client for Mistral's OpenAI-compatible chat completions API.

use async_stream::try_stream;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::StatusCode;
use reqwest_eventsource::{Error as SseError, Event as SseEvent, RequestBuilderExt};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::config::Config;

use super::{ChatMessage, LlmError, ProviderStream, StreamEvent, StreamingClient, ToolCallRequest};

/// Client for `POST {base_url}/v1/chat/completions` with `stream: true`.
pub struct MistralClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl MistralClient {
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        }
    }
}

#[async_trait]
impl StreamingClient for MistralClient {
    async fn open(
        &self,
        messages: &[ChatMessage],
        manifest: &[Value],
    ) -> Result<ProviderStream, LlmError> {
        let url = format!("{}/v1/chat/completions", self.base_url);

        let mut body = json!({
            "model": self.model,
            "messages": messages,
            "stream": true,
        });
        if !manifest.is_empty() {
            body["tools"] = Value::Array(manifest.to_vec());
        }

        let request = self.http.post(&url).bearer_auth(&self.api_key).json(&body);
        let mut source = request
            .eventsource()
            .map_err(|e| LlmError::Transport(e.to_string()))?;

        let events = try_stream! {
            while let Some(event) = source.next().await {
                match event {
                    Ok(SseEvent::Open) => {}
                    Ok(SseEvent::Message(message)) => {
                        if message.data.trim() == "[DONE]" {
                            source.close();
                            yield StreamEvent::Completed;
                            break;
                        }

                        let chunk: ChatChunk = serde_json::from_str(&message.data)
                            .map_err(|e| {
                                LlmError::Transport(format!("malformed stream chunk: {}", e))
                            })?;

                        let (events, finished) = chunk_events(chunk);
                        for event in events {
                            yield event;
                        }
                        if finished {
                            // Terminal signal seen; the rest of the response
                            // carries nothing meaningful.
                            source.close();
                            break;
                        }
                    }
                    Err(SseError::StreamEnded) => {
                        source.close();
                        break;
                    }
                    Err(e) => {
                        source.close();
                        Err(map_stream_error(e).await)?;
                    }
                }
            }
        };

        Ok(ProviderStream::new(events))
    }
}

/// One SSE chunk of a streamed chat completion.
#[derive(Debug, Deserialize)]
struct ChatChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ToolCallChunk>>,
}

#[derive(Debug, Deserialize)]
struct ToolCallChunk {
    #[serde(default)]
    id: Option<String>,
    function: FunctionChunk,
}

#[derive(Debug, Deserialize)]
struct FunctionChunk {
    name: String,
    #[serde(default)]
    arguments: String,
}

/// Map one parsed chunk to stream events. The bool is true when the chunk
/// carried the terminal `stop` signal.
fn chunk_events(chunk: ChatChunk) -> (Vec<StreamEvent>, bool) {
    let mut events = Vec::new();

    let Some(choice) = chunk.choices.into_iter().next() else {
        return (events, false);
    };

    if choice.finish_reason.as_deref() == Some("tool_calls") {
        for call in choice.delta.tool_calls.unwrap_or_default() {
            events.push(StreamEvent::ToolCallRequested(ToolCallRequest {
                id: call
                    .id
                    .unwrap_or_else(|| format!("call_{}", uuid::Uuid::new_v4().simple())),
                name: call.function.name,
                arguments: if call.function.arguments.is_empty() {
                    "{}".to_string()
                } else {
                    call.function.arguments
                },
            }));
        }
        return (events, false);
    }

    if let Some(content) = choice.delta.content {
        if !content.is_empty() {
            events.push(StreamEvent::TextDelta(content));
        }
    }

    if choice.finish_reason.as_deref() == Some("stop") {
        events.push(StreamEvent::Completed);
        return (events, true);
    }

    (events, false)
}

async fn map_stream_error(error: SseError) -> LlmError {
    match error {
        SseError::InvalidStatusCode(status, response) => {
            let body = response.text().await.unwrap_or_default();
            let detail = format!("{}: {}", status, body.chars().take(200).collect::<String>());
            if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                LlmError::Auth(detail)
            } else {
                LlmError::Transport(detail)
            }
        }
        other => LlmError::Transport(other.to_string()),
    }
}
