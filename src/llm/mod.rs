//! Provider protocol types and the streaming client seam.
//!
//! One provider response is consumed as a sequence of [`StreamEvent`]s:
//! text deltas, at most one tool-call request, and a terminal completion
//! signal. The [`StreamingClient`] trait is the seam the agent loop talks
//! through, so the loop can be driven by a scripted client in tests.

use std::pin::Pin;

use async_trait::async_trait;
use futures::stream::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use thiserror::Error;

mod mistral;

pub use mistral::MistralClient;

/// Failure opening or reading a provider response. Terminal for the current
/// turn; retry policy, if any, belongs to the caller.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("provider rejected credentials: {0}")]
    Auth(String),

    #[error("provider transport failure: {0}")]
    Transport(String),
}

/// Conversation role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// One message of the conversation transcript.
///
/// A `tool` message carries the `tool_call_id` of the call it answers; every
/// other role leaves it unset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
            tool_call_id: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            tool_call_id: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            tool_call_id: None,
        }
    }

    pub fn tool(content: impl Into<String>, tool_call_id: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: content.into(),
            tool_call_id: Some(tool_call_id.into()),
        }
    }
}

/// A tool invocation requested by the model mid-stream.
///
/// `arguments` is the raw JSON-encoded object; decoding it is the agent
/// loop's job, not the client's.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCallRequest {
    pub id: String,
    pub name: String,
    pub arguments: String,
}

/// One incremental event of a provider response.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    /// A fragment of generated text.
    TextDelta(String),
    /// The model wants a tool executed before it continues.
    ToolCallRequested(ToolCallRequest),
    /// The response is finished. Nothing after this is meaningful.
    Completed,
}

/// One open provider response.
///
/// Consumed once, not restartable. Dropping it closes the underlying
/// connection; call [`drain`](Self::drain) to consume the remainder when
/// abandoning a response before re-opening a new one.
pub struct ProviderStream {
    inner: Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send>>,
}

impl ProviderStream {
    pub fn new(
        events: impl Stream<Item = Result<StreamEvent, LlmError>> + Send + 'static,
    ) -> Self {
        Self {
            inner: Box::pin(events),
        }
    }

    /// Next event, or `None` once the response is exhausted.
    pub async fn next_event(&mut self) -> Option<Result<StreamEvent, LlmError>> {
        self.inner.next().await
    }

    /// Consume the rest of the response, discarding every remaining event.
    pub async fn drain(mut self) {
        while self.inner.next().await.is_some() {}
    }
}

/// A client that opens streaming completions against a model provider.
#[async_trait]
pub trait StreamingClient: Send + Sync {
    /// Open one completion request over the full transcript and tool
    /// manifest. The returned stream fails with [`LlmError::Auth`] on
    /// rejected credentials and [`LlmError::Transport`] on network or
    /// protocol failures.
    async fn open(
        &self,
        messages: &[ChatMessage],
        manifest: &[serde_json::Value],
    ) -> Result<ProviderStream, LlmError>;
}
