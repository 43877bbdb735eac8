//! API request and response types.

use serde::{Deserialize, Serialize};

/// Request to ask the assistant a question.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    /// The user's question
    pub query: String,

    /// Optional file the question refers to
    #[serde(default, rename = "selectedFileId")]
    pub file_id: Option<u64>,
}

/// One frame of the outward event stream.
///
/// Serialized as a JSON object with either a `content` or an `error` field,
/// never both.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum StreamFrame {
    /// A fragment of assistant text.
    Content { content: String },

    /// Terminal error report; the stream closes after this frame.
    Error { error: String },
}

/// Response for the non-streaming solve endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct SolveResponse {
    /// Final assistant text for the turn
    pub response: String,
}

/// Error body for non-streaming endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Health check response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Service version
    pub version: String,
}
