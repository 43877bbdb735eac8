//! Conversation transcript: the ordered message log for one conversation.

use crate::llm::{ChatMessage, Role};

/// Ordered conversation history.
///
/// Owned by the caller and mutated only by the agent loop; at most one turn
/// may be in flight at a time, which the layer above enforces. The full
/// transcript is resent to the provider on every request.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    messages: Vec<ChatMessage>,
    system_prompt: Option<String>,
}

impl Transcript {
    /// Create an empty transcript.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a transcript seeded with a system message. The seed survives
    /// [`reset`](Self::reset).
    pub fn seeded(system_prompt: impl Into<String>) -> Self {
        let system_prompt = system_prompt.into();
        Self {
            messages: vec![ChatMessage::system(system_prompt.clone())],
            system_prompt: Some(system_prompt),
        }
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.messages.push(ChatMessage::user(content));
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.messages.push(ChatMessage::assistant(content));
    }

    /// Append a tool result answering the given tool call.
    pub fn push_tool(&mut self, content: impl Into<String>, tool_call_id: impl Into<String>) {
        self.messages.push(ChatMessage::tool(content, tool_call_id));
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Clear the conversation, reseeding the system message when one was
    /// configured. Idempotent.
    pub fn reset(&mut self) {
        self.messages.clear();
        if let Some(prompt) = &self.system_prompt {
            self.messages.push(ChatMessage::system(prompt.clone()));
        }
    }

    /// Count messages with the given role.
    pub fn count_role(&self, role: Role) -> usize {
        self.messages.iter().filter(|m| m.role == role).count()
    }
}
