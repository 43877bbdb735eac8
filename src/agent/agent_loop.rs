//! Core agent loop implementation.
//!
//! One user turn runs the state machine: open a provider stream over the
//! full transcript, forward text deltas outward as they arrive, execute any
//! requested tool, append its result, and re-query until the provider
//! completes or the iteration budget runs out.

use std::sync::Arc;

use async_stream::{stream, try_stream};
use futures::pin_mut;
use futures::stream::{Stream, StreamExt};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::config::Config;
use crate::llm::{LlmError, MistralClient, StreamEvent, StreamingClient, ToolCallRequest};
use crate::tools::ToolRegistry;

use super::transcript::Transcript;

/// Terminal failure of a user turn.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Provider(#[from] LlmError),

    #[error("malformed arguments for tool '{tool}': {reason}")]
    ArgumentDecode { tool: String, reason: String },

    #[error("no final response after {0} iterations")]
    IterationLimit(usize),
}

/// Outcome of consuming one provider response.
enum TurnStep {
    /// Terminal completion; the buffered text is the assistant message.
    Completed,
    /// The model wants a tool executed before continuing.
    ToolCall(ToolCallRequest),
    /// The response ended without a stop signal; re-query.
    Exhausted,
}

/// The conversational agent.
pub struct Agent {
    llm: Arc<dyn StreamingClient>,
    tools: ToolRegistry,
    max_iterations: usize,
}

impl Agent {
    /// Create a new agent with the given configuration.
    pub fn new(config: &Config) -> Self {
        Self {
            llm: Arc::new(MistralClient::new(config)),
            tools: ToolRegistry::new(),
            max_iterations: config.max_iterations,
        }
    }

    /// Create an agent over a custom provider client and tool set.
    pub fn with_client(
        llm: Arc<dyn StreamingClient>,
        tools: ToolRegistry,
        max_iterations: usize,
    ) -> Self {
        Self {
            llm,
            tools,
            max_iterations,
        }
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Run one user turn to completion and return the final assistant text.
    pub async fn generate_response(
        &self,
        transcript: &mut Transcript,
        query: &str,
        file_context_id: Option<u64>,
    ) -> Result<String, AgentError> {
        let mut final_text = String::new();
        {
            let turn = self.stream_turn(transcript, query, file_context_id);
            pin_mut!(turn);
            while let Some(fragment) = turn.next().await {
                final_text.push_str(&fragment?);
            }
        }
        Ok(final_text)
    }

    /// Run one user turn, yielding plain text fragments for a display
    /// surface. An internal failure becomes one final human-readable
    /// fragment instead of an error.
    pub fn generate_streaming_response<'a>(
        &'a self,
        transcript: &'a mut Transcript,
        query: &str,
        file_context_id: Option<u64>,
    ) -> impl Stream<Item = String> + Send + 'a {
        let turn = self.stream_turn(transcript, query, file_context_id);
        stream! {
            for await item in turn {
                match item {
                    Ok(fragment) => yield fragment,
                    Err(e) => {
                        tracing::error!(error = %e, "turn failed");
                        yield format!(
                            "Sorry, something went wrong while answering: {}.",
                            e
                        );
                        break;
                    }
                }
            }
        }
    }

    /// Run one user turn, yielding text fragments in provider emission
    /// order. The stream ends after the final fragment, or after a single
    /// `Err` item on terminal failure.
    ///
    /// The user message is appended to the transcript up front; on success
    /// the concatenation of all yielded fragments is appended as the
    /// assistant message. A failing step leaves the transcript exactly as it
    /// was before that step.
    pub fn stream_turn<'a>(
        &'a self,
        transcript: &'a mut Transcript,
        query: &str,
        file_context_id: Option<u64>,
    ) -> impl Stream<Item = Result<String, AgentError>> + Send + 'a {
        let user_content = match file_context_id {
            Some(id) => format!("Answer this question based on the file with ID {}: {}", id, query),
            None => query.to_string(),
        };

        try_stream! {
            let turn_id = Uuid::new_v4();
            transcript.push_user(user_content);
            let manifest = self.tools.manifest();
            let mut finished = false;

            for iteration in 1..=self.max_iterations {
                tracing::debug!(
                    %turn_id,
                    iteration,
                    messages = transcript.len(),
                    "opening provider stream"
                );
                let mut stream = self.llm.open(transcript.messages(), &manifest).await?;

                let mut buffer = String::new();
                let mut step = TurnStep::Exhausted;

                while let Some(event) = stream.next_event().await {
                    match event? {
                        StreamEvent::TextDelta(delta) => {
                            buffer.push_str(&delta);
                            yield delta;
                        }
                        StreamEvent::ToolCallRequested(call) => {
                            step = TurnStep::ToolCall(call);
                            break;
                        }
                        StreamEvent::Completed => {
                            step = TurnStep::Completed;
                            break;
                        }
                    }
                }

                match step {
                    TurnStep::Completed => {
                        tracing::debug!(%turn_id, iteration, chars = buffer.len(), "turn completed");
                        transcript.push_assistant(buffer);
                        finished = true;
                    }
                    TurnStep::ToolCall(call) => {
                        // The rest of this response is abandoned; it must be
                        // consumed before a new request is opened.
                        stream.drain().await;
                        let content = self.dispatch_tool_call(&call).await?;
                        transcript.push_tool(content, call.id);
                    }
                    TurnStep::Exhausted => {
                        tracing::warn!(
                            %turn_id,
                            iteration,
                            "provider stream ended without completion"
                        );
                    }
                }

                if finished {
                    break;
                }
            }

            if !finished {
                tracing::warn!(%turn_id, limit = self.max_iterations, "iteration limit reached");
                Err(AgentError::IterationLimit(self.max_iterations))?;
            }
        }
    }

    /// Decode arguments and run the named tool.
    ///
    /// Handler failures and unknown tool names are folded into the result
    /// text so the model can react conversationally; a malformed argument
    /// payload is terminal for the turn.
    async fn dispatch_tool_call(&self, call: &ToolCallRequest) -> Result<String, AgentError> {
        let args: serde_json::Value =
            serde_json::from_str(&call.arguments).map_err(|e| AgentError::ArgumentDecode {
                tool: call.name.clone(),
                reason: e.to_string(),
            })?;

        tracing::debug!(tool = %call.name, call_id = %call.id, "executing tool");
        let result = match self.tools.resolve(&call.name) {
            Some(tool) => match tool.execute(args).await {
                Ok(value) => value,
                Err(e) => {
                    tracing::warn!(tool = %call.name, error = %e, "tool failed");
                    json!({ "error": e.to_string() })
                }
            },
            None => {
                tracing::warn!(tool = %call.name, "unknown tool requested");
                json!({ "error": format!("unknown tool: {}", call.name) })
            }
        };

        Ok(result.to_string())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::Value;

    use super::*;
    use crate::llm::{ChatMessage, ProviderStream, Role};

    /// Replays canned provider responses and counts how often it is opened.
    struct ScriptedClient {
        responses: Mutex<Vec<Vec<Result<StreamEvent, LlmError>>>>,
        opens: AtomicUsize,
    }

    impl ScriptedClient {
        fn new(responses: Vec<Vec<Result<StreamEvent, LlmError>>>) -> Self {
            Self {
                responses: Mutex::new(responses),
                opens: AtomicUsize::new(0),
            }
        }

        fn opens(&self) -> usize {
            self.opens.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl StreamingClient for ScriptedClient {
        async fn open(
            &self,
            _messages: &[ChatMessage],
            _manifest: &[Value],
        ) -> Result<ProviderStream, LlmError> {
            self.opens.fetch_add(1, Ordering::SeqCst);
            let mut responses = self.responses.lock().unwrap();
            let events = if responses.is_empty() {
                Vec::new()
            } else {
                responses.remove(0)
            };
            Ok(ProviderStream::new(futures::stream::iter(events)))
        }
    }

    fn text(fragment: &str) -> Result<StreamEvent, LlmError> {
        Ok(StreamEvent::TextDelta(fragment.to_string()))
    }

    fn completed() -> Result<StreamEvent, LlmError> {
        Ok(StreamEvent::Completed)
    }

    fn tool_call(id: &str, name: &str, arguments: &str) -> Result<StreamEvent, LlmError> {
        Ok(StreamEvent::ToolCallRequested(ToolCallRequest {
            id: id.to_string(),
            name: name.to_string(),
            arguments: arguments.to_string(),
        }))
    }

    fn agent_over(client: Arc<ScriptedClient>) -> Agent {
        Agent::with_client(client, ToolRegistry::new(), 5)
    }

    async fn collect_fragments(
        agent: &Agent,
        transcript: &mut Transcript,
        query: &str,
    ) -> Vec<Result<String, AgentError>> {
        let mut fragments = Vec::new();
        let turn = agent.stream_turn(transcript, query, None);
        pin_mut!(turn);
        while let Some(item) = turn.next().await {
            fragments.push(item);
        }
        fragments
    }

    #[tokio::test]
    async fn forwards_fragments_and_records_assistant_message() {
        let client = Arc::new(ScriptedClient::new(vec![vec![
            text("The answer is "),
            text("42."),
            completed(),
        ]]));
        let agent = agent_over(client.clone());
        let mut transcript = Transcript::new();

        let fragments: Vec<String> = collect_fragments(&agent, &mut transcript, "What is the answer?")
            .await
            .into_iter()
            .map(|item| item.unwrap())
            .collect();

        assert_eq!(fragments, vec!["The answer is ", "42."]);
        let messages = transcript.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[1].role, Role::Assistant);
        // final assistant text is exactly the concatenation of the fragments
        assert_eq!(messages[1].content, "The answer is 42.");
        assert_eq!(client.opens(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn executes_tool_then_requeries() {
        let client = Arc::new(ScriptedClient::new(vec![
            vec![tool_call("call_1", "listFiles", "{}")],
            vec![text("You have 8 files."), completed()],
        ]));
        let agent = agent_over(client.clone());
        let mut transcript = Transcript::new();

        let response = agent
            .generate_response(&mut transcript, "List files", None)
            .await
            .unwrap();

        // the first provider response alone is never treated as final
        assert_eq!(response, "You have 8 files.");
        assert_eq!(client.opens(), 2);

        let messages = transcript.messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[1].role, Role::Tool);
        assert_eq!(messages[1].tool_call_id.as_deref(), Some("call_1"));
        assert_eq!(messages[2].role, Role::Assistant);

        let result: Value = serde_json::from_str(&messages[1].content).unwrap();
        assert_eq!(result["files"].as_array().unwrap().len(), 8);
    }

    #[tokio::test(start_paused = true)]
    async fn abandons_response_after_tool_call() {
        // Events after the tool call belong to an abandoned response and
        // must never be forwarded or treated as completion.
        let client = Arc::new(ScriptedClient::new(vec![
            vec![
                tool_call("call_1", "listFiles", "{}"),
                text("should not appear"),
                completed(),
            ],
            vec![text("Done."), completed()],
        ]));
        let agent = agent_over(client.clone());
        let mut transcript = Transcript::new();

        let fragments: Vec<String> = collect_fragments(&agent, &mut transcript, "List files")
            .await
            .into_iter()
            .map(|item| item.unwrap())
            .collect();

        assert_eq!(fragments, vec!["Done."]);
        assert_eq!(client.opens(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn folds_tool_failure_into_conversation() {
        let client = Arc::new(ScriptedClient::new(vec![
            vec![tool_call("call_9", "getFileContent", "{\"fileId\": 999}")],
            vec![text("That file does not exist."), completed()],
        ]));
        let agent = agent_over(client.clone());
        let mut transcript = Transcript::new();

        let response = agent
            .generate_response(&mut transcript, "Read file 999", None)
            .await
            .unwrap();

        assert_eq!(response, "That file does not exist.");
        let tool_message = transcript
            .messages()
            .iter()
            .find(|m| m.role == Role::Tool)
            .unwrap();
        let content: Value = serde_json::from_str(&tool_message.content).unwrap();
        assert!(content["error"].as_str().unwrap().contains("not found"));
    }

    #[tokio::test]
    async fn unknown_tool_is_reported_to_the_model() {
        let client = Arc::new(ScriptedClient::new(vec![
            vec![tool_call("call_2", "deleteEverything", "{}")],
            vec![text("I can't do that."), completed()],
        ]));
        let agent = agent_over(client.clone());
        let mut transcript = Transcript::new();

        agent
            .generate_response(&mut transcript, "Delete everything", None)
            .await
            .unwrap();

        let tool_message = transcript
            .messages()
            .iter()
            .find(|m| m.role == Role::Tool)
            .unwrap();
        let content: Value = serde_json::from_str(&tool_message.content).unwrap();
        assert!(content["error"]
            .as_str()
            .unwrap()
            .contains("unknown tool: deleteEverything"));
    }

    #[tokio::test]
    async fn malformed_tool_arguments_fail_the_turn() {
        let client = Arc::new(ScriptedClient::new(vec![vec![tool_call(
            "call_3",
            "getFileContent",
            "{not json",
        )]]));
        let agent = agent_over(client.clone());
        let mut transcript = Transcript::new();

        let err = agent
            .generate_response(&mut transcript, "Read something", None)
            .await
            .unwrap_err();

        assert!(matches!(err, AgentError::ArgumentDecode { .. }));
        // no partial tool message: the transcript holds only the user turn
        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript.messages()[0].role, Role::User);
    }

    #[tokio::test(start_paused = true)]
    async fn stops_after_iteration_limit() {
        let responses = (0..8)
            .map(|i| vec![tool_call(&format!("call_{}", i), "listFiles", "{}")])
            .collect();
        let client = Arc::new(ScriptedClient::new(responses));
        let agent = agent_over(client.clone());
        let mut transcript = Transcript::new();

        let err = agent
            .generate_response(&mut transcript, "Loop forever", None)
            .await
            .unwrap_err();

        assert!(matches!(err, AgentError::IterationLimit(5)));
        // the sixth request is never made
        assert_eq!(client.opens(), 5);
    }

    #[tokio::test]
    async fn propagates_provider_auth_failure() {
        let client = Arc::new(ScriptedClient::new(vec![vec![Err(LlmError::Auth(
            "401".to_string(),
        ))]]));
        let agent = agent_over(client);
        let mut transcript = Transcript::new();

        let err = agent
            .generate_response(&mut transcript, "hi", None)
            .await
            .unwrap_err();

        assert!(matches!(err, AgentError::Provider(LlmError::Auth(_))));
    }

    #[tokio::test]
    async fn streaming_entry_reports_errors_as_text() {
        let client = Arc::new(ScriptedClient::new(vec![vec![Err(
            LlmError::Transport("connection reset".to_string()),
        )]]));
        let agent = agent_over(client);
        let mut transcript = Transcript::new();

        let fragments: Vec<String> = {
            let turn = agent.generate_streaming_response(&mut transcript, "hi", None);
            pin_mut!(turn);
            let mut fragments = Vec::new();
            while let Some(fragment) = turn.next().await {
                fragments.push(fragment);
            }
            fragments
        };

        assert_eq!(fragments.len(), 1);
        assert!(fragments[0].starts_with("Sorry"));
    }

    #[tokio::test]
    async fn file_context_prefixes_user_message() {
        let client = Arc::new(ScriptedClient::new(vec![vec![
            text("Photosynthesis."),
            completed(),
        ]]));
        let agent = agent_over(client);
        let mut transcript = Transcript::new();

        agent
            .generate_response(&mut transcript, "What is this about?", Some(1))
            .await
            .unwrap();

        assert_eq!(
            transcript.messages()[0].content,
            "Answer this question based on the file with ID 1: What is this about?"
        );
    }

    #[tokio::test]
    async fn turns_accumulate_user_and_assistant_pairs() {
        let client = Arc::new(ScriptedClient::new(vec![
            vec![text("Hi."), completed()],
            vec![text("Again."), completed()],
        ]));
        let agent = agent_over(client.clone());
        let mut transcript = Transcript::seeded("seed");

        agent
            .generate_response(&mut transcript, "first", None)
            .await
            .unwrap();
        agent
            .generate_response(&mut transcript, "second", None)
            .await
            .unwrap();

        assert_eq!(transcript.count_role(Role::System), 1);
        assert_eq!(transcript.count_role(Role::User), 2);
        assert_eq!(transcript.count_role(Role::Assistant), 2);
        assert_eq!(client.opens(), 2);
    }
}
