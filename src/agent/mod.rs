//! Agent module - the core conversational agent logic.
//!
//! The agent follows a "tools in a loop" pattern:
//! 1. Append the user's question to the conversation transcript
//! 2. Stream a completion from the provider with available tools
//! 3. If the model requests a tool call, execute it and feed the result back
//! 4. Repeat until the model produces a final answer or the iteration
//!    budget is exhausted

mod agent_loop;
mod prompt;
mod transcript;

pub use agent_loop::{Agent, AgentError};
pub use prompt::build_system_prompt;
pub use transcript::Transcript;
