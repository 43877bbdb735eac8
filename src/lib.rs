//! # learnmate agent
//!
//! A streaming, tool-augmented study assistant.
//!
//! This library provides:
//! - An HTTP API with a Server-Sent-Events chat endpoint
//! - A tool-based agent loop over a streaming LLM provider
//! - Study-file tools the model can call while answering
//!
//! ## Architecture
//!
//! The agent follows the "tools in a loop" pattern:
//! 1. Receive a question via the API
//! 2. Send the conversation transcript and tool manifest to the provider
//! 3. Forward streamed text outward; execute any requested tool call
//! 4. Feed tool results back and repeat until the provider completes
//!
//! ## Example
//!
//! ```rust,ignore
//! use learnmate_agent::agent::{Agent, Transcript};
//! use learnmate_agent::config::Config;
//!
//! let config = Config::from_env()?;
//! let agent = Agent::new(&config);
//! let mut transcript = Transcript::new();
//! let answer = agent
//!     .generate_response(&mut transcript, "What is photosynthesis?", None)
//!     .await?;
//! ```

pub mod agent;
pub mod api;
pub mod config;
pub mod llm;
pub mod tools;

pub use config::Config;
