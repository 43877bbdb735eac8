//! HTTP API for the learnmate agent.

pub mod routes;
pub mod stream;
pub mod types;

pub use routes::serve;
