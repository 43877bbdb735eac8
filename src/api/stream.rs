//! Stream bridge: adapts the agent's fragment stream to SSE events.
//!
//! Each text fragment becomes one `data: {"content": ...}` event. A turn
//! failure produces exactly one `data: {"error": ...}` event and then the
//! stream closes; the transport is never left open without a terminal
//! signal. No buffering happens here beyond what the transport requires, so
//! transport back-pressure stalls fragment forwarding.

use std::convert::Infallible;

use async_stream::stream;
use axum::response::sse::Event;
use futures::stream::Stream;

use crate::agent::AgentError;

use super::types::StreamFrame;

/// Convert a turn's fragment stream into SSE events.
pub fn sse_events(
    fragments: impl Stream<Item = Result<String, AgentError>>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    stream! {
        for await item in fragments {
            match item {
                Ok(content) => {
                    match Event::default().json_data(StreamFrame::Content { content }) {
                        Ok(event) => yield Ok(event),
                        Err(e) => {
                            tracing::error!(error = %e, "failed to serialize SSE frame; dropping");
                        }
                    }
                }
                Err(err) => {
                    tracing::error!(error = %err, "turn failed; closing stream");
                    let frame = StreamFrame::Error {
                        error: err.to_string(),
                    };
                    match Event::default().json_data(frame) {
                        Ok(event) => yield Ok(event),
                        Err(e) => {
                            tracing::error!(error = %e, "failed to serialize SSE error frame");
                        }
                    }
                    break;
                }
            }
        }
    }
}
