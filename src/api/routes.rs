//! HTTP server and route handlers.

use std::sync::Arc;

use async_stream::stream;
use axum::{
    extract::State,
    http::StatusCode,
    response::sse::Sse,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use tokio::sync::Mutex;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::agent::{build_system_prompt, Agent, AgentError, Transcript};
use crate::config::Config;

use super::stream::sse_events;
use super::types::{ChatRequest, ErrorResponse, HealthResponse, SolveResponse};

/// Shared application state.
pub struct AppState {
    pub agent: Agent,

    /// The single logical conversation. Holding this lock for a whole turn
    /// serializes turns: at most one is in flight at a time.
    pub transcript: Mutex<Transcript>,
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        let agent = Agent::new(config);
        let transcript = Mutex::new(Transcript::seeded(build_system_prompt(agent.tools())));
        Self { agent, transcript }
    }
}

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/chat", post(chat))
        .route("/api/solve", post(solve))
        .route("/api/reset", post(reset))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the HTTP server.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let state = Arc::new(AppState::new(&config));
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("listening on {}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

/// Streaming chat endpoint. Emits `data: {"content": ...}` frames as the
/// model produces text and closes after the final frame, or after a single
/// `data: {"error": ...}` frame on failure.
async fn chat(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> impl IntoResponse {
    let fragments = stream! {
        let mut transcript = state.transcript.lock().await;
        let turn = state
            .agent
            .stream_turn(&mut transcript, &request.query, request.file_id);
        for await item in turn {
            yield item;
        }
    };
    Sse::new(sse_events(fragments))
}

/// Non-streaming solve endpoint: runs the whole turn and returns the final
/// assistant text in one JSON body.
async fn solve(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<SolveResponse>, (StatusCode, Json<ErrorResponse>)> {
    let mut transcript = state.transcript.lock().await;
    match state
        .agent
        .generate_response(&mut transcript, &request.query, request.file_id)
        .await
    {
        Ok(response) => Ok(Json(SolveResponse { response })),
        Err(e) => {
            tracing::error!(error = %e, "solve turn failed");
            Err((
                status_for(&e),
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            ))
        }
    }
}

fn status_for(error: &AgentError) -> StatusCode {
    match error {
        AgentError::Provider(_) => StatusCode::BAD_GATEWAY,
        AgentError::ArgumentDecode { .. } | AgentError::IterationLimit(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// Clear the conversation. Idempotent.
async fn reset(State(state): State<Arc<AppState>>) -> StatusCode {
    state.transcript.lock().await.reset();
    StatusCode::NO_CONTENT
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
