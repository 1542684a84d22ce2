//! HTTP handlers.
//!
//! - `GET  /health`: liveness plus dispatch counters
//! - `POST /api/chat`: submit a job, stream its output as SSE
//! - `GET  /api/chat-history/{session_id}`: stored turns of a session

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::sse::{Event as SseEvent, KeepAlive, Sse},
    response::Json,
};
use futures::{Stream, StreamExt, future, stream};
use parley_core::history::HistoryStore;
use parley_core::job::{ChatJob, ChatMode};
use parley_core::message::Role;
use parley_dispatch::{Dispatcher, Ticket};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, error, info};

/// Shared state for all handlers.
pub struct AppState {
    pub dispatcher: Dispatcher,
    pub history: Arc<dyn HistoryStore>,
    pub workers: usize,
}

pub type SharedState = Arc<AppState>;

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, error: impl Into<String>) -> ApiError {
    (status, Json(ErrorResponse { error: error.into() }))
}

// ── Health ───────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub workers: usize,
    pub in_flight: usize,
}

pub async fn health_handler(State(state): State<SharedState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        workers: state.workers,
        in_flight: state.dispatcher.in_flight(),
    })
}

// ── Chat ─────────────────────────────────────────────────────────────────

/// Missing string fields deserialize empty and are rejected by validation.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub mode: ChatMode,
}

impl ChatRequest {
    fn into_job(self) -> Result<ChatJob, String> {
        let required = [
            ("username", &self.username),
            ("session_id", &self.session_id),
            ("query", &self.query),
            ("model", &self.model),
        ];
        if let Some((field, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(format!("missing required field: {field}"));
        }

        Ok(ChatJob {
            username: self.username,
            session_id: self.session_id,
            query: self.query,
            model: self.model,
            mode: self.mode,
        })
    }
}

/// `POST /api/chat`: queue the job and stream `result`/`error` events until
/// it completes.
pub async fn chat_handler(
    State(state): State<SharedState>,
    Json(payload): Json<ChatRequest>,
) -> Result<Sse<impl Stream<Item = Result<SseEvent, Infallible>>>, ApiError> {
    let job = payload
        .into_job()
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, e))?;

    info!(
        username = %job.username,
        session_id = %job.session_id,
        model = %job.model,
        mode = %job.mode,
        "Chat request"
    );

    let Ticket {
        correlation_id,
        events,
        completion,
    } = state.dispatcher.submit(job).await.map_err(|e| {
        error!(error = %e, "Failed to submit chat job");
        api_error(StatusCode::SERVICE_UNAVAILABLE, e.to_string())
    })?;

    let events = UnboundedReceiverStream::new(events)
        .map(|event| Ok(SseEvent::default().event(event.event_type()).data(event.data())));

    let finished = stream::once(completion.wait()).filter_map(move |outcome| {
        debug!(correlation_id = %correlation_id, ?outcome, "Chat stream finished");
        future::ready(None::<Result<SseEvent, Infallible>>)
    });

    Ok(Sse::new(events.chain(finished)).keep_alive(KeepAlive::default()))
}

// ── History ──────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub session_id: String,
    pub messages: Vec<HistoryEntry>,
}

pub async fn history_handler(
    State(state): State<SharedState>,
    Path(session_id): Path<String>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let messages = state.history.get_history(&session_id).await.map_err(|e| {
        error!(session_id = %session_id, error = %e, "History lookup failed");
        api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;

    Ok(Json(HistoryResponse {
        session_id,
        messages: messages
            .into_iter()
            .map(|m| HistoryEntry {
                role: m.role,
                content: m.content,
            })
            .collect(),
    }))
}
