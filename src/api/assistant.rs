//! Assistant endpoints: mic button, typed commands, status stream

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{
        IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
    routing::{get, post},
};
use futures::Stream;
use serde::{Deserialize, Serialize};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::WatchStream;

use super::ApiState;
use crate::assistant::{AssistantStatus, StartOutcome};

/// Build assistant router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/status", get(status))
        .route("/events", get(events))
        .route("/start", post(start))
        .route("/ask", post(ask))
        .with_state(state)
}

/// Answer to a start or ask request
#[derive(Debug, Serialize)]
pub struct StartResponse {
    pub outcome: StartOutcome,
    pub status: AssistantStatus,
}

/// Typed command
#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub text: String,
}

async fn status(State(state): State<Arc<ApiState>>) -> Json<AssistantStatus> {
    Json(state.assistant.status())
}

/// Server-sent events, one per status change
async fn events(
    State(state): State<Arc<ApiState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = WatchStream::new(state.assistant.subscribe()).map(|status| {
        let event = Event::default().event("status");
        Ok(event
            .json_data(&status)
            .unwrap_or_else(|_| Event::default().event("status").data("{}")))
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

async fn start(State(state): State<Arc<ApiState>>) -> Result<Json<StartResponse>, AssistantError> {
    let outcome = state
        .assistant
        .start()
        .await
        .map_err(|_| AssistantError::Unavailable)?;

    Ok(Json(StartResponse {
        outcome,
        status: state.assistant.status(),
    }))
}

async fn ask(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<AskRequest>,
) -> Result<Json<StartResponse>, AssistantError> {
    if request.text.trim().is_empty() {
        return Err(AssistantError::BadRequest("Empty text"));
    }

    let outcome = state
        .assistant
        .ask(request.text)
        .await
        .map_err(|_| AssistantError::Unavailable)?;

    Ok(Json(StartResponse {
        outcome,
        status: state.assistant.status(),
    }))
}

/// Assistant API errors
#[derive(Debug)]
pub enum AssistantError {
    BadRequest(&'static str),
    Unavailable,
}

impl IntoResponse for AssistantError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: ErrorBody,
        }

        #[derive(Serialize)]
        struct ErrorBody {
            code: &'static str,
            message: String,
        }

        let (status, code, message) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.to_string()),
            Self::Unavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                "assistant_unavailable",
                "assistant is not running".to_string(),
            ),
        };

        (status, Json(ErrorResponse { error: ErrorBody { code, message } })).into_response()
    }
}
