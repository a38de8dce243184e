//! Conversation of one session: read, submit a turn, clear.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State, rejection::{JsonRejection, PathRejection}},
    response::Response,
};
use contextor::NoopProgress;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    core::{app_state::AppState, http::response_envelope::ApiResponse},
    error_handler::AppResult,
    routes::{
        messages::{
            message_request::AskRequest,
            message_response::{AskResponse, MessagesResponse},
        },
        sessions::session_route::lookup,
    },
};

/// GET /sessions/{id}/messages
pub async fn list_messages_route(
    State(state): State<Arc<AppState>>,
    id: Result<Path<Uuid>, PathRejection>,
) -> AppResult<Response> {
    let (_, session) = lookup(&state, id).await?;
    let current = session.read().await;
    Ok(ApiResponse::success(MessagesResponse {
        messages: current.log().turns().to_vec(),
    })
    .ok())
}

/// POST /sessions/{id}/messages: runs one chat turn.
///
/// The turn runs on a working copy while the session's turn gate is held:
/// a second question (or a config change) on the same session waits for the
/// first one to finish, while reads keep returning the state from before the
/// turn. The copy is committed even when the turn fails, so the user message
/// stays in the log.
///
/// # Example
/// ```bash
/// curl -X POST http://127.0.0.1:8080/sessions/$ID/messages \
///   -H 'content-type: application/json' \
///   -d '{"question":"Who are Mae and Osha?"}'
/// ```
#[instrument(name = "ask_route", skip_all)]
pub async fn ask_route(
    State(state): State<Arc<AppState>>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<AskRequest>, JsonRejection>,
) -> AppResult<Response> {
    let (id, session) = lookup(&state, id).await?;
    let Json(body) = payload?;

    let writer = session.writer().await;
    let mut working = writer.checkout().await;
    let result = state
        .engine
        .ask(&mut working, &body.question, &NoopProgress)
        .await;
    let message_count = working.log().len();
    writer.commit(working).await;

    let outcome = result?;
    info!(session = %id, answer_len = outcome.answer.len(), "turn answered");

    Ok(ApiResponse::success(AskResponse {
        answer: outcome.answer,
        debug: outcome.debug,
        message_count,
    })
    .ok())
}

/// DELETE /sessions/{id}/messages: the "clear conversation" control.
#[instrument(name = "clear_messages_route", skip_all)]
pub async fn clear_messages_route(
    State(state): State<Arc<AppState>>,
    id: Result<Path<Uuid>, PathRejection>,
) -> AppResult<Response> {
    let (id, session) = lookup(&state, id).await?;
    session
        .writer()
        .await
        .update(|s| s.clear_conversation())
        .await;
    info!(session = %id, "conversation cleared");
    Ok(ApiResponse::success(MessagesResponse {
        messages: Vec::new(),
    })
    .ok())
}
