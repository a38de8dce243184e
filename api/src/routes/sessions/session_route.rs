//! Session lifecycle: connect, inspect, disconnect.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State, rejection::PathRejection},
    http::StatusCode,
    response::Response,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    core::{
        app_state::AppState, http::response_envelope::ApiResponse, session_store::SharedSession,
    },
    error_handler::{AppError, AppResult},
    routes::sessions::{
        session_request::CreateSessionRequest,
        session_response::{SessionDeleted, SessionView},
    },
};

/// Resolves the `{id}` path segment to a live session.
pub(crate) async fn lookup(
    state: &AppState,
    id: Result<Path<Uuid>, PathRejection>,
) -> AppResult<(Uuid, SharedSession)> {
    let Path(id) = id?;
    let session = state
        .sessions
        .get(id)
        .await
        .ok_or(AppError::SessionNotFound(id))?;
    Ok((id, session))
}

/// POST /sessions
///
/// # Example
/// ```bash
/// curl -X POST http://127.0.0.1:8080/sessions \
///   -H 'content-type: application/json' \
///   -d '{"variant":"rag"}'
/// ```
#[instrument(name = "create_session_route", skip_all)]
pub async fn create_session_route(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> AppResult<Response> {
    let req: CreateSessionRequest = if body.iter().all(u8::is_ascii_whitespace) {
        CreateSessionRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| AppError::BadRequest(e.to_string()))?
    };

    let session = state.engine.new_session(req.variant).await?;
    let view = SessionView::from(&session);
    state.sessions.insert(session).await;
    info!(session = %view.id, variant = %view.variant, "session connected");

    Ok(ApiResponse::success(view).into_response_with_status(StatusCode::CREATED))
}

/// GET /sessions/{id}
pub async fn get_session_route(
    State(state): State<Arc<AppState>>,
    id: Result<Path<Uuid>, PathRejection>,
) -> AppResult<Response> {
    let (_, session) = lookup(&state, id).await?;
    let current = session.read().await;
    Ok(ApiResponse::success(SessionView::from(&*current)).ok())
}

/// DELETE /sessions/{id}
#[instrument(name = "delete_session_route", skip_all)]
pub async fn delete_session_route(
    State(state): State<Arc<AppState>>,
    id: Result<Path<Uuid>, PathRejection>,
) -> AppResult<Response> {
    let Path(id) = id?;
    if !state.sessions.remove(id).await {
        return Err(AppError::SessionNotFound(id));
    }
    info!(session = %id, "session disconnected");
    Ok(ApiResponse::success(SessionDeleted { id }).ok())
}
