use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State, rejection::{JsonRejection, PathRejection}},
    response::Response,
};
use contextor::ConfigPatch;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::{
    core::{app_state::AppState, http::response_envelope::ApiResponse},
    error_handler::AppResult,
    routes::sessions::session_route::lookup,
};

/// PATCH /sessions/{id}/config: all-or-nothing update of the session's controls.
///
/// # Example
/// ```bash
/// curl -X PATCH http://127.0.0.1:8080/sessions/$ID/config \
///   -H 'content-type: application/json' \
///   -d '{"num_retrieved_chunks":10,"model_aggregation":"llama3.1-8b"}'
/// ```
#[instrument(name = "patch_config_route", skip_all)]
pub async fn patch_config_route(
    State(state): State<Arc<AppState>>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<ConfigPatch>, JsonRejection>,
) -> AppResult<Response> {
    let (id, session) = lookup(&state, id).await?;
    let Json(patch) = payload?;

    let writer = session.writer().await;
    let catalog = state.engine.catalog();
    let updated = writer
        .update(|s| s.apply_patch(patch, catalog).cloned())
        .await?;
    debug!(session = %id, "config updated");

    Ok(ApiResponse::success(updated).ok())
}
