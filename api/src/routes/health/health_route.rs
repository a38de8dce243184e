use std::sync::Arc;

use axum::{extract::State, response::Response};
use tracing::{debug, instrument};

use crate::{
    core::{app_state::AppState, http::response_envelope::ApiResponse},
    routes::health::health_response::HealthResponse,
};

/// GET /health: backend probes never fail the request; problems show up as `ok=false`.
#[instrument(name = "health_route", skip(state))]
pub async fn health_route(State(state): State<Arc<AppState>>) -> Response {
    let providers = state.engine.health().await;
    let healthy = providers.iter().all(|p| p.ok);
    let sessions = state.sessions.len().await;
    debug!(healthy, sessions, "health probed");

    ApiResponse::success(HealthResponse {
        status: if healthy { "ok" } else { "degraded" },
        providers,
        sessions,
    })
    .ok()
}
