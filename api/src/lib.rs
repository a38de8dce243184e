//! HTTP surface of the chat: session lifecycle, controls and turns.

use std::sync::Arc;

mod core;
mod error_handler;
mod middleware_layer;
mod routes;


use axum::{
    Router, middleware,
    routing::{get, patch, post},
};
use contextor::ChatEngine;
use tokio::signal;
use tracing::{info, warn};

pub use crate::core::app_config::{ApiConfig, ConfigError};
pub use crate::error_handler::AppError;

use crate::{
    core::app_state::AppState,
    middleware_layer::json_extractor::json_error_mapper,
    routes::{
        health::health_route::health_route,
        messages::messages_route::{ask_route, clear_messages_route, list_messages_route},
        models::models_route::models_route,
        sessions::{
            config_route::patch_config_route,
            session_route::{create_session_route, delete_session_route, get_session_route},
        },
    },
};

fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_route))
        .route("/models", get(models_route))
        .route("/sessions", post(create_session_route))
        .route(
            "/sessions/{id}",
            get(get_session_route).delete(delete_session_route),
        )
        .route("/sessions/{id}/config", patch(patch_config_route))
        .route(
            "/sessions/{id}/messages",
            get(list_messages_route)
                .post(ask_route)
                .delete(clear_messages_route),
        )
        .layer(middleware::from_fn(json_error_mapper))
        .with_state(state)
}

/// Serves the API until Ctrl+C.
pub async fn start(engine: Arc<ChatEngine>, config: ApiConfig) -> Result<(), AppError> {
    let state = Arc::new(AppState::new(engine, config));
    let listener = tokio::net::TcpListener::bind(&state.config.address)
        .await
        .map_err(AppError::Bind)?;
    info!(
        address = %state.config.address,
        idle_ttl_secs = state.config.session_idle_ttl.as_secs(),
        "api listening"
    );
    let sweeper = state.sessions.clone().spawn_sweeper();

    let served = axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(AppError::Server);

    sweeper.abort();
    served
}

/// Returns a future that resolves when Ctrl+C is pressed
async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
