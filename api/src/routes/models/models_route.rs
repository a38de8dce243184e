use std::sync::Arc;

use axum::{extract::State, response::Response};
use contextor::{CHAT_MESSAGES_RANGE, RETRIEVED_CHUNKS_RANGE, SessionConfig};

use crate::{
    core::{app_state::AppState, http::response_envelope::ApiResponse},
    routes::models::models_response::{Bounds, Limits, ModelsResponse, RoleDefaults},
};

/// GET /models
pub async fn models_route(State(state): State<Arc<AppState>>) -> Response {
    let engine = &state.engine;
    let defaults = SessionConfig::defaults(engine.catalog(), engine.config(), &[]);

    ApiResponse::success(ModelsResponse {
        models: engine.catalog().models().to_vec(),
        defaults: RoleDefaults {
            generic: defaults.model_generic,
            service: defaults.model_service,
            aggregation: defaults.model_aggregation,
            summary: defaults.model_summary,
        },
        limits: Limits {
            num_retrieved_chunks: Bounds {
                min: *RETRIEVED_CHUNKS_RANGE.start(),
                max: *RETRIEVED_CHUNKS_RANGE.end(),
                default: defaults.num_retrieved_chunks,
            },
            num_chat_messages: Bounds {
                min: *CHAT_MESSAGES_RANGE.start(),
                max: *CHAT_MESSAGES_RANGE.end(),
                default: defaults.num_chat_messages,
            },
        },
    })
    .ok()
}
