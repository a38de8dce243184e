use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use contextor::ContextorError;
use thiserror::Error;
use tracing::{error, warn};
use uuid::Uuid;

use crate::core::{
    app_config::ConfigError,
    http::response_envelope::{ApiErrorDetail, ApiResponse},
};

/// Public application error type.
#[derive(Debug, Error)]
pub enum AppError {
    // --- Boot / config ---
    #[error(transparent)]
    Config(#[from] ConfigError),

    // --- IO / network / server ---
    #[error("failed to bind listener")]
    Bind(#[source] std::io::Error),

    #[error("server error")]
    Server(#[source] std::io::Error),

    // --- Request / routing ---
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("session {0} not found")]
    SessionNotFound(Uuid),

    // --- Chat core ---
    #[error(transparent)]
    Chat(#[from] ContextorError),
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::SessionNotFound(_) => StatusCode::NOT_FOUND,
            AppError::Chat(e) => match e {
                ContextorError::ChatDisabled => StatusCode::CONFLICT,
                ContextorError::Llm(_) | ContextorError::Search(_) => StatusCode::BAD_GATEWAY,
                ContextorError::EmptyQuestion
                | ContextorError::InvalidConfig { .. }
                | ContextorError::ControlUnavailable { .. }
                | ContextorError::UnknownService(_) => StatusCode::BAD_REQUEST,
            },
            AppError::Config(_) | AppError::Bind(_) | AppError::Server(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::Bind(_) => "BIND_ERROR",
            AppError::Server(_) => "SERVER_ERROR",
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::SessionNotFound(_) => "SESSION_NOT_FOUND",
            AppError::Chat(e) => match e {
                ContextorError::ChatDisabled => "CHAT_DISABLED",
                ContextorError::EmptyQuestion => "EMPTY_QUESTION",
                ContextorError::InvalidConfig { .. } => "INVALID_CONFIG",
                ContextorError::ControlUnavailable { .. } => "CONTROL_UNAVAILABLE",
                ContextorError::UnknownService(_) => "UNKNOWN_SERVICE",
                ContextorError::Llm(_) | ContextorError::Search(_) => "UPSTREAM_FAILED",
            },
        }
    }

    fn details(&self) -> Vec<ApiErrorDetail> {
        match self {
            AppError::Chat(ContextorError::InvalidConfig { field, reason }) => {
                vec![ApiErrorDetail::field(*field, reason.clone())]
            }
            AppError::Chat(ContextorError::ControlUnavailable { control, variant }) => {
                vec![ApiErrorDetail::field(
                    *control,
                    format!("not configurable in the {variant} chat"),
                )]
            }
            AppError::Chat(ContextorError::UnknownService(_)) => vec![ApiErrorDetail::field(
                "selected_service",
                "pick one of the session's services",
            )],
            AppError::Chat(ContextorError::EmptyQuestion) => {
                vec![ApiErrorDetail::field("question", "provide a non-blank question")]
            }
            _ => Vec::new(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = %self, code = self.error_code(), "request failed");
        } else {
            warn!(error = %self, code = self.error_code(), "request rejected");
        }
        ApiResponse::<()>::error(self.error_code(), self.to_string(), self.details())
            .into_response_with_status(status)
    }
}

/// Handy result alias used across handlers.
pub type AppResult<T> = Result<T, AppError>;

impl From<JsonRejection> for AppError {
    fn from(err: JsonRejection) -> Self {
        AppError::BadRequest(err.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(err: PathRejection) -> Self {
        AppError::BadRequest(err.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_errors_map_to_statuses() {
        let cases = [
            (AppError::Chat(ContextorError::ChatDisabled), StatusCode::CONFLICT, "CHAT_DISABLED"),
            (
                AppError::Chat(ContextorError::EmptyQuestion),
                StatusCode::BAD_REQUEST,
                "EMPTY_QUESTION",
            ),
            (
                AppError::SessionNotFound(Uuid::nil()),
                StatusCode::NOT_FOUND,
                "SESSION_NOT_FOUND",
            ),
            (
                AppError::Chat(ContextorError::Llm(
                    ai_llm_service::ConfigError::EmptyCatalog.into(),
                )),
                StatusCode::BAD_GATEWAY,
                "UPSTREAM_FAILED",
            ),
        ];
        for (err, status, code) in cases {
            assert_eq!(err.status_code(), status);
            assert_eq!(err.error_code(), code);
        }
    }

    #[test]
    fn invalid_config_carries_field_detail() {
        let err = AppError::Chat(ContextorError::InvalidConfig {
            field: "num_chat_messages",
            reason: "51 is outside 1..=50".into(),
        });
        let details = err.details();
        assert_eq!(details.len(), 1);
        assert_eq!(details[0].path.as_deref(), Some("num_chat_messages"));
    }
}
