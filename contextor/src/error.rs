//! Typed error for the contextor crate.

use ai_llm_service::AiLlmError;
use snowflake_api::SnowflakeError;
use thiserror::Error;

use crate::session::ChatVariant;

#[derive(Debug, Error)]
pub enum ContextorError {
    /// A completion call failed; the turn is aborted.
    #[error("completion failed: {0}")]
    Llm(#[from] AiLlmError),

    /// Service discovery or a search query failed.
    #[error("search failed: {0}")]
    Search(#[from] SnowflakeError),

    /// RAG chat without any discovered search service.
    #[error("chat is disabled: no search service is available")]
    ChatDisabled,

    #[error("question must not be empty")]
    EmptyQuestion,

    /// Bad startup value or rejected config change.
    #[error("invalid value for `{field}`: {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    /// The control exists, but not in this chat variant.
    #[error("`{control}` is not available in the {variant} chat")]
    ControlUnavailable {
        control: &'static str,
        variant: ChatVariant,
    },

    #[error("unknown search service: {0}")]
    UnknownService(String),
}

impl ContextorError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field,
            reason: reason.into(),
        }
    }

    /// True when the failure came from a remote call rather than the caller's input.
    pub fn is_upstream(&self) -> bool {
        matches!(self, Self::Llm(_) | Self::Search(_))
    }
}
