pub mod completion;
pub mod config;
pub mod error_handler;
pub mod health_service;
pub mod services;
pub mod telemetry;

pub use completion::{Completion, LlmService};
pub use config::{
    llm_model_config::LlmModelConfig, llm_provider::LlmProvider, model_catalog::ModelCatalog,
};
pub use error_handler::{AiLlmError, ConfigError};
pub use health_service::HealthStatus;
