//! The completion seam used by the chat engine, plus the env-driven service
//! that implements it for every supported provider.
//!
//! # Example
//! ```no_run
//! use std::sync::Arc;
//! use ai_llm_service::completion::{Completion, LlmService};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let svc: Arc<dyn Completion> = Arc::new(LlmService::from_env(None)?);
//! let answer = svc.complete("llama3.1-70b", "Who is Ferris?").await?;
//! println!("{answer}");
//! # Ok(()) }
//! ```

use async_trait::async_trait;
use snowflake_api::SqlApiClient;
use tracing::{info, instrument};

use crate::{
    config::{
        default_config::config_from_env, llm_model_config::LlmModelConfig,
        llm_provider::LlmProvider, model_catalog::ModelCatalog,
    },
    error_handler::{AiLlmError, ConfigError},
    health_service::{HealthService, HealthStatus},
    services::{
        cortex_service::CortexService, ollama_service::OllamaService,
        open_ai_service::OpenAiService,
    },
};

/// Turns a prompt into text with a named model.
#[async_trait]
pub trait Completion: Send + Sync {
    /// Single non-streaming completion.
    async fn complete(&self, model: &str, prompt: &str) -> Result<String, AiLlmError>;

    /// Models the caller may pick from, in selector order.
    fn catalog(&self) -> &ModelCatalog;

    /// Best-effort backend health. Implementations without a probe report nothing.
    async fn health(&self) -> Vec<HealthStatus> {
        Vec::new()
    }
}

#[derive(Debug)]
enum Backend {
    Cortex(CortexService),
    Ollama(OllamaService),
    OpenAi(OpenAiService),
}

/// Provider-backed [`Completion`]; construct once and share behind an `Arc`.
#[derive(Debug)]
pub struct LlmService {
    cfg: LlmModelConfig,
    catalog: ModelCatalog,
    backend: Backend,
    health: HealthService,
}

impl LlmService {
    /// Builds a service from an explicit config.
    ///
    /// `sql` is required for the Cortex provider and ignored otherwise.
    ///
    /// # Errors
    /// - [`ConfigError::MissingClient`] when Cortex is selected without `sql`
    /// - provider construction errors (bad endpoint, missing key, ...)
    pub fn new(
        cfg: LlmModelConfig,
        catalog: ModelCatalog,
        sql: Option<SqlApiClient>,
    ) -> Result<Self, AiLlmError> {
        let backend = match cfg.provider {
            LlmProvider::Cortex => {
                let sql = sql.ok_or(ConfigError::MissingClient(
                    "cortex provider requires a configured Snowflake SQL API client",
                ))?;
                Backend::Cortex(CortexService::new(sql))
            }
            LlmProvider::Ollama => Backend::Ollama(OllamaService::new(cfg.clone())?),
            LlmProvider::OpenAI => Backend::OpenAi(OpenAiService::new(cfg.clone())?),
        };

        info!(
            provider = ?cfg.provider,
            endpoint = %cfg.endpoint,
            models = catalog.models().len(),
            "LlmService initialized"
        );

        Ok(Self {
            cfg,
            catalog,
            backend,
            health: HealthService::new(Some(10))?,
        })
    }

    /// Builds a service from `LLM_KIND`, provider variables and `LLM_MODELS`.
    pub fn from_env(sql: Option<SqlApiClient>) -> Result<Self, AiLlmError> {
        let cfg = config_from_env()?;
        let catalog = ModelCatalog::from_env(cfg.provider)?;
        Self::new(cfg, catalog, sql)
    }

    pub fn provider(&self) -> LlmProvider {
        self.cfg.provider
    }

    pub fn config(&self) -> &LlmModelConfig {
        &self.cfg
    }
}

#[async_trait]
impl Completion for LlmService {
    #[instrument(skip_all, fields(provider = ?self.cfg.provider, model = %model))]
    async fn complete(&self, model: &str, prompt: &str) -> Result<String, AiLlmError> {
        if !self.catalog.contains(model) {
            return Err(ConfigError::UnknownModel(model.to_string()).into());
        }
        match &self.backend {
            Backend::Cortex(svc) => svc.complete(model, prompt).await,
            Backend::Ollama(svc) => svc.generate(model, prompt).await,
            Backend::OpenAi(svc) => svc.generate(model, prompt).await,
        }
    }

    fn catalog(&self) -> &ModelCatalog {
        &self.catalog
    }

    async fn health(&self) -> Vec<HealthStatus> {
        let cortex = match &self.backend {
            Backend::Cortex(svc) => Some(svc),
            _ => None,
        };
        vec![self.health.check(&self.cfg, &self.catalog, cortex).await]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ollama() -> LlmService {
        let cfg = LlmModelConfig {
            provider: LlmProvider::Ollama,
            endpoint: "http://127.0.0.1:9".into(),
            api_key: None,
            max_tokens: None,
            temperature: None,
            top_p: None,
            timeout_secs: Some(1),
        };
        LlmService::new(cfg, ModelCatalog::parse("qwen3:14b").unwrap(), None).unwrap()
    }

    #[tokio::test]
    async fn unknown_model_is_rejected_before_any_call() {
        let svc = ollama();
        let err = svc.complete("gpt-4o", "hi").await.unwrap_err();
        assert!(matches!(err, AiLlmError::Config(ConfigError::UnknownModel(m)) if m == "gpt-4o"));
    }

    #[test]
    fn cortex_requires_sql_client() {
        let cfg = LlmModelConfig {
            provider: LlmProvider::Cortex,
            endpoint: "https://acct.snowflakecomputing.com".into(),
            api_key: None,
            max_tokens: None,
            temperature: None,
            top_p: None,
            timeout_secs: None,
        };
        let err = LlmService::new(cfg, ModelCatalog::cortex_default(), None).unwrap_err();
        assert!(matches!(err, AiLlmError::Config(ConfigError::MissingClient(_))));
    }

    #[test]
    fn exposes_catalog_and_provider() {
        let svc = ollama();
        assert_eq!(svc.provider(), LlmProvider::Ollama);
        assert_eq!(svc.catalog().models(), ["qwen3:14b"]);
    }
}
