//! Health checks for the configured completion backend.
//!
//! - Cortex: `SELECT 1` through the SQL API
//! - Ollama: `GET {endpoint}/api/tags`, then every catalog model must be listed
//! - OpenAI: `GET {endpoint}/v1/models` with Bearer auth, same catalog check
//!
//! The returned [`HealthStatus`] is JSON-serializable and suitable for a `/health` endpoint.
//! [`HealthService::check`] never fails (errors mapped to `ok=false`).
//! Provider-specific probes (`try_*`) return strict `Result`.

use std::time::{Duration, Instant};

use reqwest::header;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::config::llm_model_config::LlmModelConfig;
use crate::config::llm_provider::LlmProvider;
use crate::config::model_catalog::ModelCatalog;
use crate::error_handler::{AiLlmError, HealthError, HttpError, make_snippet};
use crate::services::cortex_service::CortexService;

/// A serializable health snapshot for the active backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    /// Backend/provider (e.g., "Cortex", "Ollama").
    pub provider: String,
    /// Target endpoint base URL.
    pub endpoint: String,
    /// Catalog models the probe looked for.
    pub models: Vec<String>,
    /// Overall health flag.
    pub ok: bool,
    /// Measured latency of the main probe in milliseconds.
    pub latency_ms: u128,
    /// Short human-readable message with details.
    pub message: String,
}

impl HealthStatus {
    fn new(
        provider: LlmProvider,
        endpoint: &str,
        catalog: &ModelCatalog,
        ok: bool,
        latency_ms: u128,
        message: impl Into<String>,
    ) -> Self {
        Self {
            provider: format!("{provider:?}"),
            endpoint: endpoint.to_string(),
            models: catalog.models().to_vec(),
            ok,
            latency_ms,
            message: message.into(),
        }
    }
}

/// Health checker reusing a single HTTP client for HTTP-based providers.
#[derive(Debug)]
pub struct HealthService {
    client: reqwest::Client,
    default_timeout: Duration,
}

impl HealthService {
    /// Creates a new health service with an optional client timeout (seconds).
    ///
    /// # Errors
    /// Returns [`AiLlmError::HttpTransport`] if the HTTP client cannot be built.
    pub fn new(timeout_secs: Option<u64>) -> Result<Self, AiLlmError> {
        let timeout = Duration::from_secs(timeout_secs.unwrap_or(10));
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        debug!(
            default_timeout_secs = timeout.as_secs(),
            "HealthService initialized"
        );

        Ok(Self {
            client,
            default_timeout: timeout,
        })
    }

    /// Checks the backend described by `cfg`.
    ///
    /// Never returns an error: any failure becomes `HealthStatus { ok: false, .. }`.
    pub async fn check(
        &self,
        cfg: &LlmModelConfig,
        catalog: &ModelCatalog,
        cortex: Option<&CortexService>,
    ) -> HealthStatus {
        let endpoint = cfg.endpoint.trim();
        if endpoint.is_empty()
            || !(endpoint.starts_with("http://") || endpoint.starts_with("https://"))
        {
            warn!(
                provider = ?cfg.provider,
                endpoint = %cfg.endpoint,
                "invalid endpoint (empty or missing http/https)"
            );
            return HealthStatus::new(
                cfg.provider,
                endpoint,
                catalog,
                false,
                0,
                "endpoint is empty or missing http/https",
            );
        }

        let start = Instant::now();
        let result = match (cfg.provider, cortex) {
            (LlmProvider::Cortex, Some(svc)) => Self::try_probe_cortex(cfg, catalog, svc).await,
            (LlmProvider::Cortex, None) => Err(AiLlmError::Health(HealthError::Decode(
                "cortex provider has no SQL API client".into(),
            ))),
            (LlmProvider::Ollama, _) => self.try_probe_ollama(cfg, catalog).await,
            (LlmProvider::OpenAI, _) => self.try_probe_openai(cfg, catalog).await,
        };

        match result {
            Ok(status) => {
                info!(
                    provider = %status.provider,
                    endpoint = %status.endpoint,
                    ok = status.ok,
                    latency_ms = status.latency_ms,
                    "health probe completed"
                );
                status
            }
            Err(err) => {
                let status = HealthStatus::new(
                    cfg.provider,
                    &cfg.endpoint,
                    catalog,
                    false,
                    start.elapsed().as_millis(),
                    err.to_string(),
                );
                warn!(
                    provider = %status.provider,
                    endpoint = %status.endpoint,
                    latency_ms = status.latency_ms,
                    message = %status.message,
                    "health probe failed"
                );
                status
            }
        }
    }

    async fn try_probe_cortex(
        cfg: &LlmModelConfig,
        catalog: &ModelCatalog,
        svc: &CortexService,
    ) -> Result<HealthStatus, AiLlmError> {
        let start = Instant::now();
        debug!(provider = "Cortex", endpoint = %svc.endpoint(), "SELECT 1");
        svc.ping().await?;
        Ok(HealthStatus::new(
            cfg.provider,
            &cfg.endpoint,
            catalog,
            true,
            start.elapsed().as_millis(),
            "Snowflake SQL API is reachable",
        ))
    }

    /// Strict Ollama probe.
    async fn try_probe_ollama(
        &self,
        cfg: &LlmModelConfig,
        catalog: &ModelCatalog,
    ) -> Result<HealthStatus, AiLlmError> {
        let url = format!("{}/api/tags", cfg.endpoint.trim_end_matches('/'));
        let start = Instant::now();
        debug!(provider = "Ollama", "GET {}", url);

        let resp = self
            .client
            .get(&url)
            .timeout(self.probe_timeout(cfg))
            .send()
            .await?;
        let latency = start.elapsed().as_millis();

        if !resp.status().is_success() {
            return Err(Self::status_error(resp, url, latency).await);
        }

        // Expected minimal JSON: { "models": [ { "name": "<model>" }, ... ] }
        #[derive(Deserialize)]
        struct Tag {
            name: String,
        }
        #[derive(Deserialize)]
        struct Tags {
            models: Option<Vec<Tag>>,
        }

        match resp.json::<Tags>().await {
            Ok(Tags { models: Some(tags) }) => {
                let available: Vec<&str> = tags.iter().map(|t| t.name.as_str()).collect();
                Ok(Self::catalog_status(cfg, catalog, &available, latency))
            }
            Ok(Tags { models: None }) => Ok(HealthStatus::new(
                cfg.provider,
                &cfg.endpoint,
                catalog,
                true,
                latency,
                "Ollama is healthy; tags response without `models` field",
            )),
            Err(e) => {
                warn!(error = %e, "failed to decode /api/tags; treating server as reachable");
                Ok(HealthStatus::new(
                    cfg.provider,
                    &cfg.endpoint,
                    catalog,
                    true,
                    latency,
                    format!("Ollama is reachable; failed to decode /api/tags: {e}"),
                ))
            }
        }
    }

    /// Strict OpenAI probe.
    async fn try_probe_openai(
        &self,
        cfg: &LlmModelConfig,
        catalog: &ModelCatalog,
    ) -> Result<HealthStatus, AiLlmError> {
        let url = format!("{}/v1/models", cfg.endpoint.trim_end_matches('/'));

        let api_key = cfg.api_key.as_ref().ok_or_else(|| {
            AiLlmError::Health(HealthError::Decode("missing OpenAI API key".into()))
        })?;
        let auth_header =
            header::HeaderValue::from_str(&format!("Bearer {}", api_key)).map_err(|e| {
                AiLlmError::Health(HealthError::Decode(format!("invalid API key header: {e}")))
            })?;

        let start = Instant::now();
        debug!(provider = "OpenAI", "GET {}", url);

        let resp = self
            .client
            .get(&url)
            .timeout(self.probe_timeout(cfg))
            .header(header::AUTHORIZATION, auth_header)
            .send()
            .await?;
        let latency = start.elapsed().as_millis();

        if !resp.status().is_success() {
            return Err(Self::status_error(resp, url, latency).await);
        }

        // Expected minimal JSON: { "data": [ { "id": "<model>" }, ... ] }
        #[derive(Deserialize)]
        struct ModelItem {
            id: String,
        }
        #[derive(Deserialize)]
        struct Models {
            data: Vec<ModelItem>,
        }

        match resp.json::<Models>().await {
            Ok(models) => {
                let available: Vec<&str> = models.data.iter().map(|m| m.id.as_str()).collect();
                Ok(Self::catalog_status(cfg, catalog, &available, latency))
            }
            Err(e) => {
                warn!(error = %e, "failed to decode /v1/models; treating server as reachable");
                Ok(HealthStatus::new(
                    cfg.provider,
                    &cfg.endpoint,
                    catalog,
                    true,
                    latency,
                    format!("OpenAI is reachable; failed to decode /v1/models: {e}"),
                ))
            }
        }
    }

    fn probe_timeout(&self, cfg: &LlmModelConfig) -> Duration {
        cfg.timeout_secs
            .map(Duration::from_secs)
            .map_or(self.default_timeout, |t| t.min(self.default_timeout))
    }

    /// Healthy only when every catalog model is served.
    fn catalog_status(
        cfg: &LlmModelConfig,
        catalog: &ModelCatalog,
        available: &[&str],
        latency: u128,
    ) -> HealthStatus {
        let missing = missing_models(catalog, available);
        if missing.is_empty() {
            HealthStatus::new(
                cfg.provider,
                &cfg.endpoint,
                catalog,
                true,
                latency,
                format!("{:?} is healthy; all catalog models are available", cfg.provider),
            )
        } else {
            HealthStatus::new(
                cfg.provider,
                &cfg.endpoint,
                catalog,
                false,
                latency,
                format!("{:?} is up, but models are missing: {}", cfg.provider, missing.join(", ")),
            )
        }
    }

    async fn status_error(resp: reqwest::Response, url: String, latency: u128) -> AiLlmError {
        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        let snippet = make_snippet(&text);

        error!(
            %url,
            %status,
            %snippet,
            latency_ms = latency,
            "health probe returned non-success status"
        );

        AiLlmError::Health(HealthError::HttpStatus(HttpError {
            status,
            url,
            snippet,
        }))
    }
}

fn missing_models<'a>(catalog: &'a ModelCatalog, available: &[&str]) -> Vec<&'a str> {
    catalog
        .models()
        .iter()
        .map(String::as_str)
        .filter(|m| !available.contains(m))
        .collect()
}
