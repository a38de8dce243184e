//! Provider config loaded strictly from environment variables.
//!
//! # Environment variables
//!
//! Common:
//! - `LLM_KIND`         = provider kind: `cortex` (default), `ollama`, `openai`
//! - `LLM_MAX_TOKENS`   = optional max tokens (u32; Ollama/OpenAI only)
//! - `LLM_TEMPERATURE`  = optional temperature (0.0..=2.0; Ollama/OpenAI only)
//! - `LLM_TIMEOUT_SECS` = optional request timeout (default 600)
//!
//! Cortex:
//! - `SNOWFLAKE_ACCOUNT_URL` = account URL (mandatory; token settings live in `snowflake-api`)
//!
//! Ollama:
//! - `OLLAMA_URL` or `OLLAMA_PORT` = endpoint (mandatory)
//!
//! OpenAI:
//! - `OPENAI_URL`     = endpoint (optional, default `https://api.openai.com`)
//! - `OPENAI_API_KEY` = API key (mandatory)

use crate::{
    config::{llm_model_config::LlmModelConfig, llm_provider::LlmProvider},
    error_handler::{
        AiLlmError, ConfigError, env_opt_f32, env_opt_u32, env_opt_u64, must_env, opt_env,
        validate_http_endpoint, validate_range_f32,
    },
};
use tracing::warn;

const DEFAULT_TIMEOUT_SECS: u64 = 600;

/// Reads `LLM_KIND`, defaulting to Cortex.
pub fn provider_from_env() -> Result<LlmProvider, AiLlmError> {
    match opt_env("LLM_KIND") {
        Some(kind) => Ok(kind.parse::<LlmProvider>()?),
        None => Ok(LlmProvider::Cortex),
    }
}

/// Builds the config for whichever provider `LLM_KIND` selects.
pub fn config_from_env() -> Result<LlmModelConfig, AiLlmError> {
    match provider_from_env()? {
        LlmProvider::Cortex => config_cortex(),
        LlmProvider::Ollama => config_ollama(),
        LlmProvider::OpenAI => config_openai(),
    }
}

/// Resolves the Ollama endpoint strictly from environment.
///
/// Precedence:
/// 1. `OLLAMA_URL` if present and non-empty
/// 2. `OLLAMA_PORT` → `http://localhost:{port}`
fn ollama_endpoint() -> Result<String, AiLlmError> {
    if let Some(url) = opt_env("OLLAMA_URL") {
        validate_http_endpoint("OLLAMA_URL", &url)?;
        return Ok(url);
    }
    if let Some(port) = opt_env("OLLAMA_PORT") {
        let port = port
            .trim()
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidNumber {
                var: "OLLAMA_PORT",
                reason: "expected u16 (1..=65535)",
            })?;
        return Ok(format!("http://localhost:{port}"));
    }
    Err(AiLlmError::Config(ConfigError::MissingVar(
        "OLLAMA_URL or OLLAMA_PORT",
    )))
}

/// Sampling knobs shared by every provider.
fn common(provider: LlmProvider, endpoint: String, api_key: Option<String>) -> Result<LlmModelConfig, AiLlmError> {
    let temperature = env_opt_f32("LLM_TEMPERATURE")?;
    if let Some(t) = temperature {
        validate_range_f32("temperature", t, 0.0, 2.0)?;
    }

    Ok(LlmModelConfig {
        provider,
        endpoint,
        api_key,
        max_tokens: env_opt_u32("LLM_MAX_TOKENS")?,
        temperature,
        top_p: None,
        timeout_secs: Some(env_opt_u64("LLM_TIMEOUT_SECS")?.unwrap_or(DEFAULT_TIMEOUT_SECS)),
    })
}

/// Config for Cortex `COMPLETE`.
///
/// The endpoint is informational (used by health output); requests go
/// through the shared SQL API client. The two-argument `COMPLETE` takes no
/// sampling options, so any that are set are dropped with a warning.
pub fn config_cortex() -> Result<LlmModelConfig, AiLlmError> {
    let endpoint = must_env("SNOWFLAKE_ACCOUNT_URL")?;
    validate_http_endpoint("SNOWFLAKE_ACCOUNT_URL", &endpoint)?;
    let mut cfg = common(LlmProvider::Cortex, endpoint.trim_end_matches('/').to_string(), None)?;
    let ignored = clear_sampling(&mut cfg);
    if !ignored.is_empty() {
        warn!(?ignored, "sampling options have no effect with the cortex provider");
    }
    Ok(cfg)
}

/// Resets sampling options and names the ones that were set.
fn clear_sampling(cfg: &mut LlmModelConfig) -> Vec<&'static str> {
    let mut ignored = Vec::new();
    if cfg.max_tokens.take().is_some() {
        ignored.push("LLM_MAX_TOKENS");
    }
    if cfg.temperature.take().is_some() {
        ignored.push("LLM_TEMPERATURE");
    }
    if cfg.top_p.take().is_some() {
        ignored.push("top_p");
    }
    ignored
}

/// Config for a local Ollama server.
pub fn config_ollama() -> Result<LlmModelConfig, AiLlmError> {
    let endpoint = ollama_endpoint()?;
    common(LlmProvider::Ollama, endpoint, None)
}

/// Config for the OpenAI API (or a compatible server).
pub fn config_openai() -> Result<LlmModelConfig, AiLlmError> {
    let endpoint = opt_env("OPENAI_URL").unwrap_or_else(|| "https://api.openai.com".to_string());
    validate_http_endpoint("OPENAI_URL", &endpoint)?;
    let api_key = must_env("OPENAI_API_KEY")?;
    common(LlmProvider::OpenAI, endpoint, Some(api_key))
}
