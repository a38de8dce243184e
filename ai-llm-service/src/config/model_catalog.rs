//! The fixed, ordered set of models a user may pick from.

use serde::Serialize;

use crate::{
    config::llm_provider::LlmProvider,
    error_handler::{AiLlmError, ConfigError, opt_env},
};

/// Models offered by Cortex out of the box, in selector order.
pub const CORTEX_MODELS: &[&str] = &["llama3.1-70b", "mistral-large2", "llama3.1-8b", "mixtral-8x7b"];

/// Ordered, non-empty list of model identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ModelCatalog {
    models: Vec<String>,
}

impl ModelCatalog {
    /// Builds a catalog, dropping blanks and duplicates while keeping order.
    ///
    /// # Errors
    /// [`ConfigError::EmptyCatalog`] if nothing usable remains.
    pub fn new<I, S>(models: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out: Vec<String> = Vec::new();
        for m in models {
            let m = m.as_ref().trim();
            if !m.is_empty() && !out.iter().any(|x| x == m) {
                out.push(m.to_string());
            }
        }
        if out.is_empty() {
            return Err(ConfigError::EmptyCatalog);
        }
        Ok(Self { models: out })
    }

    /// Parses a comma-separated list such as `LLM_MODELS`.
    pub fn parse(list: &str) -> Result<Self, ConfigError> {
        Self::new(list.split(','))
    }

    /// The default Cortex catalog.
    pub fn cortex_default() -> Self {
        Self {
            models: CORTEX_MODELS.iter().map(|m| m.to_string()).collect(),
        }
    }

    /// `LLM_MODELS` when set; otherwise the Cortex list for Cortex and an
    /// error for providers without a sensible default.
    pub fn from_env(provider: LlmProvider) -> Result<Self, AiLlmError> {
        match opt_env("LLM_MODELS") {
            Some(list) => Ok(Self::parse(&list)?),
            None if provider == LlmProvider::Cortex => Ok(Self::cortex_default()),
            None => Err(ConfigError::MissingVar("LLM_MODELS").into()),
        }
    }

    pub fn models(&self) -> &[String] {
        &self.models
    }

    pub fn contains(&self, model: &str) -> bool {
        self.models.iter().any(|m| m == model)
    }

    /// Model at `index`, or the last one when the catalog is shorter.
    pub fn at_or_last(&self, index: usize) -> &str {
        let i = index.min(self.models.len() - 1);
        &self.models[i]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_trims_and_dedups() {
        let c = ModelCatalog::parse(" qwen3:14b, llama3.1:8b,,qwen3:14b ").unwrap();
        assert_eq!(c.models(), ["qwen3:14b", "llama3.1:8b"]);
    }

    #[test]
    fn empty_list_is_rejected() {
        assert!(matches!(ModelCatalog::parse(" , "), Err(ConfigError::EmptyCatalog)));
    }

    #[test]
    fn cortex_default_order() {
        let c = ModelCatalog::cortex_default();
        assert_eq!(c.at_or_last(0), "llama3.1-70b");
        assert_eq!(c.at_or_last(1), "mistral-large2");
        assert!(c.contains("mixtral-8x7b"));
        assert!(!c.contains("gpt-4o"));
    }

    #[test]
    fn at_or_last_clamps() {
        let c = ModelCatalog::parse("only-one").unwrap();
        assert_eq!(c.at_or_last(1), "only-one");
    }
}
