use std::str::FromStr;

use crate::error_handler::ConfigError;

/// Represents the provider (backend) that answers completion calls.
///
/// The default is Snowflake Cortex; Ollama and OpenAI-compatible servers are
/// kept for local development against the same prompts.
///
/// # Examples
///
/// ```
/// use ai_llm_service::config::llm_provider::LlmProvider;
///
/// let provider: LlmProvider = "ollama".parse().unwrap();
/// assert_eq!(provider, LlmProvider::Ollama);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LlmProvider {
    /// Snowflake Cortex `COMPLETE` through the SQL statements API.
    Cortex,
    /// Local Ollama runtime.
    Ollama,
    /// OpenAI API or any server speaking `/v1/chat/completions`.
    OpenAI,
}

impl FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cortex" | "snowflake" => Ok(LlmProvider::Cortex),
            "ollama" => Ok(LlmProvider::Ollama),
            "openai" | "chatgpt" => Ok(LlmProvider::OpenAI),
            other => Err(ConfigError::UnsupportedProvider(other.to_string())),
        }
    }
}
