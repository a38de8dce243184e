//! Runtime configuration loaded from environment variables.

use std::ops::RangeInclusive;
use std::str::FromStr;

use crate::error::ContextorError;
use crate::session::ChatVariant;

/// Allowed retrieved-chunk counts per search call.
pub const RETRIEVED_CHUNKS_RANGE: RangeInclusive<u32> = 1..=200;
/// Allowed history lengths.
pub const CHAT_MESSAGES_RANGE: RangeInclusive<usize> = 1..=50;

/// Startup defaults for new sessions plus where to look for search services.
#[derive(Clone, Debug, PartialEq)]
pub struct ContextorConfig {
    pub variant: ChatVariant,

    // Search service location
    pub search_database: String,
    pub search_schema: String,

    // Session defaults
    pub num_retrieved_chunks: u32,
    pub num_chat_messages: usize,
    pub debug: bool,
    pub use_chat_history: bool,
}

impl Default for ContextorConfig {
    fn default() -> Self {
        Self {
            variant: ChatVariant::Rag,
            search_database: "ACOLYTE_DB".to_string(),
            search_schema: "SERVICES".to_string(),
            num_retrieved_chunks: 50,
            num_chat_messages: 20,
            debug: true,
            use_chat_history: true,
        }
    }
}

impl ContextorConfig {
    /// Build from environment variables, falling back to [`Default`].
    ///
    /// # Errors
    /// [`ContextorError::InvalidConfig`] for unparsable or out-of-range values.
    pub fn from_env() -> Result<Self, ContextorError> {
        let d = Self::default();
        let cfg = Self {
            variant: parse("CHAT_VARIANT", d.variant)?,
            search_database: env("SEARCH_DATABASE", &d.search_database),
            search_schema: env("SEARCH_SCHEMA", &d.search_schema),
            num_retrieved_chunks: parse("DEFAULT_NUM_RETRIEVED_CHUNKS", d.num_retrieved_chunks)?,
            num_chat_messages: parse("DEFAULT_NUM_CHAT_MESSAGES", d.num_chat_messages)?,
            debug: flag("DEFAULT_DEBUG", d.debug)?,
            use_chat_history: flag("DEFAULT_USE_CHAT_HISTORY", d.use_chat_history)?,
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ContextorError> {
        check_range(
            "num_retrieved_chunks",
            self.num_retrieved_chunks,
            &RETRIEVED_CHUNKS_RANGE,
        )?;
        check_range(
            "num_chat_messages",
            self.num_chat_messages,
            &CHAT_MESSAGES_RANGE,
        )?;
        if self.search_database.trim().is_empty() || self.search_schema.trim().is_empty() {
            return Err(ContextorError::invalid(
                "search location",
                "database and schema must be non-empty",
            ));
        }
        Ok(())
    }
}

pub(crate) fn check_range<T>(
    field: &'static str,
    value: T,
    range: &RangeInclusive<T>,
) -> Result<(), ContextorError>
where
    T: PartialOrd + std::fmt::Display,
{
    if range.contains(&value) {
        Ok(())
    } else {
        Err(ContextorError::invalid(
            field,
            format!(
                "{value} is outside {}..={}",
                range.start(),
                range.end()
            ),
        ))
    }
}

fn env(k: &str, dflt: &str) -> String {
    std::env::var(k)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| dflt.to_string())
}

fn parse<T: FromStr>(k: &'static str, dflt: T) -> Result<T, ContextorError> {
    match std::env::var(k) {
        Ok(v) if !v.trim().is_empty() => v
            .trim()
            .parse()
            .map_err(|_| ContextorError::invalid(k, format!("cannot parse `{}`", v.trim()))),
        _ => Ok(dflt),
    }
}

fn flag(k: &'static str, dflt: bool) -> Result<bool, ContextorError> {
    match std::env::var(k) {
        Ok(v) if !v.trim().is_empty() => parse_flag(&v)
            .ok_or_else(|| ContextorError::invalid(k, format!("expected true/false, got `{v}`"))),
        _ => Ok(dflt),
    }
}

fn parse_flag(v: &str) -> Option<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_original_controls() {
        let d = ContextorConfig::default();
        assert_eq!(d.num_retrieved_chunks, 50);
        assert_eq!(d.num_chat_messages, 20);
        assert!(d.debug && d.use_chat_history);
        assert_eq!(d.variant, ChatVariant::Rag);
        assert!(d.validate().is_ok());
    }

    #[test]
    fn out_of_range_defaults_are_rejected() {
        let cfg = ContextorConfig {
            num_retrieved_chunks: 201,
            ..ContextorConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ContextorError::InvalidConfig {
                field: "num_retrieved_chunks",
                ..
            })
        ));

        let cfg = ContextorConfig {
            num_chat_messages: 0,
            ..ContextorConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn flags_accept_common_spellings() {
        assert_eq!(parse_flag(" TRUE "), Some(true));
        assert_eq!(parse_flag("off"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }
}
