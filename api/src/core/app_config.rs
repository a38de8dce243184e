//! Server settings read from the environment.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidVar { var: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiConfig {
    /// Listen address, e.g. `127.0.0.1:8080`.
    pub address: String,
    /// Sessions untouched for this long are discarded.
    pub session_idle_ttl: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:8080".to_string(),
            session_idle_ttl: Duration::from_secs(3600),
        }
    }
}

impl ApiConfig {
    /// `API_ADDRESS` and `SESSION_IDLE_TTL_SECS`, both optional.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut cfg = Self::default();
        if let Some(addr) = non_empty("API_ADDRESS") {
            cfg.address = addr;
        }
        if let Some(raw) = non_empty("SESSION_IDLE_TTL_SECS") {
            let secs = raw
                .parse::<u64>()
                .ok()
                .filter(|s| *s > 0)
                .ok_or_else(|| ConfigError::InvalidVar {
                    var: "SESSION_IDLE_TTL_SECS",
                    reason: format!("expected a positive integer, got `{raw}`"),
                })?;
            cfg.session_idle_ttl = Duration::from_secs(secs);
        }
        Ok(cfg)
    }
}

fn non_empty(var: &str) -> Option<String> {
    std::env::var(var)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
