//! Connection settings loaded strictly from environment variables.
//!
//! # Environment variables
//!
//! - `SNOWFLAKE_ACCOUNT_URL`            = account base URL (mandatory), e.g. `https://xy12345.snowflakecomputing.com`
//! - `SNOWFLAKE_TOKEN`                  = bearer token (mandatory)
//! - `SNOWFLAKE_TOKEN_TYPE`             = `PROGRAMMATIC_ACCESS_TOKEN` (default), `KEYPAIR_JWT` or `OAUTH`
//! - `SNOWFLAKE_WAREHOUSE`              = warehouse for statements (optional)
//! - `SNOWFLAKE_ROLE`                   = role for statements (optional)
//! - `SNOWFLAKE_STATEMENT_TIMEOUT_SECS` = server-side statement timeout (optional, default 600)
//! - `SNOWFLAKE_HTTP_TIMEOUT_SECS`      = client-side request timeout (optional, default 600)

use std::{fmt, str::FromStr};

use crate::errors::{Result, SnowflakeError};

/// Kind of bearer token sent in `X-Snowflake-Authorization-Token-Type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenType {
    /// Programmatic access token created for a user.
    ProgrammaticAccessToken,
    /// JWT signed with the user's key pair.
    KeypairJwt,
    /// OAuth access token.
    OAuth,
}

impl TokenType {
    /// Header value expected by the REST endpoints.
    pub fn header_value(self) -> &'static str {
        match self {
            TokenType::ProgrammaticAccessToken => "PROGRAMMATIC_ACCESS_TOKEN",
            TokenType::KeypairJwt => "KEYPAIR_JWT",
            TokenType::OAuth => "OAUTH",
        }
    }
}

impl FromStr for TokenType {
    type Err = SnowflakeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PROGRAMMATIC_ACCESS_TOKEN" | "PAT" => Ok(TokenType::ProgrammaticAccessToken),
            "KEYPAIR_JWT" | "JWT" => Ok(TokenType::KeypairJwt),
            "OAUTH" => Ok(TokenType::OAuth),
            other => Err(SnowflakeError::InvalidConfig {
                var: "SNOWFLAKE_TOKEN_TYPE",
                reason: format!("unsupported token type `{other}`"),
            }),
        }
    }
}

/// Everything needed to talk to one Snowflake account.
#[derive(Clone)]
pub struct SnowflakeConfig {
    /// Account base URL without trailing slash.
    pub account_url: String,
    /// Bearer token.
    pub token: String,
    /// How the token should be interpreted by the server.
    pub token_type: TokenType,
    /// Optional warehouse applied to every statement.
    pub warehouse: Option<String>,
    /// Optional role applied to every statement.
    pub role: Option<String>,
    /// Server-side statement timeout in seconds.
    pub statement_timeout_secs: u64,
    /// Client-side HTTP timeout in seconds.
    pub http_timeout_secs: u64,
}

impl fmt::Debug for SnowflakeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnowflakeConfig")
            .field("account_url", &self.account_url)
            .field("token", &"<redacted>")
            .field("token_type", &self.token_type)
            .field("warehouse", &self.warehouse)
            .field("role", &self.role)
            .field("statement_timeout_secs", &self.statement_timeout_secs)
            .field("http_timeout_secs", &self.http_timeout_secs)
            .finish()
    }
}

impl SnowflakeConfig {
    /// Builds a config from the environment.
    ///
    /// # Errors
    /// - [`SnowflakeError::MissingVar`] when the URL or token is absent
    /// - [`SnowflakeError::InvalidConfig`] for malformed values
    pub fn from_env() -> Result<Self> {
        let account_url = must_env("SNOWFLAKE_ACCOUNT_URL")?;
        let token = must_env("SNOWFLAKE_TOKEN")?;
        let token_type = match opt_env("SNOWFLAKE_TOKEN_TYPE") {
            Some(v) => v.parse()?,
            None => TokenType::ProgrammaticAccessToken,
        };

        let cfg = Self {
            account_url: account_url.trim().trim_end_matches('/').to_string(),
            token,
            token_type,
            warehouse: opt_env("SNOWFLAKE_WAREHOUSE"),
            role: opt_env("SNOWFLAKE_ROLE"),
            statement_timeout_secs: opt_u64("SNOWFLAKE_STATEMENT_TIMEOUT_SECS")?.unwrap_or(600),
            http_timeout_secs: opt_u64("SNOWFLAKE_HTTP_TIMEOUT_SECS")?.unwrap_or(600),
        };
        cfg.validate()?;
        Ok(cfg)
    }

    /// Validates the URL scheme and token presence.
    pub fn validate(&self) -> Result<()> {
        let url = self.account_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(SnowflakeError::InvalidConfig {
                var: "SNOWFLAKE_ACCOUNT_URL",
                reason: "must start with http:// or https://".into(),
            });
        }
        if self.token.trim().is_empty() {
            return Err(SnowflakeError::MissingVar("SNOWFLAKE_TOKEN"));
        }
        Ok(())
    }

    /// Returns `true` when the two mandatory variables are set.
    ///
    /// Used by binaries to decide whether a search backend can be wired at all.
    pub fn is_configured() -> bool {
        opt_env("SNOWFLAKE_ACCOUNT_URL").is_some() && opt_env("SNOWFLAKE_TOKEN").is_some()
    }
}

fn must_env(name: &'static str) -> Result<String> {
    opt_env(name).ok_or(SnowflakeError::MissingVar(name))
}

fn opt_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn opt_u64(name: &'static str) -> Result<Option<u64>> {
    match opt_env(name) {
        Some(v) => v
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|_| SnowflakeError::InvalidConfig {
                var: name,
                reason: "expected u64".into(),
            }),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SnowflakeConfig {
        SnowflakeConfig {
            account_url: "https://xy12345.snowflakecomputing.com".into(),
            token: "secret-token".into(),
            token_type: TokenType::ProgrammaticAccessToken,
            warehouse: None,
            role: None,
            statement_timeout_secs: 60,
            http_timeout_secs: 60,
        }
    }

    #[test]
    fn token_type_parses_aliases() {
        assert_eq!("pat".parse::<TokenType>().unwrap(), TokenType::ProgrammaticAccessToken);
        assert_eq!("keypair_jwt".parse::<TokenType>().unwrap(), TokenType::KeypairJwt);
        assert_eq!("OAuth".parse::<TokenType>().unwrap(), TokenType::OAuth);
        assert!("basic".parse::<TokenType>().is_err());
    }

    #[test]
    fn debug_output_redacts_token() {
        let rendered = format!("{:?}", sample());
        assert!(!rendered.contains("secret-token"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn validate_rejects_bad_scheme() {
        let mut cfg = sample();
        cfg.account_url = "xy12345.snowflakecomputing.com".into();
        assert!(matches!(
            cfg.validate(),
            Err(SnowflakeError::InvalidConfig { var: "SNOWFLAKE_ACCOUNT_URL", .. })
        ));
    }
}
