//! Unified error types for the crate.
//!
//! All messages carry the `[Snowflake API]` prefix so they are easy to
//! attribute once they bubble up through the chat pipeline.

use reqwest::StatusCode;
use thiserror::Error;

/// Result alias used by every client in this crate.
pub type Result<T> = std::result::Result<T, SnowflakeError>;

/// Top-level error for Snowflake API calls.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum SnowflakeError {
    /// Required environment variable is missing or empty.
    #[error("[Snowflake API] missing required environment variable: {0}")]
    MissingVar(&'static str),

    /// A configuration value was present but unusable.
    #[error("[Snowflake API] invalid value in {var}: {reason}")]
    InvalidConfig {
        /// Variable or field name (e.g., `SNOWFLAKE_ACCOUNT_URL`).
        var: &'static str,
        /// Human-readable explanation.
        reason: String,
    },

    /// Underlying HTTP transport error.
    #[error("[Snowflake API] transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-successful HTTP status without a structured statement error.
    #[error("[Snowflake API] HTTP {status} from {url}: {snippet}")]
    HttpStatus {
        /// Numeric HTTP status code.
        status: StatusCode,
        /// Request URL.
        url: String,
        /// Short snippet of the response body.
        snippet: String,
    },

    /// The statement was accepted but failed on the server side.
    #[error("[Snowflake API] statement failed (code {code}, sqlstate {sql_state}): {message}")]
    Statement {
        /// Snowflake response code (e.g., `002003`).
        code: String,
        /// ANSI SQL state.
        sql_state: String,
        /// Server message.
        message: String,
    },

    /// Response payload could not be decoded as expected.
    #[error("[Snowflake API] failed to decode response: {0}")]
    Decode(String),
}

/// Trims a response body to a short single-line snippet for logs and errors.
pub fn make_snippet(text: &str) -> String {
    let one_line = text.replace(['\n', '\r'], " ");
    let trimmed = one_line.trim();
    if trimmed.chars().count() <= 240 {
        trimmed.to_string()
    } else {
        let mut s: String = trimmed.chars().take(240).collect();
        s.push('…');
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snippet_is_single_line_and_bounded() {
        let body = format!("line one\nline two {}", "x".repeat(500));
        let s = make_snippet(&body);
        assert!(!s.contains('\n'));
        assert!(s.starts_with("line one line two"));
        assert_eq!(s.chars().count(), 241);
    }

    #[test]
    fn short_snippet_is_untouched() {
        assert_eq!(make_snippet("  not found  "), "not found");
    }
}
