//! Cortex `COMPLETE` over the SQL statements API.
//!
//! Each call is one statement, `SELECT SNOWFLAKE.CORTEX.COMPLETE(?, ?)`, with
//! the model and prompt passed as bindings. The scalar result is the
//! completion text.

use std::time::Instant;

use snowflake_api::{Binding, SqlApiClient};
use tracing::{debug, info, instrument};

use crate::{
    config::llm_provider::LlmProvider,
    error_handler::{AiLlmError, ProviderError, ProviderErrorKind},
};

const COMPLETE_SQL: &str = "SELECT SNOWFLAKE.CORTEX.COMPLETE(?, ?)";

/// Thin Cortex completion client sharing the SQL API connection.
#[derive(Debug, Clone)]
pub struct CortexService {
    sql: SqlApiClient,
}

impl CortexService {
    pub fn new(sql: SqlApiClient) -> Self {
        Self { sql }
    }

    /// Runs one completion and returns the generated text.
    ///
    /// # Errors
    /// - [`AiLlmError::Snowflake`] when the statement fails
    /// - [`AiLlmError::Provider`] with `EmptyResult` when no value comes back
    #[instrument(skip_all, fields(model = %model, prompt_len = prompt.len()))]
    pub async fn complete(&self, model: &str, prompt: &str) -> Result<String, AiLlmError> {
        let started = Instant::now();
        debug!("executing {}", COMPLETE_SQL);

        let rs = self
            .sql
            .execute(COMPLETE_SQL, &[Binding::text(model), Binding::text(prompt)])
            .await?;

        let text = rs
            .first_value()
            .map(str::to_string)
            .ok_or_else(|| ProviderError::new(LlmProvider::Cortex, ProviderErrorKind::EmptyResult))?;

        info!(
            latency_ms = started.elapsed().as_millis(),
            answer_len = text.len(),
            "cortex completion completed"
        );
        Ok(text)
    }

    /// Cheapest possible round trip, used by health checks.
    pub async fn ping(&self) -> Result<(), AiLlmError> {
        self.sql.execute("SELECT 1", &[]).await?;
        Ok(())
    }

    pub fn endpoint(&self) -> &str {
        self.sql.base_url()
    }
}
