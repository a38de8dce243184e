//! Client for the SQL statements REST API.
//!
//! - `POST {account}/api/v2/statements`             : submit a statement
//! - `GET  {account}{statementStatusUrl}`           : poll while the server answers `202`
//! - `GET  {account}/api/v2/statements/{handle}?partition=N`: fetch extra result partitions
//!
//! Values are passed as positional bindings, never spliced into SQL text.

use std::{
    collections::BTreeMap,
    time::{Duration, Instant},
};

use reqwest::{StatusCode, header};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument};

use crate::{
    config::SnowflakeConfig,
    errors::{Result, SnowflakeError, make_snippet},
};

const POLL_START: Duration = Duration::from_millis(250);
const POLL_MAX: Duration = Duration::from_secs(2);

/// A single positional binding (`?` placeholder).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Binding {
    #[serde(rename = "type")]
    kind: &'static str,
    value: String,
}

impl Binding {
    /// A `TEXT` binding.
    pub fn text(value: impl Into<String>) -> Self {
        Self {
            kind: "TEXT",
            value: value.into(),
        }
    }
}

/// Materialized statement result: column names plus rows of nullable strings.
///
/// The API returns every cell as a string (`jsonv2` format), so no typing is
/// attempted here.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    columns: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
}

impl ResultSet {
    /// Builds a result set from raw parts.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Option<String>>>) -> Self {
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Option<String>>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Case-insensitive column lookup.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(name))
    }

    /// Value of `column` in row `row`, `None` for NULL, unknown column or row.
    pub fn value(&self, row: usize, column: &str) -> Option<&str> {
        let idx = self.column_index(column)?;
        self.rows.get(row)?.get(idx)?.as_deref()
    }

    /// First cell of the first row; the shape of scalar `SELECT`s.
    pub fn first_value(&self) -> Option<&str> {
        self.rows.first()?.first()?.as_deref()
    }
}

/// Client for the SQL statements API.
///
/// Holds a preconfigured `reqwest::Client` with the authorization headers
/// baked in; clone-cheap through the inner client.
#[derive(Debug, Clone)]
pub struct SqlApiClient {
    client: reqwest::Client,
    cfg: SnowflakeConfig,
    url_statements: String,
}

impl SqlApiClient {
    /// Creates a client from a validated config.
    ///
    /// # Errors
    /// - [`SnowflakeError::InvalidConfig`] if the URL or token is unusable
    /// - [`SnowflakeError::Transport`] if the HTTP client cannot be built
    pub fn new(cfg: SnowflakeConfig) -> Result<Self> {
        cfg.validate()?;

        let mut headers = header::HeaderMap::new();
        let auth = header::HeaderValue::from_str(&format!("Bearer {}", cfg.token)).map_err(|e| {
            SnowflakeError::InvalidConfig {
                var: "SNOWFLAKE_TOKEN",
                reason: format!("not a valid header value: {e}"),
            }
        })?;
        headers.insert(header::AUTHORIZATION, auth);
        headers.insert(
            "X-Snowflake-Authorization-Token-Type",
            header::HeaderValue::from_static(cfg.token_type.header_value()),
        );
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );
        headers.insert(
            header::USER_AGENT,
            header::HeaderValue::from_static(concat!("cortex-chat/", env!("CARGO_PKG_VERSION"))),
        );

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.http_timeout_secs))
            .default_headers(headers)
            .build()?;

        let url_statements = format!("{}/api/v2/statements", cfg.account_url);

        info!(
            account_url = %cfg.account_url,
            token_type = cfg.token_type.header_value(),
            warehouse = cfg.warehouse.as_deref().unwrap_or("-"),
            role = cfg.role.as_deref().unwrap_or("-"),
            "SqlApiClient initialized"
        );

        Ok(Self {
            client,
            cfg,
            url_statements,
        })
    }

    /// Underlying HTTP client (shares auth headers with this client).
    pub fn http(&self) -> &reqwest::Client {
        &self.client
    }

    /// Account base URL without trailing slash.
    pub fn base_url(&self) -> &str {
        &self.cfg.account_url
    }

    pub fn config(&self) -> &SnowflakeConfig {
        &self.cfg
    }

    /// Executes one statement and waits for the full result.
    ///
    /// # Errors
    /// - [`SnowflakeError::Statement`] if the server rejects or fails the statement
    /// - [`SnowflakeError::HttpStatus`] for unstructured non-2xx responses
    /// - [`SnowflakeError::Transport`] / [`SnowflakeError::Decode`] otherwise
    #[instrument(skip_all, fields(statement = %first_line(statement), bindings = bindings.len()))]
    pub async fn execute(&self, statement: &str, bindings: &[Binding]) -> Result<ResultSet> {
        let started = Instant::now();
        let body = StatementRequest::new(&self.cfg, statement, bindings);

        debug!("POST {}", self.url_statements);
        let resp = self
            .client
            .post(&self.url_statements)
            .json(&body)
            .send()
            .await?;

        let mut state = self.read_statement(resp, &self.url_statements).await?;
        let mut delay = POLL_START;
        let done = loop {
            match state {
                StatementState::Done(done) => break done,
                StatementState::Running(status_url) => {
                    tokio::time::sleep(delay).await;
                    delay = (delay * 2).min(POLL_MAX);

                    let url = format!("{}{}", self.cfg.account_url, status_url);
                    debug!("GET {}", url);
                    let resp = self.client.get(&url).send().await?;
                    state = self.read_statement(resp, &url).await?;
                }
            }
        };
        let result = self.collect_partitions(done).await?;

        info!(
            rows = result.len(),
            latency_ms = started.elapsed().as_millis(),
            "statement completed"
        );
        Ok(result)
    }

    async fn read_statement(&self, resp: reqwest::Response, url: &str) -> Result<StatementState> {
        let status = resp.status();
        let text = resp.text().await?;

        match status {
            StatusCode::OK => {
                let parsed: StatementResponse = serde_json::from_str(&text)
                    .map_err(|e| SnowflakeError::Decode(format!("statement response: {e}")))?;
                Ok(StatementState::Done(parsed))
            }
            StatusCode::ACCEPTED => {
                let parsed: StatementResponse = serde_json::from_str(&text)
                    .map_err(|e| SnowflakeError::Decode(format!("statement status: {e}")))?;
                let status_url = parsed
                    .statement_status_url
                    .or_else(|| {
                        parsed
                            .statement_handle
                            .map(|h| format!("/api/v2/statements/{h}"))
                    })
                    .ok_or_else(|| {
                        SnowflakeError::Decode("202 without statementStatusUrl".into())
                    })?;
                Ok(StatementState::Running(status_url))
            }
            _ => {
                let err = statement_error(status, url, &text);
                error!(%status, %url, error = %err, "statement request failed");
                Err(err)
            }
        }
    }

    async fn collect_partitions(&self, first: StatementResponse) -> Result<ResultSet> {
        let meta = first.result_set_meta_data.unwrap_or_default();
        let columns = meta.row_type.into_iter().map(|c| c.name).collect();
        let mut rows = first.data;

        if meta.partition_info.len() > 1 {
            let handle = first.statement_handle.ok_or_else(|| {
                SnowflakeError::Decode("multi-partition result without statementHandle".into())
            })?;
            for partition in 1..meta.partition_info.len() {
                let url = format!(
                    "{}/{}?partition={}",
                    self.url_statements, handle, partition
                );
                debug!("GET {}", url);
                let resp = self.client.get(&url).send().await?;
                let status = resp.status();
                let text = resp.text().await?;
                if status != StatusCode::OK {
                    return Err(statement_error(status, &url, &text));
                }
                let part: PartitionResponse = serde_json::from_str(&text)
                    .map_err(|e| SnowflakeError::Decode(format!("partition {partition}: {e}")))?;
                rows.extend(part.data);
            }
        }

        Ok(ResultSet::new(columns, rows))
    }
}

enum StatementState {
    Running(String),
    Done(StatementResponse),
}

/// Maps an error body to a structured statement error when possible.
fn statement_error(status: StatusCode, url: &str, text: &str) -> SnowflakeError {
    match serde_json::from_str::<StatementResponse>(text) {
        Ok(StatementResponse {
            message: Some(message),
            code,
            sql_state,
            ..
        }) => SnowflakeError::Statement {
            code: code.unwrap_or_else(|| status.as_u16().to_string()),
            sql_state: sql_state.unwrap_or_default(),
            message,
        },
        _ => SnowflakeError::HttpStatus {
            status,
            url: url.to_string(),
            snippet: make_snippet(text),
        },
    }
}

fn first_line(statement: &str) -> &str {
    statement.trim().lines().next().unwrap_or("")
}

/* ==========================
HTTP payloads
========================== */

#[derive(Debug, Serialize)]
struct StatementRequest<'a> {
    statement: &'a str,
    timeout: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    warehouse: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    bindings: BTreeMap<String, &'a Binding>,
}

impl<'a> StatementRequest<'a> {
    fn new(cfg: &'a SnowflakeConfig, statement: &'a str, bindings: &'a [Binding]) -> Self {
        Self {
            statement,
            timeout: cfg.statement_timeout_secs,
            warehouse: cfg.warehouse.as_deref(),
            role: cfg.role.as_deref(),
            bindings: bindings
                .iter()
                .enumerate()
                .map(|(i, b)| ((i + 1).to_string(), b))
                .collect(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatementResponse {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    sql_state: Option<String>,
    #[serde(default)]
    statement_handle: Option<String>,
    #[serde(default)]
    statement_status_url: Option<String>,
    #[serde(default)]
    result_set_meta_data: Option<ResultSetMetaData>,
    #[serde(default)]
    data: Vec<Vec<Option<String>>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResultSetMetaData {
    #[serde(default)]
    row_type: Vec<ColumnType>,
    #[serde(default)]
    partition_info: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ColumnType {
    name: String,
}

#[derive(Debug, Deserialize)]
struct PartitionResponse {
    #[serde(default)]
    data: Vec<Vec<Option<String>>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TokenType;

    fn cfg() -> SnowflakeConfig {
        SnowflakeConfig {
            account_url: "https://acme.snowflakecomputing.com".into(),
            token: "t".into(),
            token_type: TokenType::ProgrammaticAccessToken,
            warehouse: Some("COMPUTE_WH".into()),
            role: None,
            statement_timeout_secs: 120,
            http_timeout_secs: 120,
        }
    }

    #[test]
    fn request_numbers_bindings_from_one() {
        let cfg = cfg();
        let bindings = vec![Binding::text("mistral-large2"), Binding::text("Hi")];
        let req = StatementRequest::new(&cfg, "SELECT SNOWFLAKE.CORTEX.COMPLETE(?, ?)", &bindings);
        let json = serde_json::to_value(&req).unwrap();

        assert_eq!(json["bindings"]["1"]["type"], "TEXT");
        assert_eq!(json["bindings"]["1"]["value"], "mistral-large2");
        assert_eq!(json["bindings"]["2"]["value"], "Hi");
        assert_eq!(json["warehouse"], "COMPUTE_WH");
        assert_eq!(json["timeout"], 120);
        assert!(json.get("role").is_none());
    }

    #[test]
    fn request_without_bindings_omits_the_field() {
        let cfg = cfg();
        let req = StatementRequest::new(&cfg, "SELECT 1", &[]);
        let json = serde_json::to_value(&req).unwrap();
        assert!(json.get("bindings").is_none());
    }

    #[test]
    fn decodes_result_set_with_nulls() {
        let body = r#"{
            "resultSetMetaData": {
                "numRows": 2,
                "format": "jsonv2",
                "rowType": [{"name": "name", "type": "text"}, {"name": "SEARCH_COLUMN", "type": "text"}],
                "partitionInfo": [{"rowCount": 2, "uncompressedSize": 10}]
            },
            "data": [["PLOT_SEARCH", "CHUNK"], ["OTHER", null]],
            "code": "090001",
            "statementHandle": "01b2-abc"
        }"#;
        let parsed: StatementResponse = serde_json::from_str(body).unwrap();
        let meta = parsed.result_set_meta_data.unwrap();
        let rs = ResultSet::new(meta.row_type.into_iter().map(|c| c.name).collect(), parsed.data);

        assert_eq!(rs.len(), 2);
        assert_eq!(rs.value(0, "NAME"), Some("PLOT_SEARCH"));
        assert_eq!(rs.value(0, "search_column"), Some("CHUNK"));
        assert_eq!(rs.value(1, "search_column"), None);
        assert_eq!(rs.value(5, "name"), None);
        assert_eq!(rs.first_value(), Some("PLOT_SEARCH"));
    }

    #[test]
    fn error_body_becomes_statement_error() {
        let body = r#"{"code":"002003","message":"Object does not exist","sqlState":"02000","statementHandle":"x"}"#;
        let err = statement_error(StatusCode::UNPROCESSABLE_ENTITY, "https://a/api/v2/statements", body);
        match err {
            SnowflakeError::Statement { code, sql_state, message } => {
                assert_eq!(code, "002003");
                assert_eq!(sql_state, "02000");
                assert_eq!(message, "Object does not exist");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn unstructured_error_keeps_snippet() {
        let err = statement_error(StatusCode::BAD_GATEWAY, "https://a", "<html>bad gateway</html>");
        assert!(matches!(err, SnowflakeError::HttpStatus { status, .. } if status == StatusCode::BAD_GATEWAY));
    }
}
