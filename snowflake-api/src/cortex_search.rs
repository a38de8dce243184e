//! Cortex Search: service discovery and query.
//!
//! Discovery goes through SQL (`SHOW` + `DESC`), queries through the REST
//! endpoint
//! `POST {account}/api/v2/databases/{db}/schemas/{schema}/cortex-search-services/{name}:query`.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, error, info, instrument, warn};

use crate::{
    errors::{Result, SnowflakeError, make_snippet},
    sql_api::SqlApiClient,
};

/// One search service visible in a schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CortexSearchService {
    /// Service name as stored by Snowflake.
    pub name: String,
    /// Column whose text is indexed and returned for full-text use.
    pub search_column: String,
}

/// A single result row: column name to value.
pub type SearchRecord = Map<String, Value>;

/// Client for Cortex Search services of one account.
#[derive(Debug, Clone)]
pub struct CortexSearchClient {
    sql: SqlApiClient,
}

impl CortexSearchClient {
    pub fn new(sql: SqlApiClient) -> Self {
        Self { sql }
    }

    /// Enumerates services in `database.schema` together with their search column.
    ///
    /// Services whose description lacks a `search_column` are skipped with a warning.
    #[instrument(skip(self))]
    pub async fn list_services(
        &self,
        database: &str,
        schema: &str,
    ) -> Result<Vec<CortexSearchService>> {
        let show = format!("SHOW CORTEX SEARCH SERVICES IN SCHEMA {database}.{schema}");
        let listing = self.sql.execute(&show, &[]).await?;

        let mut out = Vec::with_capacity(listing.len());
        for row in 0..listing.len() {
            let Some(name) = listing.value(row, "name") else {
                continue;
            };
            let desc = format!(
                "DESC CORTEX SEARCH SERVICE {database}.{schema}.{}",
                quote_ident(name)
            );
            let described = self.sql.execute(&desc, &[]).await?;
            match described.value(0, "search_column") {
                Some(col) => out.push(CortexSearchService {
                    name: name.to_string(),
                    search_column: col.to_string(),
                }),
                None => warn!(service = name, "service description has no search_column"),
            }
        }

        info!(count = out.len(), "cortex search services discovered");
        Ok(out)
    }

    /// Runs a query against one service and returns the records in service order.
    ///
    /// # Errors
    /// - [`SnowflakeError::HttpStatus`] for non-2xx responses
    /// - [`SnowflakeError::Decode`] if the body is not `{ "results": [...] }`
    #[instrument(skip(self, query, columns), fields(query_len = query.len()))]
    pub async fn query(
        &self,
        database: &str,
        schema: &str,
        service: &str,
        query: &str,
        columns: &[String],
        limit: u32,
    ) -> Result<Vec<SearchRecord>> {
        let started = Instant::now();
        let url = query_url(self.sql.base_url(), database, schema, service);
        let body = QueryRequest {
            query,
            columns,
            limit,
        };

        debug!("POST {}", url);
        let resp = self.sql.http().post(&url).json(&body).send().await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            let snippet = make_snippet(&text);
            error!(
                %status,
                %url,
                %snippet,
                latency_ms = started.elapsed().as_millis(),
                "cortex search query returned non-success status"
            );
            return Err(SnowflakeError::HttpStatus {
                status,
                url,
                snippet,
            });
        }

        let out: QueryResponse = resp.json().await.map_err(|e| {
            SnowflakeError::Decode(format!("serde error: {e}; expected `{{ results: [...] }}`"))
        })?;

        info!(
            results = out.results.len(),
            request_id = out.request_id.as_deref().unwrap_or("-"),
            latency_ms = started.elapsed().as_millis(),
            "cortex search query completed"
        );
        Ok(out.results)
    }
}

/// Double-quotes an identifier so it is matched exactly as stored.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn query_url(base: &str, database: &str, schema: &str, service: &str) -> String {
    format!(
        "{}/api/v2/databases/{}/schemas/{}/cortex-search-services/{}:query",
        base.trim_end_matches('/'),
        urlencoding::encode(database),
        urlencoding::encode(schema),
        urlencoding::encode(service),
    )
}

#[derive(Debug, Serialize)]
struct QueryRequest<'a> {
    query: &'a str,
    columns: &'a [String],
    limit: u32,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    results: Vec<SearchRecord>,
    #[serde(default)]
    request_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_identifiers() {
        assert_eq!(quote_ident("PLOT_SEARCH"), "\"PLOT_SEARCH\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn query_url_encodes_segments() {
        let url = query_url(
            "https://acme.snowflakecomputing.com/",
            "ACOLYTE_DB",
            "SERVICES",
            "plot search",
        );
        assert_eq!(
            url,
            "https://acme.snowflakecomputing.com/api/v2/databases/ACOLYTE_DB/schemas/SERVICES/cortex-search-services/plot%20search:query"
        );
    }

    #[test]
    fn query_request_shape() {
        let columns = vec!["CHUNK".to_string()];
        let body = QueryRequest {
            query: "who is Mae?",
            columns: &columns,
            limit: 3,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["query"], "who is Mae?");
        assert_eq!(json["columns"][0], "CHUNK");
        assert_eq!(json["limit"], 3);
    }

    #[test]
    fn response_keeps_service_order() {
        let body = r#"{"results":[{"CHUNK":"first"},{"CHUNK":"second"}],"request_id":"r-1"}"#;
        let parsed: QueryResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.results.len(), 2);
        assert_eq!(parsed.results[0]["CHUNK"], "first");
        assert_eq!(parsed.results[1]["CHUNK"], "second");
        assert_eq!(parsed.request_id.as_deref(), Some("r-1"));
    }
}
