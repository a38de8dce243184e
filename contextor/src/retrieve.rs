//! Document retrieval: search service seam and context block assembly.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use snowflake_api::{CortexSearchClient, CortexSearchService, SearchRecord};
use tracing::{debug, instrument};

use crate::error::ContextorError;

/// A search service and the column whose text feeds the prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDescriptor {
    pub name: String,
    pub search_column: String,
}

impl From<CortexSearchService> for ServiceDescriptor {
    fn from(s: CortexSearchService) -> Self {
        Self {
            name: s.name,
            search_column: s.search_column,
        }
    }
}

/// Where documents come from.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Enumerates the services a session may select from.
    async fn list_services(&self) -> Result<Vec<ServiceDescriptor>, ContextorError>;

    /// Runs one query; records come back in the service's own order.
    async fn search(
        &self,
        service: &ServiceDescriptor,
        query: &str,
        limit: u32,
    ) -> Result<Vec<SearchRecord>, ContextorError>;
}

/// Cortex Search services living in one `database.schema`.
#[derive(Debug, Clone)]
pub struct CortexSearchBackend {
    client: CortexSearchClient,
    database: String,
    schema: String,
}

impl CortexSearchBackend {
    pub fn new(
        client: CortexSearchClient,
        database: impl Into<String>,
        schema: impl Into<String>,
    ) -> Self {
        Self {
            client,
            database: database.into(),
            schema: schema.into(),
        }
    }
}

#[async_trait]
impl SearchBackend for CortexSearchBackend {
    async fn list_services(&self) -> Result<Vec<ServiceDescriptor>, ContextorError> {
        let services = self
            .client
            .list_services(&self.database, &self.schema)
            .await?;
        Ok(services.into_iter().map(ServiceDescriptor::from).collect())
    }

    #[instrument(skip(self, service), fields(service = %service.name))]
    async fn search(
        &self,
        service: &ServiceDescriptor,
        query: &str,
        limit: u32,
    ) -> Result<Vec<SearchRecord>, ContextorError> {
        let columns = [service.search_column.clone()];
        let records = self
            .client
            .query(
                &self.database,
                &self.schema,
                &service.name,
                query,
                &columns,
                limit,
            )
            .await?;
        Ok(records)
    }
}

/// Joins the search column of the first `limit` records into the prompt's
/// context block: `Context document {i}: {text}`, 1-based, blank-line separated.
///
/// Records without the column are skipped and numbering stays dense.
pub fn build_context_block(records: &[SearchRecord], search_column: &str, limit: usize) -> String {
    let docs: Vec<String> = records
        .iter()
        .take(limit)
        .filter_map(|r| column_text(r, search_column))
        .enumerate()
        .map(|(i, text)| format!("Context document {}: {}", i + 1, text))
        .collect();

    if docs.len() < records.len().min(limit) {
        debug!(
            kept = docs.len(),
            column = search_column,
            "some records had no search column"
        );
    }
    docs.join("\n\n")
}

/// Exact key first, then a case-insensitive match (services may upper-case names).
fn column_text(record: &SearchRecord, column: &str) -> Option<String> {
    let value = record.get(column).or_else(|| {
        record
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(column))
            .map(|(_, v)| v)
    })?;
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(v: Value) -> SearchRecord {
        match v {
            Value::Object(m) => m,
            _ => unreachable!("test records are objects"),
        }
    }

    fn chunks(n: usize) -> Vec<SearchRecord> {
        (1..=n)
            .map(|i| record(json!({ "chunk": format!("text {i}") })))
            .collect()
    }

    #[test]
    fn limit_keeps_service_order_and_numbers_from_one() {
        let block = build_context_block(&chunks(5), "chunk", 3);
        assert_eq!(
            block,
            "Context document 1: text 1\n\nContext document 2: text 2\n\nContext document 3: text 3"
        );
    }

    #[test]
    fn no_records_gives_empty_block() {
        assert_eq!(build_context_block(&[], "chunk", 50), "");
    }

    #[test]
    fn records_missing_column_are_skipped() {
        let records = vec![
            record(json!({ "chunk": "a" })),
            record(json!({ "other": "b" })),
            record(json!({ "chunk": null })),
            record(json!({ "CHUNK": "c" })),
        ];
        let block = build_context_block(&records, "chunk", 10);
        assert_eq!(block, "Context document 1: a\n\nContext document 2: c");
    }

    #[test]
    fn non_string_values_are_rendered() {
        let records = vec![record(json!({ "n": 42 }))];
        assert_eq!(build_context_block(&records, "n", 1), "Context document 1: 42");
    }

    #[test]
    fn descriptor_from_cortex_service() {
        let d = ServiceDescriptor::from(CortexSearchService {
            name: "ACOLYTE_SERVICE".into(),
            search_column: "CHUNK".into(),
        });
        assert_eq!(d.name, "ACOLYTE_SERVICE");
        assert_eq!(d.search_column, "CHUNK");
    }
}
