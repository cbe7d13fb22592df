//! Mock warehouse client for tests
//!
//! Serves a predefined catalog and staged query results without touching
//! any warehouse. Useful for unit-testing reconciliation and compilation,
//! CI pipelines, and simulating failures.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use vantage_core::catalog::insert_catalog_entry;
use vantage_core::{CatalogRequest, CompileError, DimensionType, WarehouseCatalog};

use crate::client::{QueryResults, WarehouseClient};

/// In-memory warehouse client
///
/// Clones share state, so a test can keep a handle for staging data while
/// the code under test owns another.
pub struct MockClient {
    catalog: Arc<RwLock<WarehouseCatalog>>,

    /// Staged results, keyed by the exact SQL text
    results: Arc<RwLock<HashMap<String, QueryResults>>>,

    fail_queries: bool,

    latency_ms: u64,
}

impl MockClient {
    pub fn new() -> Self {
        Self {
            catalog: Arc::new(RwLock::new(WarehouseCatalog::new())),
            results: Arc::new(RwLock::new(HashMap::new())),
            fail_queries: false,
            latency_ms: 0,
        }
    }

    /// Make every query (and therefore `test()`) fail
    pub fn with_query_failure(mut self) -> Self {
        self.fail_queries = true;
        self
    }

    /// Add a delay before every operation, for timeout/progress testing
    pub fn with_latency(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    /// Register one table and its columns in the served catalog
    pub async fn add_table(
        &self,
        request: &CatalogRequest,
        columns: impl IntoIterator<Item = (&str, DimensionType)>,
    ) {
        let mut catalog = self.catalog.write().await;
        for (column, dimension_type) in columns {
            insert_catalog_entry(&mut catalog, request, column, dimension_type);
        }
    }

    /// Stage the results returned for one exact SQL string
    pub async fn stage_result(&self, sql: impl Into<String>, results: QueryResults) {
        self.results.write().await.insert(sql.into(), results);
    }

    async fn simulate_latency(&self) {
        if self.latency_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(self.latency_ms)).await;
        }
    }
}

impl Default for MockClient {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for MockClient {
    fn clone(&self) -> Self {
        Self {
            catalog: Arc::clone(&self.catalog),
            results: Arc::clone(&self.results),
            fail_queries: self.fail_queries,
            latency_ms: self.latency_ms,
        }
    }
}

#[async_trait]
impl WarehouseClient for MockClient {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn get_catalog(
        &self,
        requests: &[CatalogRequest],
    ) -> Result<WarehouseCatalog, CompileError> {
        self.simulate_latency().await;

        if self.fail_queries {
            return Err(CompileError::WarehouseQuery(
                "Simulated query failure".to_string(),
            ));
        }
        if requests.is_empty() {
            return Ok(WarehouseCatalog::new());
        }

        let stored = self.catalog.read().await;
        let mut catalog = WarehouseCatalog::new();
        for request in requests {
            let table = stored
                .get(&request.database)
                .and_then(|schemas| schemas.get(&request.schema))
                .and_then(|tables| tables.get(&request.table));
            if let Some(columns) = table {
                for (column, dimension_type) in columns {
                    insert_catalog_entry(&mut catalog, request, column, *dimension_type);
                }
            }
        }
        Ok(catalog)
    }

    async fn run_query(&self, sql: &str) -> Result<QueryResults, CompileError> {
        self.simulate_latency().await;

        if self.fail_queries {
            return Err(CompileError::WarehouseQuery(
                "Simulated query failure".to_string(),
            ));
        }

        Ok(self
            .results
            .read()
            .await
            .get(sql)
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn orders_request() -> CatalogRequest {
        CatalogRequest::new("db", "public", "orders")
    }

    #[tokio::test]
    async fn serves_only_requested_tables() {
        let client = MockClient::new();
        client
            .add_table(&orders_request(), [("id", DimensionType::Number)])
            .await;
        client
            .add_table(
                &CatalogRequest::new("db", "public", "customers"),
                [("id", DimensionType::Number)],
            )
            .await;

        let catalog = client.get_catalog(&[orders_request()]).await.unwrap();
        assert!(catalog["db"]["public"].contains_key("orders"));
        assert!(!catalog["db"]["public"].contains_key("customers"));
    }

    #[tokio::test]
    async fn empty_request_set_short_circuits() {
        let client = MockClient::new().with_query_failure();
        // no query is issued, so the failure toggle never trips
        let catalog = client.get_catalog(&[]).await.unwrap();
        assert!(catalog.is_empty());
    }

    #[tokio::test]
    async fn missing_tables_are_absent_not_errors() {
        let client = MockClient::new();
        let catalog = client.get_catalog(&[orders_request()]).await.unwrap();
        assert!(catalog.is_empty());
    }

    #[tokio::test]
    async fn staged_query_results_round_trip() {
        let client = MockClient::new();
        let mut results = QueryResults::default();
        results
            .columns
            .insert("count".to_string(), DimensionType::Number);
        let mut row = serde_json::Map::new();
        row.insert("count".to_string(), json!(42));
        results.rows.push(row);
        client.stage_result("SELECT COUNT(*) FROM orders", results.clone()).await;

        let fetched = client.run_query("SELECT COUNT(*) FROM orders").await.unwrap();
        assert_eq!(fetched, results);
        assert_eq!(fetched.rows[0]["count"], json!(42));
    }

    #[tokio::test]
    async fn query_failure_fails_the_probe() {
        let client = MockClient::new().with_query_failure();
        let err = client.test().await.unwrap_err();
        assert!(matches!(err, CompileError::WarehouseQuery(_)));

        let healthy = MockClient::new();
        assert!(healthy.test().await.is_ok());
    }

    #[tokio::test]
    async fn clones_share_state() {
        let client = MockClient::new();
        let handle = client.clone();
        handle
            .add_table(&orders_request(), [("id", DimensionType::Number)])
            .await;

        let catalog = client.get_catalog(&[orders_request()]).await.unwrap();
        assert!(!catalog.is_empty());
    }
}
