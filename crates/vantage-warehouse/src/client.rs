//! Warehouse client contract

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use vantage_core::{CatalogRequest, CompileError, DimensionType, WarehouseCatalog};

use crate::bigquery::BigqueryClient;
use crate::credentials::WarehouseCredentials;
use crate::postgres::{PostgresClient, RedshiftClient};
use crate::snowflake::SnowflakeClient;

/// Column metadata and row set returned by [`WarehouseClient::run_query`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResults {
    /// result column name -> canonical type
    pub columns: BTreeMap<String, DimensionType>,

    /// one JSON object per row, keyed by column name
    pub rows: Vec<serde_json::Map<String, serde_json::Value>>,
}

/// Executes SQL against one warehouse family and introspects its catalog.
///
/// Implementations own their connection handling (pooling, keep-alive,
/// backpressure); callers own retry policy - a failed query surfaces its
/// condition unretried.
#[async_trait]
pub trait WarehouseClient: Send + Sync {
    /// Family tag for display and logging
    fn name(&self) -> &'static str;

    /// Fetch a catalog snapshot covering the requested tables.
    ///
    /// An empty request set returns an empty catalog without touching the
    /// warehouse. The introspection query is necessarily broader than the
    /// exact triples (it filters on schema and table names only), so rows
    /// that match no requested (database, schema, table) triple are
    /// discarded.
    async fn get_catalog(
        &self,
        requests: &[CatalogRequest],
    ) -> Result<WarehouseCatalog, CompileError>;

    /// Run one SQL statement and return typed columns plus rows
    async fn run_query(&self, sql: &str) -> Result<QueryResults, CompileError>;

    /// Lightweight connectivity probe
    async fn test(&self) -> Result<(), CompileError> {
        self.run_query("SELECT 1").await.map(|_| ())
    }
}

/// Construct the client for a credential set.
///
/// Single dispatch point over the closed credentials sum: every supported
/// family must construct here or the match stops compiling.
pub async fn client_from_credentials(
    credentials: &WarehouseCredentials,
) -> Result<Box<dyn WarehouseClient>, CompileError> {
    match credentials {
        WarehouseCredentials::Postgres(credentials) => {
            Ok(Box::new(PostgresClient::connect(credentials).await?))
        }
        WarehouseCredentials::Redshift(credentials) => {
            Ok(Box::new(RedshiftClient::connect(credentials).await?))
        }
        WarehouseCredentials::Snowflake(credentials) => {
            Ok(Box::new(SnowflakeClient::connect(credentials)?))
        }
        WarehouseCredentials::Bigquery(credentials) => {
            Ok(Box::new(BigqueryClient::connect(credentials).await?))
        }
    }
}

/// Quote string literals for an SQL `IN (...)` list
#[cfg_attr(
    not(any(feature = "postgres", feature = "snowflake", feature = "bigquery")),
    allow(dead_code)
)]
pub(crate) fn quote_literal_list<'a>(values: impl IntoIterator<Item = &'a str>) -> String {
    values
        .into_iter()
        .map(|value| format!("'{}'", value.replace('\'', "''")))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_list_quoting() {
        assert_eq!(quote_literal_list(["public", "raw"]), "'public', 'raw'");
        assert_eq!(quote_literal_list(["o'brien"]), "'o''brien'");
        assert_eq!(quote_literal_list(Vec::<&str>::new()), "");
    }
}
