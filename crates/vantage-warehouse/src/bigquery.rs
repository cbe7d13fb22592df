//! BigQuery warehouse client
//!
//! Catalog introspection queries `INFORMATION_SCHEMA.COLUMNS` once per
//! requested (project, dataset) pair - the view is dataset-scoped in
//! BigQuery. Ad-hoc queries type their result columns from the response
//! schema.
//!
//! ## Authentication
//!
//! An inline service account key when the credentials carry one, otherwise
//! Application Default Credentials (the `GOOGLE_APPLICATION_CREDENTIALS`
//! environment variable, gcloud CLI credentials, or the GCE/GKE metadata
//! service).

use async_trait::async_trait;
use vantage_core::{CatalogRequest, CompileError, DimensionType, WarehouseCatalog};

use crate::client::{QueryResults, WarehouseClient};
use crate::credentials::BigqueryCredentials;

#[cfg(feature = "bigquery")]
use std::collections::BTreeMap;

#[cfg(feature = "bigquery")]
use gcp_bigquery_client::model::query_request::QueryRequest;

#[cfg(feature = "bigquery")]
use serde_json::Value;

#[cfg(feature = "bigquery")]
use vantage_core::catalog::insert_catalog_entry;

#[cfg(feature = "bigquery")]
use crate::client::quote_literal_list;

/// BigQuery warehouse client
pub struct BigqueryClient {
    project_id: String,

    #[cfg(feature = "bigquery")]
    client: gcp_bigquery_client::Client,

    #[cfg(not(feature = "bigquery"))]
    _phantom: std::marker::PhantomData<()>,
}

impl BigqueryClient {
    /// Connect with an inline service account key, or fall back to
    /// Application Default Credentials when the credentials carry none.
    #[cfg(feature = "bigquery")]
    pub async fn connect(credentials: &BigqueryCredentials) -> Result<Self, CompileError> {
        let client = match &credentials.keyfile_json {
            Some(keyfile) => {
                let key: gcp_bigquery_client::yup_oauth2::ServiceAccountKey =
                    serde_json::from_value(keyfile.clone()).map_err(|error| {
                        CompileError::WarehouseConnection(format!(
                            "Failed to parse service account JSON: {error}"
                        ))
                    })?;
                gcp_bigquery_client::Client::from_service_account_key(key, false)
                    .await
                    .map_err(|error| {
                        CompileError::WarehouseConnection(format!(
                            "Failed to authenticate with service account: {error}"
                        ))
                    })?
            }
            None => gcp_bigquery_client::Client::from_application_default_credentials()
                .await
                .map_err(|error| {
                    CompileError::WarehouseConnection(format!(
                        "Failed to authenticate with application default credentials: {error}"
                    ))
                })?,
        };

        Ok(Self {
            project_id: credentials.project.clone(),
            client,
        })
    }

    /// Connect without the bigquery feature (returns an error)
    #[cfg(not(feature = "bigquery"))]
    pub async fn connect(credentials: &BigqueryCredentials) -> Result<Self, CompileError> {
        let _ = credentials;
        Err(not_compiled())
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// Map an `INFORMATION_SCHEMA` `data_type` string to the canonical type
    pub fn map_bigquery_type(bq_type: &str) -> DimensionType {
        // strip parameters and array/struct payloads: NUMERIC(10,2), ARRAY<STRING>
        let base_type = bq_type
            .split('(')
            .next()
            .unwrap_or(bq_type)
            .split('<')
            .next()
            .unwrap_or(bq_type)
            .trim()
            .to_uppercase();

        match base_type.as_str() {
            "BOOL" | "BOOLEAN" => DimensionType::Boolean,

            "INT64" | "INTEGER" | "INT" | "SMALLINT" | "BIGINT" | "TINYINT" | "BYTEINT"
            | "FLOAT64" | "FLOAT" | "NUMERIC" | "BIGNUMERIC" | "DECIMAL" => DimensionType::Number,

            "DATE" => DimensionType::Date,

            "DATETIME" | "TIMESTAMP" => DimensionType::Timestamp,

            _ => DimensionType::String,
        }
    }
}

#[cfg(not(feature = "bigquery"))]
fn not_compiled() -> CompileError {
    CompileError::WarehouseConnection(
        "BigQuery support not compiled. Rebuild with: cargo build --features bigquery".to_string(),
    )
}

#[cfg(feature = "bigquery")]
fn map_field_type(field_type: &gcp_bigquery_client::model::field_type::FieldType) -> DimensionType {
    use gcp_bigquery_client::model::field_type::FieldType;

    match field_type {
        FieldType::Integer
        | FieldType::Int64
        | FieldType::Float
        | FieldType::Float64
        | FieldType::Numeric
        | FieldType::Bignumeric => DimensionType::Number,
        FieldType::Boolean | FieldType::Bool => DimensionType::Boolean,
        FieldType::Date => DimensionType::Date,
        FieldType::Datetime | FieldType::Timestamp => DimensionType::Timestamp,
        _ => DimensionType::String,
    }
}

#[cfg(feature = "bigquery")]
fn query_error(error: impl std::fmt::Display) -> CompileError {
    CompileError::WarehouseQuery(error.to_string())
}

#[async_trait]
impl WarehouseClient for BigqueryClient {
    fn name(&self) -> &'static str {
        "bigquery"
    }

    #[cfg(feature = "bigquery")]
    async fn get_catalog(
        &self,
        requests: &[CatalogRequest],
    ) -> Result<WarehouseCatalog, CompileError> {
        use std::collections::BTreeSet;

        if requests.is_empty() {
            return Ok(WarehouseCatalog::new());
        }

        let datasets: BTreeSet<(&str, &str)> = requests
            .iter()
            .map(|r| (r.database.as_str(), r.schema.as_str()))
            .collect();
        let mut catalog = WarehouseCatalog::new();

        for (project, dataset) in datasets {
            let tables: BTreeSet<&str> = requests
                .iter()
                .filter(|r| r.database == project && r.schema == dataset)
                .map(|r| r.table.as_str())
                .collect();

            let query = format!(
                "SELECT table_catalog, table_schema, table_name, column_name, data_type \
                 FROM `{project}.{dataset}.INFORMATION_SCHEMA.COLUMNS` \
                 WHERE table_name IN ({})",
                quote_literal_list(tables),
            );

            let results = self.run_query(&query).await?;
            for row in &results.rows {
                let (Some(database), Some(schema), Some(table), Some(column), Some(data_type)) = (
                    row.get("table_catalog").and_then(Value::as_str),
                    row.get("table_schema").and_then(Value::as_str),
                    row.get("table_name").and_then(Value::as_str),
                    row.get("column_name").and_then(Value::as_str),
                    row.get("data_type").and_then(Value::as_str),
                ) else {
                    continue;
                };

                let matched = requests.iter().find(|request| {
                    request.database == database
                        && request.schema == schema
                        && request.table == table
                });
                if let Some(request) = matched {
                    insert_catalog_entry(
                        &mut catalog,
                        request,
                        column,
                        Self::map_bigquery_type(data_type),
                    );
                }
            }
        }
        Ok(catalog)
    }

    #[cfg(not(feature = "bigquery"))]
    async fn get_catalog(
        &self,
        _requests: &[CatalogRequest],
    ) -> Result<WarehouseCatalog, CompileError> {
        Err(not_compiled())
    }

    #[cfg(feature = "bigquery")]
    async fn run_query(&self, sql: &str) -> Result<QueryResults, CompileError> {
        let request = QueryRequest::new(sql.to_string());
        let response = self
            .client
            .job()
            .query(&self.project_id, request)
            .await
            .map_err(query_error)?;

        let mut columns = BTreeMap::new();
        let mut field_names = Vec::new();
        if let Some(schema) = &response.schema {
            if let Some(fields) = &schema.fields {
                for field in fields {
                    field_names.push(field.name.clone());
                    columns.insert(field.name.clone(), map_field_type(&field.r#type));
                }
            }
        }

        let mut result_set =
            gcp_bigquery_client::model::query_response::ResultSet::new_from_query_response(
                response,
            );
        let mut rows = Vec::new();
        while result_set.next_row() {
            let mut record = serde_json::Map::new();
            for name in &field_names {
                let value = result_set
                    .get_json_value_by_name(name)
                    .map_err(query_error)?
                    .unwrap_or(Value::Null);
                record.insert(name.clone(), value);
            }
            rows.push(record);
        }

        Ok(QueryResults { columns, rows })
    }

    #[cfg(not(feature = "bigquery"))]
    async fn run_query(&self, _sql: &str) -> Result<QueryResults, CompileError> {
        Err(not_compiled())
    }
}
