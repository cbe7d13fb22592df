//! PostgreSQL warehouse client (also serving Redshift)
//!
//! Catalog introspection goes through one batched query against
//! `information_schema.columns`, filtered by the requested schema and
//! table names. Ad-hoc queries type their result columns from the wire
//! protocol's type OIDs.
//!
//! ## Authentication
//!
//! Plain connections by default; `sslmode` values of `require` /
//! `verify-ca` / `verify-full` switch to TLS via native-tls.

use async_trait::async_trait;
use vantage_core::{CatalogRequest, CompileError, DimensionType, WarehouseCatalog};

use crate::client::{QueryResults, WarehouseClient};
use crate::credentials::PostgresCredentials;

#[cfg(feature = "postgres")]
use std::collections::{BTreeMap, BTreeSet};

#[cfg(feature = "postgres")]
use serde_json::Value;

#[cfg(feature = "postgres")]
use vantage_core::catalog::insert_catalog_entry;

#[cfg(feature = "postgres")]
use crate::client::quote_literal_list;

#[cfg(feature = "postgres")]
use native_tls::TlsConnector;

#[cfg(feature = "postgres")]
use postgres_native_tls::MakeTlsConnector;

#[cfg(feature = "postgres")]
use tokio_postgres::{types::Type, Client, NoTls};

/// PostgreSQL warehouse client
pub struct PostgresClient {
    #[cfg(feature = "postgres")]
    client: Client,

    host: String,

    port: u16,

    database: String,

    #[cfg(not(feature = "postgres"))]
    _phantom: std::marker::PhantomData<()>,
}

impl PostgresClient {
    /// Connect using the credential set; TLS is chosen from its `sslmode`.
    #[cfg(feature = "postgres")]
    pub async fn connect(credentials: &PostgresCredentials) -> Result<Self, CompileError> {
        let mut config = tokio_postgres::Config::new();
        config
            .host(&credentials.host)
            .port(credentials.port)
            .user(&credentials.user)
            .password(&credentials.password)
            .dbname(&credentials.dbname);
        if let Some(idle) = credentials.keepalives_idle {
            config.keepalives_idle(std::time::Duration::from_secs(idle));
        }

        let client = if credentials.requires_tls() {
            let connector = TlsConnector::builder().build().map_err(|error| {
                CompileError::WarehouseConnection(format!("Failed to create TLS connector: {error}"))
            })?;
            let (client, connection) = config
                .connect(MakeTlsConnector::new(connector))
                .await
                .map_err(|error| connect_error(credentials, &error))?;
            spawn_connection_driver(connection, &credentials.host, credentials.port);
            client
        } else {
            let (client, connection) = config
                .connect(NoTls)
                .await
                .map_err(|error| connect_error(credentials, &error))?;
            spawn_connection_driver(connection, &credentials.host, credentials.port);
            client
        };

        Ok(Self {
            client,
            host: credentials.host.clone(),
            port: credentials.port,
            database: credentials.dbname.clone(),
        })
    }

    /// Connect without the postgres feature (returns an error)
    #[cfg(not(feature = "postgres"))]
    pub async fn connect(credentials: &PostgresCredentials) -> Result<Self, CompileError> {
        let _ = credentials;
        Err(not_compiled())
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    /// Map an `information_schema` `data_type` string to the canonical type
    pub fn map_postgres_type(pg_type: &str) -> DimensionType {
        let base_type = pg_type
            .split('(')
            .next()
            .unwrap_or(pg_type)
            .trim()
            .to_lowercase();

        match base_type.as_str() {
            "boolean" | "bool" => DimensionType::Boolean,

            "smallint" | "int2" | "integer" | "int" | "int4" | "bigint" | "int8"
            | "smallserial" | "serial2" | "serial" | "serial4" | "bigserial" | "serial8"
            | "real" | "float4" | "double precision" | "float8" | "float" | "numeric"
            | "decimal" | "money" | "oid" => DimensionType::Number,

            "date" => DimensionType::Date,

            "timestamp"
            | "timestamp without time zone"
            | "timestamp with time zone"
            | "timestamptz"
            | "time"
            | "time without time zone"
            | "time with time zone"
            | "timetz" => DimensionType::Timestamp,

            _ => DimensionType::String,
        }
    }
}

#[cfg(feature = "postgres")]
fn spawn_connection_driver<S, T>(connection: tokio_postgres::Connection<S, T>, host: &str, port: u16)
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin + Send + 'static,
    T: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin + Send + 'static,
{
    let host = host.to_string();
    tokio::spawn(async move {
        if let Err(error) = connection.await {
            tracing::error!(%host, port, %error, "postgres connection error");
        }
    });
}

#[cfg(feature = "postgres")]
fn connect_error(credentials: &PostgresCredentials, error: &tokio_postgres::Error) -> CompileError {
    CompileError::WarehouseConnection(format!(
        "Failed to connect to PostgreSQL at {}:{}: {error}",
        credentials.host, credentials.port
    ))
}

#[cfg(not(feature = "postgres"))]
fn not_compiled() -> CompileError {
    CompileError::WarehouseConnection(
        "PostgreSQL support not compiled. Rebuild with: cargo build --features postgres"
            .to_string(),
    )
}

/// Map a wire-protocol column type to the canonical type
#[cfg(feature = "postgres")]
fn map_wire_type(wire_type: &Type) -> DimensionType {
    match wire_type.name() {
        "bool" => DimensionType::Boolean,
        "int2" | "int4" | "int8" | "float4" | "float8" | "numeric" | "money" | "oid" => {
            DimensionType::Number
        }
        "date" => DimensionType::Date,
        "timestamp" | "timestamptz" | "time" | "timetz" => DimensionType::Timestamp,
        _ => DimensionType::String,
    }
}

/// Decode one cell to JSON. Values without a clean JSON image decode to
/// null rather than failing the whole result set.
#[cfg(feature = "postgres")]
fn row_value(row: &tokio_postgres::Row, index: usize, wire_type: &Type) -> Value {
    fn number(value: f64) -> Value {
        serde_json::Number::from_f64(value)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }

    match wire_type.name() {
        "bool" => row
            .try_get::<_, Option<bool>>(index)
            .ok()
            .flatten()
            .map(Value::Bool)
            .unwrap_or(Value::Null),
        "int2" => row
            .try_get::<_, Option<i16>>(index)
            .ok()
            .flatten()
            .map(Value::from)
            .unwrap_or(Value::Null),
        "int4" => row
            .try_get::<_, Option<i32>>(index)
            .ok()
            .flatten()
            .map(Value::from)
            .unwrap_or(Value::Null),
        "int8" => row
            .try_get::<_, Option<i64>>(index)
            .ok()
            .flatten()
            .map(Value::from)
            .unwrap_or(Value::Null),
        "float4" => row
            .try_get::<_, Option<f32>>(index)
            .ok()
            .flatten()
            .map(|value| number(value as f64))
            .unwrap_or(Value::Null),
        "float8" => row
            .try_get::<_, Option<f64>>(index)
            .ok()
            .flatten()
            .map(number)
            .unwrap_or(Value::Null),
        "date" => row
            .try_get::<_, Option<chrono::NaiveDate>>(index)
            .ok()
            .flatten()
            .map(|value| Value::String(value.to_string()))
            .unwrap_or(Value::Null),
        "timestamp" => row
            .try_get::<_, Option<chrono::NaiveDateTime>>(index)
            .ok()
            .flatten()
            .map(|value| Value::String(value.to_string()))
            .unwrap_or(Value::Null),
        "timestamptz" => row
            .try_get::<_, Option<chrono::DateTime<chrono::Utc>>>(index)
            .ok()
            .flatten()
            .map(|value| Value::String(value.to_rfc3339()))
            .unwrap_or(Value::Null),
        "json" | "jsonb" => row
            .try_get::<_, Option<Value>>(index)
            .ok()
            .flatten()
            .unwrap_or(Value::Null),
        _ => row
            .try_get::<_, Option<String>>(index)
            .ok()
            .flatten()
            .map(Value::String)
            .unwrap_or(Value::Null),
    }
}

#[async_trait]
impl WarehouseClient for PostgresClient {
    fn name(&self) -> &'static str {
        "postgres"
    }

    #[cfg(feature = "postgres")]
    async fn get_catalog(
        &self,
        requests: &[CatalogRequest],
    ) -> Result<WarehouseCatalog, CompileError> {
        if requests.is_empty() {
            return Ok(WarehouseCatalog::new());
        }

        let schemas: BTreeSet<&str> = requests.iter().map(|r| r.schema.as_str()).collect();
        let tables: BTreeSet<&str> = requests.iter().map(|r| r.table.as_str()).collect();
        let query = format!(
            "SELECT table_catalog, table_schema, table_name, column_name, data_type \
             FROM information_schema.columns \
             WHERE table_schema IN ({}) AND table_name IN ({})",
            quote_literal_list(schemas),
            quote_literal_list(tables)
        );

        let results = self.run_query(&query).await?;
        let mut catalog = WarehouseCatalog::new();
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
                request.database == database && request.schema == schema && request.table == table
            });
            if let Some(request) = matched {
                insert_catalog_entry(&mut catalog, request, column, Self::map_postgres_type(data_type));
            }
        }
        Ok(catalog)
    }

    #[cfg(not(feature = "postgres"))]
    async fn get_catalog(
        &self,
        _requests: &[CatalogRequest],
    ) -> Result<WarehouseCatalog, CompileError> {
        Err(not_compiled())
    }

    #[cfg(feature = "postgres")]
    async fn run_query(&self, sql: &str) -> Result<QueryResults, CompileError> {
        let statement = self
            .client
            .prepare(sql)
            .await
            .map_err(|error| CompileError::WarehouseQuery(error.to_string()))?;
        let rows = self
            .client
            .query(&statement, &[])
            .await
            .map_err(|error| CompileError::WarehouseQuery(error.to_string()))?;

        let mut columns = BTreeMap::new();
        for column in statement.columns() {
            columns.insert(column.name().to_string(), map_wire_type(column.type_()));
        }

        let rows = rows
            .iter()
            .map(|row| {
                let mut record = serde_json::Map::new();
                for (index, column) in statement.columns().iter().enumerate() {
                    record.insert(
                        column.name().to_string(),
                        row_value(row, index, column.type_()),
                    );
                }
                record
            })
            .collect();

        Ok(QueryResults { columns, rows })
    }

    #[cfg(not(feature = "postgres"))]
    async fn run_query(&self, _sql: &str) -> Result<QueryResults, CompileError> {
        Err(not_compiled())
    }
}

/// Redshift warehouse client.
///
/// Redshift speaks the postgres wire protocol; the client differs only in
/// its family tag.
pub struct RedshiftClient {
    inner: PostgresClient,
}

impl RedshiftClient {
    pub async fn connect(credentials: &PostgresCredentials) -> Result<Self, CompileError> {
        Ok(Self {
            inner: PostgresClient::connect(credentials).await?,
        })
    }
}

#[async_trait]
impl WarehouseClient for RedshiftClient {
    fn name(&self) -> &'static str {
        "redshift"
    }

    async fn get_catalog(
        &self,
        requests: &[CatalogRequest],
    ) -> Result<WarehouseCatalog, CompileError> {
        self.inner.get_catalog(requests).await
    }

    async fn run_query(&self, sql: &str) -> Result<QueryResults, CompileError> {
        self.inner.run_query(sql).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_types_map_to_number() {
        for pg_type in [
            "smallint",
            "integer",
            "bigint",
            "serial",
            "numeric(10,2)",
            "double precision",
            "money",
        ] {
            assert_eq!(
                PostgresClient::map_postgres_type(pg_type),
                DimensionType::Number,
                "{pg_type}"
            );
        }
    }

    #[test]
    fn temporal_types() {
        assert_eq!(PostgresClient::map_postgres_type("date"), DimensionType::Date);
        assert_eq!(
            PostgresClient::map_postgres_type("timestamp without time zone"),
            DimensionType::Timestamp
        );
        assert_eq!(
            PostgresClient::map_postgres_type("timestamptz"),
            DimensionType::Timestamp
        );
        assert_eq!(
            PostgresClient::map_postgres_type("time with time zone"),
            DimensionType::Timestamp
        );
    }

    #[test]
    fn booleans_and_strings() {
        assert_eq!(PostgresClient::map_postgres_type("boolean"), DimensionType::Boolean);
        assert_eq!(PostgresClient::map_postgres_type("text"), DimensionType::String);
        assert_eq!(
            PostgresClient::map_postgres_type("character varying(255)"),
            DimensionType::String
        );
    }

    #[test]
    fn unmapped_types_default_to_string() {
        assert_eq!(PostgresClient::map_postgres_type("uuid"), DimensionType::String);
        assert_eq!(PostgresClient::map_postgres_type("jsonb"), DimensionType::String);
        assert_eq!(
            PostgresClient::map_postgres_type("custom_enum"),
            DimensionType::String
        );
    }
}
