//! Snowflake warehouse client
//!
//! Catalog introspection queries `INFORMATION_SCHEMA.COLUMNS` once per
//! requested database (the view is database-scoped in Snowflake).
//! Snowflake upper-cases unquoted identifiers, so request triples are
//! matched case-insensitively against the returned rows. Query results
//! arrive as Arrow record batches and are decoded column by column.

use async_trait::async_trait;
use vantage_core::{CatalogRequest, CompileError, DimensionType, WarehouseCatalog};

use crate::client::{QueryResults, WarehouseClient};
use crate::credentials::SnowflakeCredentials;

#[cfg(feature = "snowflake")]
use std::collections::BTreeMap;

#[cfg(feature = "snowflake")]
use serde_json::Value;

#[cfg(feature = "snowflake")]
use snowflake_api::SnowflakeApi;

#[cfg(feature = "snowflake")]
use vantage_core::catalog::insert_catalog_entry;

#[cfg(feature = "snowflake")]
use crate::client::quote_literal_list;

/// Snowflake warehouse client
pub struct SnowflakeClient {
    #[cfg(feature = "snowflake")]
    api: SnowflakeApi,

    account: String,

    #[cfg(not(feature = "snowflake"))]
    _phantom: std::marker::PhantomData<()>,
}

impl SnowflakeClient {
    /// Authenticate with username/password credentials
    #[cfg(feature = "snowflake")]
    pub fn connect(credentials: &SnowflakeCredentials) -> Result<Self, CompileError> {
        let api = SnowflakeApi::with_password_auth(
            &credentials.account,
            credentials.warehouse.as_deref(),
            credentials.database.as_deref(),
            credentials.schema.as_deref(),
            &credentials.user,
            credentials.role.as_deref(),
            &credentials.password,
        )
        .map_err(|error| {
            CompileError::WarehouseConnection(format!(
                "Failed to authenticate with Snowflake account {}: {error}",
                credentials.account
            ))
        })?;

        Ok(Self {
            api,
            account: credentials.account.clone(),
        })
    }

    /// Connect without the snowflake feature (returns an error)
    #[cfg(not(feature = "snowflake"))]
    pub fn connect(credentials: &SnowflakeCredentials) -> Result<Self, CompileError> {
        let _ = credentials;
        Err(not_compiled())
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    /// Map an `INFORMATION_SCHEMA` `DATA_TYPE` string to the canonical type
    pub fn map_snowflake_type(sf_type: &str) -> DimensionType {
        // Snowflake types can carry precision/scale, e.g. "NUMBER(38,0)"
        let base_type = sf_type
            .split('(')
            .next()
            .unwrap_or(sf_type)
            .trim()
            .to_uppercase();

        match base_type.as_str() {
            "BOOLEAN" => DimensionType::Boolean,

            "NUMBER" | "DECIMAL" | "NUMERIC" | "INT" | "INTEGER" | "BIGINT" | "SMALLINT"
            | "TINYINT" | "BYTEINT" | "FLOAT" | "FLOAT4" | "FLOAT8" | "DOUBLE"
            | "DOUBLE PRECISION" | "REAL" => DimensionType::Number,

            "DATE" => DimensionType::Date,

            "DATETIME" | "TIME" | "TIMESTAMP" | "TIMESTAMP_NTZ" | "TIMESTAMP_LTZ"
            | "TIMESTAMP_TZ" => DimensionType::Timestamp,

            _ => DimensionType::String,
        }
    }
}

#[cfg(not(feature = "snowflake"))]
fn not_compiled() -> CompileError {
    CompileError::WarehouseConnection(
        "Snowflake support not compiled. Rebuild with: cargo build --features snowflake"
            .to_string(),
    )
}

#[cfg(feature = "snowflake")]
fn map_arrow_type(data_type: &arrow_schema::DataType) -> DimensionType {
    use arrow_schema::DataType;

    match data_type {
        DataType::Boolean => DimensionType::Boolean,
        DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32
        | DataType::UInt64
        | DataType::Float32
        | DataType::Float64
        | DataType::Decimal128(_, _)
        | DataType::Decimal256(_, _) => DimensionType::Number,
        DataType::Date32 | DataType::Date64 => DimensionType::Date,
        DataType::Timestamp(_, _) => DimensionType::Timestamp,
        _ => DimensionType::String,
    }
}

#[cfg(feature = "snowflake")]
fn arrow_value(array: &dyn arrow_array::Array, row: usize) -> Value {
    use arrow_array::cast::AsArray;
    use arrow_array::temporal_conversions;
    use arrow_array::types::{
        Date32Type, Date64Type, Decimal128Type, Float32Type, Float64Type, Int16Type, Int32Type,
        Int64Type, Int8Type, TimestampMicrosecondType, TimestampMillisecondType,
        TimestampNanosecondType, TimestampSecondType, UInt16Type, UInt32Type, UInt64Type,
        UInt8Type,
    };
    use arrow_schema::{DataType, TimeUnit};

    fn number(value: f64) -> Value {
        serde_json::Number::from_f64(value)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }

    if array.is_null(row) {
        return Value::Null;
    }

    match array.data_type() {
        DataType::Boolean => Value::Bool(array.as_boolean().value(row)),
        DataType::Utf8 => Value::String(array.as_string::<i32>().value(row).to_string()),
        DataType::LargeUtf8 => Value::String(array.as_string::<i64>().value(row).to_string()),
        DataType::Int8 => Value::from(array.as_primitive::<Int8Type>().value(row)),
        DataType::Int16 => Value::from(array.as_primitive::<Int16Type>().value(row)),
        DataType::Int32 => Value::from(array.as_primitive::<Int32Type>().value(row)),
        DataType::Int64 => Value::from(array.as_primitive::<Int64Type>().value(row)),
        DataType::UInt8 => Value::from(array.as_primitive::<UInt8Type>().value(row)),
        DataType::UInt16 => Value::from(array.as_primitive::<UInt16Type>().value(row)),
        DataType::UInt32 => Value::from(array.as_primitive::<UInt32Type>().value(row)),
        DataType::UInt64 => Value::from(array.as_primitive::<UInt64Type>().value(row)),
        DataType::Float32 => number(array.as_primitive::<Float32Type>().value(row) as f64),
        DataType::Float64 => number(array.as_primitive::<Float64Type>().value(row)),
        DataType::Decimal128(_, _) => {
            Value::String(array.as_primitive::<Decimal128Type>().value_as_string(row))
        }
        DataType::Date32 => {
            let days = array.as_primitive::<Date32Type>().value(row);
            temporal_conversions::date32_to_datetime(days)
                .map(|datetime| Value::String(datetime.date().to_string()))
                .unwrap_or(Value::Null)
        }
        DataType::Date64 => {
            let millis = array.as_primitive::<Date64Type>().value(row);
            temporal_conversions::date64_to_datetime(millis)
                .map(|datetime| Value::String(datetime.date().to_string()))
                .unwrap_or(Value::Null)
        }
        DataType::Timestamp(unit, _) => {
            let datetime = match unit {
                TimeUnit::Second => temporal_conversions::timestamp_s_to_datetime(
                    array.as_primitive::<TimestampSecondType>().value(row),
                ),
                TimeUnit::Millisecond => temporal_conversions::timestamp_ms_to_datetime(
                    array.as_primitive::<TimestampMillisecondType>().value(row),
                ),
                TimeUnit::Microsecond => temporal_conversions::timestamp_us_to_datetime(
                    array.as_primitive::<TimestampMicrosecondType>().value(row),
                ),
                TimeUnit::Nanosecond => temporal_conversions::timestamp_ns_to_datetime(
                    array.as_primitive::<TimestampNanosecondType>().value(row),
                ),
            };
            datetime
                .map(|datetime| Value::String(datetime.to_string()))
                .unwrap_or(Value::Null)
        }
        _ => Value::Null,
    }
}

#[async_trait]
impl WarehouseClient for SnowflakeClient {
    fn name(&self) -> &'static str {
        "snowflake"
    }

    #[cfg(feature = "snowflake")]
    async fn get_catalog(
        &self,
        requests: &[CatalogRequest],
    ) -> Result<WarehouseCatalog, CompileError> {
        use std::collections::BTreeSet;

        if requests.is_empty() {
            return Ok(WarehouseCatalog::new());
        }

        let databases: BTreeSet<&str> = requests.iter().map(|r| r.database.as_str()).collect();
        let mut catalog = WarehouseCatalog::new();

        for database in databases {
            let schemas: BTreeSet<String> = requests
                .iter()
                .filter(|r| r.database == database)
                .map(|r| r.schema.to_uppercase())
                .collect();
            let tables: BTreeSet<String> = requests
                .iter()
                .filter(|r| r.database == database)
                .map(|r| r.table.to_uppercase())
                .collect();

            let query = format!(
                "SELECT TABLE_CATALOG, TABLE_SCHEMA, TABLE_NAME, COLUMN_NAME, DATA_TYPE \
                 FROM {database}.INFORMATION_SCHEMA.COLUMNS \
                 WHERE TABLE_SCHEMA IN ({}) AND TABLE_NAME IN ({})",
                quote_literal_list(schemas.iter().map(String::as_str)),
                quote_literal_list(tables.iter().map(String::as_str)),
            );

            let results = self.run_query(&query).await?;
            for row in &results.rows {
                let (Some(row_database), Some(schema), Some(table), Some(column), Some(data_type)) = (
                    row.get("TABLE_CATALOG").and_then(Value::as_str),
                    row.get("TABLE_SCHEMA").and_then(Value::as_str),
                    row.get("TABLE_NAME").and_then(Value::as_str),
                    row.get("COLUMN_NAME").and_then(Value::as_str),
                    row.get("DATA_TYPE").and_then(Value::as_str),
                ) else {
                    continue;
                };

                // unquoted identifiers come back upper-cased
                let matched = requests.iter().find(|request| {
                    request.database.eq_ignore_ascii_case(row_database)
                        && request.schema.eq_ignore_ascii_case(schema)
                        && request.table.eq_ignore_ascii_case(table)
                });
                if let Some(request) = matched {
                    insert_catalog_entry(
                        &mut catalog,
                        request,
                        column,
                        Self::map_snowflake_type(data_type),
                    );
                }
            }
        }
        Ok(catalog)
    }

    #[cfg(not(feature = "snowflake"))]
    async fn get_catalog(
        &self,
        _requests: &[CatalogRequest],
    ) -> Result<WarehouseCatalog, CompileError> {
        Err(not_compiled())
    }

    #[cfg(feature = "snowflake")]
    async fn run_query(&self, sql: &str) -> Result<QueryResults, CompileError> {
        use snowflake_api::QueryResult;

        let result = self
            .api
            .exec(sql)
            .await
            .map_err(|error| CompileError::WarehouseQuery(error.to_string()))?;

        match result {
            QueryResult::Arrow(batches) => {
                let mut columns = BTreeMap::new();
                let mut rows = Vec::new();
                for batch in &batches {
                    let schema = batch.schema();
                    if columns.is_empty() {
                        for field in schema.fields().iter() {
                            columns.insert(
                                field.name().clone(),
                                map_arrow_type(field.data_type()),
                            );
                        }
                    }
                    for row_index in 0..batch.num_rows() {
                        let mut record = serde_json::Map::new();
                        for (column_index, field) in schema.fields().iter().enumerate() {
                            record.insert(
                                field.name().clone(),
                                arrow_value(batch.column(column_index).as_ref(), row_index),
                            );
                        }
                        rows.push(record);
                    }
                }
                Ok(QueryResults { columns, rows })
            }
            QueryResult::Json(_) => Err(CompileError::WarehouseQuery(
                "Unexpected JSON result format from Snowflake".to_string(),
            )),
            QueryResult::Empty => Ok(QueryResults::default()),
        }
    }

    #[cfg(not(feature = "snowflake"))]
    async fn run_query(&self, _sql: &str) -> Result<QueryResults, CompileError> {
        Err(not_compiled())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_types_map_to_number() {
        for sf_type in ["NUMBER(38,0)", "NUMBER(10,2)", "DECIMAL", "FLOAT", "DOUBLE PRECISION"] {
            assert_eq!(
                SnowflakeClient::map_snowflake_type(sf_type),
                DimensionType::Number,
                "{sf_type}"
            );
        }
    }

    #[test]
    fn temporal_types() {
        assert_eq!(SnowflakeClient::map_snowflake_type("DATE"), DimensionType::Date);
        assert_eq!(
            SnowflakeClient::map_snowflake_type("TIMESTAMP_NTZ"),
            DimensionType::Timestamp
        );
        assert_eq!(
            SnowflakeClient::map_snowflake_type("TIMESTAMP_TZ"),
            DimensionType::Timestamp
        );
    }

    #[test]
    fn everything_else_is_a_string() {
        assert_eq!(SnowflakeClient::map_snowflake_type("VARCHAR"), DimensionType::String);
        assert_eq!(SnowflakeClient::map_snowflake_type("VARIANT"), DimensionType::String);
        assert_eq!(SnowflakeClient::map_snowflake_type("GEOGRAPHY"), DimensionType::String);
        assert_eq!(
            SnowflakeClient::map_snowflake_type("BOOLEAN"),
            DimensionType::Boolean
        );
    }
}
