//! dbt profile target conversion
//!
//! Turns one target block of a dbt `profiles.yml` (already parsed into
//! JSON by the caller) into warehouse credentials. dbt profiles are loose
//! about field names, so the conversions below carry the historical
//! fallbacks: `pass`/`password`, `dbname`/`database`.

use serde::Deserialize;
use serde_json::Value;
use vantage_core::CompileError;

use crate::credentials::{
    BigqueryCredentials, PostgresCredentials, SnowflakeCredentials, WarehouseCredentials,
};

/// Convert a profile target into credentials, dispatching on its `type`
/// field.
pub fn credentials_from_target(target: &Value) -> Result<WarehouseCredentials, CompileError> {
    let target_type = target
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| CompileError::Parse("Target is missing the required \"type\" field".into()))?;

    match target_type {
        "postgres" => postgres_credentials(target).map(WarehouseCredentials::Postgres),
        "redshift" => postgres_credentials(target).map(WarehouseCredentials::Redshift),
        "snowflake" => snowflake_credentials(target).map(WarehouseCredentials::Snowflake),
        "bigquery" => bigquery_credentials(target).map(WarehouseCredentials::Bigquery),
        other => Err(CompileError::Parse(format!(
            "Target type \"{other}\" is not a supported warehouse"
        ))),
    }
}

#[derive(Debug, Deserialize)]
struct PostgresTarget {
    host: Option<String>,
    port: u16,
    #[serde(alias = "username")]
    user: String,
    password: Option<String>,
    pass: Option<String>,
    dbname: Option<String>,
    database: Option<String>,
    schema: Option<String>,
    #[serde(default)]
    sslmode: Option<String>,
    #[serde(default)]
    keepalives_idle: Option<u64>,
}

fn postgres_credentials(target: &Value) -> Result<PostgresCredentials, CompileError> {
    let target: PostgresTarget = parse_target(target, "postgres")?;
    let password = target.pass.or(target.password).ok_or_else(|| {
        CompileError::Parse("Postgres target requires a password: \"password\"".into())
    })?;
    let host = target
        .host
        .ok_or_else(|| CompileError::Parse("Postgres target requires a host: \"host\"".into()))?;
    let dbname = target.dbname.or(target.database).ok_or_else(|| {
        CompileError::Parse(
            "Postgres target requires a database name: \"dbname\" or \"database\"".into(),
        )
    })?;
    Ok(PostgresCredentials {
        host,
        port: target.port,
        user: target.user,
        password,
        dbname,
        schema: target.schema,
        sslmode: target.sslmode,
        keepalives_idle: target.keepalives_idle,
    })
}

#[derive(Debug, Deserialize)]
struct SnowflakeTarget {
    account: String,
    user: String,
    password: Option<String>,
    pass: Option<String>,
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    warehouse: Option<String>,
    #[serde(default)]
    database: Option<String>,
    #[serde(default)]
    schema: Option<String>,
}

fn snowflake_credentials(target: &Value) -> Result<SnowflakeCredentials, CompileError> {
    let target: SnowflakeTarget = parse_target(target, "snowflake")?;
    let password = target.pass.or(target.password).ok_or_else(|| {
        CompileError::Parse("Snowflake target requires a password: \"password\"".into())
    })?;
    Ok(SnowflakeCredentials {
        account: target.account,
        user: target.user,
        password,
        role: target.role,
        warehouse: target.warehouse,
        database: target.database,
        schema: target.schema,
    })
}

#[derive(Debug, Deserialize)]
struct BigqueryTarget {
    project: String,
    dataset: String,
    #[serde(default)]
    keyfile_json: Option<Value>,
}

fn bigquery_credentials(target: &Value) -> Result<BigqueryCredentials, CompileError> {
    let target: BigqueryTarget = parse_target(target, "bigquery")?;
    Ok(BigqueryCredentials {
        project: target.project,
        dataset: target.dataset,
        keyfile_json: target.keyfile_json,
    })
}

fn parse_target<T: serde::de::DeserializeOwned>(
    target: &Value,
    family: &str,
) -> Result<T, CompileError> {
    serde_json::from_value(target.clone()).map_err(|error| {
        CompileError::Parse(format!(
            "Couldn't read profiles.yml target for {family}: {error}"
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn postgres_target_with_fallback_fields() {
        let target = json!({
            "type": "postgres",
            "host": "db.internal",
            "port": 5432,
            "user": "vantage",
            "pass": "secret",
            "database": "analytics",
            "schema": "public"
        });
        let credentials = credentials_from_target(&target).unwrap();
        match credentials {
            WarehouseCredentials::Postgres(postgres) => {
                assert_eq!(postgres.dbname, "analytics");
                assert_eq!(postgres.password, "secret");
                assert_eq!(postgres.schema.as_deref(), Some("public"));
            }
            other => panic!("expected postgres credentials, got {other:?}"),
        }
    }

    #[test]
    fn postgres_target_requires_password() {
        let target = json!({
            "type": "postgres",
            "host": "db.internal",
            "port": 5432,
            "user": "vantage",
            "dbname": "analytics"
        });
        let err = credentials_from_target(&target).unwrap_err();
        assert!(matches!(err, CompileError::Parse(_)));
        assert!(err.to_string().contains("password"));
    }

    #[test]
    fn redshift_target_reuses_postgres_shape() {
        let target = json!({
            "type": "redshift",
            "host": "cluster.redshift.amazonaws.com",
            "port": 5439,
            "user": "vantage",
            "password": "secret",
            "dbname": "analytics"
        });
        assert!(matches!(
            credentials_from_target(&target).unwrap(),
            WarehouseCredentials::Redshift(_)
        ));
    }

    #[test]
    fn snowflake_target() {
        let target = json!({
            "type": "snowflake",
            "account": "xy12345.us-east-1",
            "user": "vantage",
            "password": "secret",
            "warehouse": "COMPUTE_WH",
            "database": "ANALYTICS"
        });
        match credentials_from_target(&target).unwrap() {
            WarehouseCredentials::Snowflake(snowflake) => {
                assert_eq!(snowflake.warehouse.as_deref(), Some("COMPUTE_WH"));
                assert!(snowflake.role.is_none());
            }
            other => panic!("expected snowflake credentials, got {other:?}"),
        }
    }

    #[test]
    fn unknown_target_type_is_rejected() {
        let target = json!({ "type": "duckdb" });
        let err = credentials_from_target(&target).unwrap_err();
        assert!(err.to_string().contains("duckdb"));
    }
}
