//! Warehouse connection credentials
//!
//! Delivered by the (out-of-scope) credential store; consumed only by
//! [`client_from_credentials`](crate::client::client_from_credentials).

use serde::{Deserialize, Serialize};

/// Connection parameters for every supported warehouse family
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WarehouseCredentials {
    Postgres(PostgresCredentials),

    /// Redshift speaks the postgres wire protocol and shares its parameters
    Redshift(PostgresCredentials),

    Snowflake(SnowflakeCredentials),

    Bigquery(BigqueryCredentials),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostgresCredentials {
    pub host: String,

    pub port: u16,

    pub user: String,

    pub password: String,

    pub dbname: String,

    #[serde(default)]
    pub schema: Option<String>,

    /// dbt-style ssl mode; `require` and the `verify-*` modes force TLS
    #[serde(default)]
    pub sslmode: Option<String>,

    /// TCP keep-alive idle time, seconds
    #[serde(default)]
    pub keepalives_idle: Option<u64>,
}

impl PostgresCredentials {
    pub fn requires_tls(&self) -> bool {
        matches!(
            self.sslmode.as_deref(),
            Some("require") | Some("verify-ca") | Some("verify-full")
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnowflakeCredentials {
    /// Account identifier (e.g. "xy12345.us-east-1")
    pub account: String,

    pub user: String,

    pub password: String,

    #[serde(default)]
    pub role: Option<String>,

    #[serde(default)]
    pub warehouse: Option<String>,

    #[serde(default)]
    pub database: Option<String>,

    #[serde(default)]
    pub schema: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BigqueryCredentials {
    /// GCP project id
    pub project: String,

    /// Default dataset
    pub dataset: String,

    /// Inline service account key; absent means application default
    /// credentials
    #[serde(default)]
    pub keyfile_json: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tls_modes() {
        let mut credentials = PostgresCredentials {
            host: "localhost".into(),
            port: 5432,
            user: "vantage".into(),
            password: "secret".into(),
            dbname: "analytics".into(),
            schema: None,
            sslmode: None,
            keepalives_idle: None,
        };
        assert!(!credentials.requires_tls());

        credentials.sslmode = Some("prefer".into());
        assert!(!credentials.requires_tls());

        credentials.sslmode = Some("require".into());
        assert!(credentials.requires_tls());
    }

    #[test]
    fn tagged_serialization() {
        let credentials = WarehouseCredentials::Bigquery(BigqueryCredentials {
            project: "my-project".into(),
            dataset: "analytics".into(),
            keyfile_json: None,
        });
        let json = serde_json::to_string(&credentials).unwrap();
        assert!(json.contains("\"type\":\"bigquery\""));

        let parsed: WarehouseCredentials = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, credentials);
    }
}
