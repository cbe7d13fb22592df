//! Supported warehouse families
//!
//! The family tag drives dialect SQL generation and client construction.
//! It is a closed sum type on purpose: every family must handle every
//! per-family operation, and the compiler enforces it.

use serde::{Deserialize, Serialize};

/// Target warehouse family, as reported by the transformation project
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdapterType {
    Bigquery,
    Databricks,
    Snowflake,
    Redshift,
    Postgres,
    Mysql,
}

impl AdapterType {
    pub const ALL: [AdapterType; 6] = [
        AdapterType::Bigquery,
        AdapterType::Databricks,
        AdapterType::Snowflake,
        AdapterType::Redshift,
        AdapterType::Postgres,
        AdapterType::Mysql,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bigquery => "bigquery",
            Self::Databricks => "databricks",
            Self::Snowflake => "snowflake",
            Self::Redshift => "redshift",
            Self::Postgres => "postgres",
            Self::Mysql => "mysql",
        }
    }

    /// Parse an adapter tag, case-insensitively
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(value))
    }
}

impl std::fmt::Display for AdapterType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adapter_round_trip() {
        for adapter in AdapterType::ALL {
            assert_eq!(AdapterType::parse(adapter.as_str()), Some(adapter));
        }
        assert_eq!(AdapterType::parse("BigQuery"), Some(AdapterType::Bigquery));
        assert_eq!(AdapterType::parse("duckdb"), None);
    }
}
