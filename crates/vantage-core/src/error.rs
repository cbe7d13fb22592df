//! Error taxonomy
//!
//! Every failure in the compilation pipeline maps onto one of four
//! conditions. The kind tags are stable strings carried into
//! [`ExploreErrorDetail`](crate::explore::ExploreErrorDetail) records -
//! do not rename them, only add new ones.

use serde::{Deserialize, Serialize};

/// Stable kind tag for a [`CompileError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Malformed or unrecognised declared configuration
    Parse,

    /// Declared model/column absent from the live warehouse
    MissingCatalogEntry,

    /// Warehouse client could not be constructed
    WarehouseConnection,

    /// A query against the warehouse failed
    WarehouseQuery,
}

impl ErrorKind {
    /// Get the kind as a stable string identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Parse => "PARSE",
            Self::MissingCatalogEntry => "MISSING_CATALOG_ENTRY",
            Self::WarehouseConnection => "WAREHOUSE_CONNECTION",
            Self::WarehouseQuery => "WAREHOUSE_QUERY",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Errors raised while translating declared metadata into compiled explores
/// or while talking to a warehouse
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompileError {
    #[error("{0}")]
    Parse(String),

    #[error("{0}")]
    MissingCatalogEntry(String),

    #[error("{0}")]
    WarehouseConnection(String),

    #[error("{0}")]
    WarehouseQuery(String),
}

impl CompileError {
    /// The stable kind tag for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Parse(_) => ErrorKind::Parse,
            Self::MissingCatalogEntry(_) => ErrorKind::MissingCatalogEntry,
            Self::WarehouseConnection(_) => ErrorKind::WarehouseConnection,
            Self::WarehouseQuery(_) => ErrorKind::WarehouseQuery,
        }
    }

    /// The human-readable message without the kind tag
    pub fn message(&self) -> &str {
        match self {
            Self::Parse(m)
            | Self::MissingCatalogEntry(m)
            | Self::WarehouseConnection(m)
            | Self::WarehouseQuery(m) => m,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_tag_stability() {
        assert_eq!(ErrorKind::Parse.as_str(), "PARSE");
        assert_eq!(ErrorKind::MissingCatalogEntry.as_str(), "MISSING_CATALOG_ENTRY");
        assert_eq!(
            CompileError::WarehouseQuery("boom".into()).kind(),
            ErrorKind::WarehouseQuery
        );
    }

    #[test]
    fn message_passthrough() {
        let err = CompileError::Parse("unknown metric type \"variance\"".into());
        assert_eq!(err.to_string(), "unknown metric type \"variance\"");
        assert_eq!(err.message(), err.to_string());
    }
}
