//! Compiled explore artifacts
//!
//! A [`Table`] is one model's compiled output; an [`Explore`] is a base
//! table plus its joined tables, the unit handed to a query layer. A model
//! that fails compilation terminates as an [`ExploreError`] instead and
//! participates in no joins.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::adapter::AdapterType;
use crate::error::{CompileError, ErrorKind};
use crate::field::{Dimension, Metric};

/// Node kind in a lineage graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineageNodeKind {
    Model,
    Seed,
    Source,
}

/// One direct dependency of a lineage node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineageNodeDependency {
    pub kind: LineageNodeKind,
    pub name: String,
}

/// Display-oriented lineage: node display name -> direct dependencies only,
/// restricted to one model's ancestor/descendant family
pub type LineageGraph = BTreeMap<String, Vec<LineageNodeDependency>>;

/// One model's compiled output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,

    pub label: String,

    pub database: String,

    pub schema: String,

    /// Physical relation reference, as the warehouse expects it
    pub sql_table: String,

    pub description: String,

    /// dimension name -> compiled dimension
    pub dimensions: BTreeMap<String, Dimension>,

    /// metric name -> compiled metric
    pub metrics: BTreeMap<String, Metric>,

    pub lineage: LineageGraph,
}

impl Table {
    /// Find a dimension by name
    pub fn get_dimension(&self, name: &str) -> Option<&Dimension> {
        self.dimensions.get(name)
    }

    /// Find a metric by name
    pub fn get_metric(&self, name: &str) -> Option<&Metric> {
        self.metrics.get(name)
    }
}

/// A declared join from a base table to another table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExploreJoin {
    /// Joined table name
    pub table: String,

    /// Raw SQL join condition
    pub sql_on: String,
}

/// A compiled base table plus its joined tables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Explore {
    pub name: String,

    pub label: String,

    pub tags: Vec<String>,

    pub base_table: String,

    pub joined_tables: Vec<ExploreJoin>,

    /// Base + joined tables only, keyed by table name
    pub tables: BTreeMap<String, Table>,

    pub target_database: AdapterType,
}

/// Structured error record attached to a failed model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExploreErrorDetail {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&CompileError> for ExploreErrorDetail {
    fn from(error: &CompileError) -> Self {
        Self {
            kind: error.kind(),
            message: error.message().to_string(),
        }
    }
}

/// Terminal state of a model that failed compilation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExploreError {
    pub name: String,

    pub label: String,

    pub tags: Vec<String>,

    pub errors: Vec<ExploreErrorDetail>,
}

/// Batch compilation output for one model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExploreOrError {
    Explore(Explore),
    Error(ExploreError),
}

impl ExploreOrError {
    pub fn name(&self) -> &str {
        match self {
            Self::Explore(explore) => &explore.name,
            Self::Error(error) => &error.name,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    pub fn as_explore(&self) -> Option<&Explore> {
        match self {
            Self::Explore(explore) => Some(explore),
            Self::Error(_) => None,
        }
    }

    pub fn as_error(&self) -> Option<&ExploreError> {
        match self {
            Self::Explore(_) => None,
            Self::Error(error) => Some(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_detail_from_compile_error() {
        let err = CompileError::MissingCatalogEntry("orders not found".into());
        let detail = ExploreErrorDetail::from(&err);
        assert_eq!(detail.kind, ErrorKind::MissingCatalogEntry);
        assert_eq!(detail.message, "orders not found");
    }

    #[test]
    fn explore_error_serialization() {
        let outcome = ExploreOrError::Error(ExploreError {
            name: "orders".into(),
            label: "Orders".into(),
            tags: vec!["finance".into()],
            errors: vec![ExploreErrorDetail {
                kind: ErrorKind::Parse,
                message: "bad metric".into(),
            }],
        });
        let json = serde_json::to_string(&outcome).unwrap();
        assert!(json.contains("\"PARSE\""));
        assert!(json.contains("bad metric"));
    }

    #[test]
    fn outcome_accessors() {
        let outcome = ExploreOrError::Error(ExploreError {
            name: "orders".into(),
            label: "Orders".into(),
            tags: vec![],
            errors: vec![],
        });
        assert!(outcome.is_error());
        assert_eq!(outcome.name(), "orders");
        assert!(outcome.as_explore().is_none());
    }
}
