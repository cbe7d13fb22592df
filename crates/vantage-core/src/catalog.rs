//! Warehouse catalog snapshot types
//!
//! A catalog is the live warehouse metadata observed at reconciliation
//! time: database -> schema -> table -> column -> canonical type. Nested
//! `BTreeMap`s keep iteration order deterministic, which the reconciler
//! relies on for case-insensitive tie-breaking.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::field::DimensionType;

/// column name -> canonical type
pub type WarehouseTableSchema = BTreeMap<String, DimensionType>;

/// table name -> table schema
pub type WarehouseTables = BTreeMap<String, WarehouseTableSchema>;

/// schema name -> tables
pub type WarehouseSchemas = BTreeMap<String, WarehouseTables>;

/// database name -> schemas
pub type WarehouseCatalog = BTreeMap<String, WarehouseSchemas>;

/// Identifies one table whose columns should appear in a catalog snapshot
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CatalogRequest {
    /// Database/project name
    pub database: String,

    /// Schema/dataset name
    pub schema: String,

    /// Table name
    pub table: String,
}

impl CatalogRequest {
    pub fn new(
        database: impl Into<String>,
        schema: impl Into<String>,
        table: impl Into<String>,
    ) -> Self {
        Self {
            database: database.into(),
            schema: schema.into(),
            table: table.into(),
        }
    }

    /// Fully qualified name
    pub fn fqn(&self) -> String {
        format!("{}.{}.{}", self.database, self.schema, self.table)
    }
}

impl std::fmt::Display for CatalogRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.fqn())
    }
}

/// Insert one column entry, creating the intermediate levels as needed
pub fn insert_catalog_entry(
    catalog: &mut WarehouseCatalog,
    request: &CatalogRequest,
    column: impl Into<String>,
    dimension_type: DimensionType,
) {
    catalog
        .entry(request.database.clone())
        .or_default()
        .entry(request.schema.clone())
        .or_default()
        .entry(request.table.clone())
        .or_default()
        .insert(column.into(), dimension_type);
}
