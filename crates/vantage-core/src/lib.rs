//! Vantage core
//!
//! Canonical domain model shared by the compiler and the warehouse clients:
//! the warehouse-agnostic type system, compiled field/table/explore
//! artifacts, and the error taxonomy.

pub mod adapter;
pub mod catalog;
pub mod error;
pub mod explore;
pub mod field;

pub use adapter::AdapterType;
pub use catalog::{CatalogRequest, WarehouseCatalog, WarehouseSchemas, WarehouseTableSchema, WarehouseTables};
pub use error::{CompileError, ErrorKind};
pub use explore::{
    Explore, ExploreError, ExploreErrorDetail, ExploreJoin, ExploreOrError, LineageGraph,
    LineageNodeDependency, LineageNodeKind, Table,
};
pub use field::{default_sql, friendly_name, Dimension, DimensionType, FieldType, Metric, MetricType};
