//! Declared dbt metadata and model dependency graphs
//!
//! This crate holds:
//! - The model/column/metric declaration types handed over by the manifest
//!   parser (already resolved - no raw `ref()` strings)
//! - Dependency graph construction and per-model lineage slicing

pub mod lineage;
pub mod model;

pub use lineage::{slice_lineage, DependencyGraph};
pub use model::{
    normalise_database, ColumnMeta, ColumnMetricConfig, DimensionConfig, JoinConfig, Model,
    ModelColumn, ModelMeta, ProjectMetric, ProjectMetricMeta, TimeIntervalsConfig,
};
