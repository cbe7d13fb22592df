//! Vantage compiler
//!
//! Turns declared model/column/metric metadata into compiled explores:
//! - Dimension/metric translation, including time-interval expansion
//! - Warehouse-dialect SQL generation for date truncation
//! - Per-model table compilation and explore assembly with isolated errors
//! - Catalog reconciliation against a live warehouse snapshot
//!
//! Everything here is synchronous and pure: no I/O, no shared state. The
//! catalog snapshot consumed by [`reconcile`] is fetched elsewhere (see the
//! warehouse client crate).

pub mod explore;
pub mod reconcile;
pub mod sql;
pub mod table;
pub mod translator;

pub use explore::{compile_explore, convert_explores};
pub use reconcile::{attach_types, catalog_requests, resolve_type, CatalogIndex};
pub use sql::{date_trunc_sql, DATE_INTERVALS, RAW_INTERVAL};
pub use table::convert_table;
pub use translator::{convert_column_metric, convert_dimension, convert_project_metric};
