//! Declared model metadata
//!
//! These types mirror what the manifest parser delivers: models with their
//! columns, per-column dimension/metric declarations, and project-level
//! metric definitions. They are immutable inputs to the compiler; only the
//! catalog reconciler produces updated copies (with resolved column types).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use vantage_core::{AdapterType, CompileError, DimensionType};

/// A logical table definition from the transformation project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Model {
    /// Unique identifier (e.g. "model.jaffle_shop.orders")
    pub unique_id: String,

    /// Model name (e.g. "orders")
    pub name: String,

    /// Database/project/catalog holding the physical relation
    pub database: String,

    /// Schema/dataset holding the physical relation
    pub schema: String,

    /// Physical relation reference, as the warehouse expects it
    pub relation_name: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub tags: Vec<String>,

    /// Declared columns, unique per model
    #[serde(default)]
    pub columns: BTreeMap<String, ModelColumn>,

    /// Model-level configuration (label override, join declarations)
    #[serde(default)]
    pub meta: ModelMeta,

    /// Resolved upstream dependency identifiers
    #[serde(default)]
    pub depends_on: Vec<String>,
}

/// Model-level configuration block
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelMeta {
    #[serde(default)]
    pub label: Option<String>,

    #[serde(default)]
    pub joins: Vec<JoinConfig>,
}

/// A declared join from this model to another model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinConfig {
    /// Joined model name
    pub join: String,

    /// Raw SQL join condition
    pub sql_on: String,
}

/// One declared column of a model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelColumn {
    pub name: String,

    #[serde(default)]
    pub description: Option<String>,

    /// Canonical type resolved from the warehouse catalog; absent until
    /// reconciliation runs (or when non-strict reconciliation misses)
    #[serde(default)]
    pub data_type: Option<DimensionType>,

    #[serde(default)]
    pub meta: ColumnMeta,
}

impl ModelColumn {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            data_type: None,
            meta: ColumnMeta::default(),
        }
    }

    pub fn with_type(mut self, data_type: DimensionType) -> Self {
        self.data_type = Some(data_type);
        self
    }
}

/// Per-column configuration block
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnMeta {
    #[serde(default)]
    pub dimension: Option<DimensionConfig>,

    /// Named metric declarations attached to this column
    #[serde(default)]
    pub metrics: BTreeMap<String, ColumnMetricConfig>,
}

/// Per-column dimension override
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DimensionConfig {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub label: Option<String>,

    /// Declared canonical type name; kept raw so an unrecognised value can
    /// be rejected with the valid alternatives listed
    #[serde(default, rename = "type")]
    pub dimension_type: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub sql: Option<String>,

    #[serde(default)]
    pub time_intervals: Option<TimeIntervalsConfig>,

    #[serde(default)]
    pub hidden: bool,

    #[serde(default)]
    pub round: Option<u32>,

    #[serde(default)]
    pub format: Option<String>,

    #[serde(default)]
    pub group_label: Option<String>,
}

/// Time-interval expansion policy for a date/timestamp column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TimeIntervalsConfig {
    /// `"OFF"` disables expansion; any other bare string falls back to the
    /// default interval set
    Flag(String),

    /// Explicit interval list
    Intervals(Vec<String>),
}

impl TimeIntervalsConfig {
    pub fn is_off(&self) -> bool {
        matches!(self, Self::Flag(flag) if flag.eq_ignore_ascii_case("off"))
    }
}

/// A metric declared on a column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMetricConfig {
    /// Declared aggregation kind; kept raw so an unrecognised value can be
    /// rejected at translation time
    #[serde(rename = "type")]
    pub metric_type: String,

    #[serde(default)]
    pub label: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub sql: Option<String>,

    #[serde(default)]
    pub hidden: bool,

    #[serde(default)]
    pub round: Option<u32>,

    #[serde(default)]
    pub format: Option<String>,

    #[serde(default)]
    pub group_label: Option<String>,
}

impl ColumnMetricConfig {
    pub fn new(metric_type: impl Into<String>) -> Self {
        Self {
            metric_type: metric_type.into(),
            label: None,
            description: None,
            sql: None,
            hidden: false,
            round: None,
            format: None,
            group_label: None,
        }
    }
}

/// A metric declared at project level, attached to a model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectMetric {
    /// Unique identifier (e.g. "metric.jaffle_shop.total_revenue")
    pub unique_id: String,

    pub name: String,

    /// Name of the model this metric aggregates over (resolved ref); a
    /// metric without one never matches any model
    #[serde(default)]
    pub model: Option<String>,

    /// Declared aggregation kind, raw
    #[serde(rename = "type")]
    pub metric_type: String,

    #[serde(default)]
    pub label: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub sql: Option<String>,

    #[serde(default)]
    pub meta: ProjectMetricMeta,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectMetricMeta {
    #[serde(default)]
    pub hidden: bool,

    #[serde(default)]
    pub round: Option<u32>,

    #[serde(default)]
    pub format: Option<String>,

    #[serde(default)]
    pub group_label: Option<String>,
}

/// Resolve the database a model's physical relation lives in.
///
/// MySQL has no database/schema split, so the schema doubles as the
/// database; Databricks relations always live in the `SPARK` catalog; every
/// other family requires the manifest to carry an explicit database.
pub fn normalise_database(
    adapter: AdapterType,
    unique_id: &str,
    database: Option<&str>,
    schema: &str,
) -> Result<String, CompileError> {
    match adapter {
        AdapterType::Postgres
        | AdapterType::Bigquery
        | AdapterType::Snowflake
        | AdapterType::Redshift => database.map(str::to_owned).ok_or_else(|| {
            CompileError::Parse(format!(
                "Cannot parse model '{unique_id}' because the database field has a null value"
            ))
        }),
        AdapterType::Mysql => Ok(schema.to_owned()),
        AdapterType::Databricks => Ok("SPARK".to_owned()),
    }
}
