//! Canonical field types
//!
//! Declared columns and metrics compile into [`Dimension`] and [`Metric`]
//! values. Both carry the warehouse-agnostic [`DimensionType`] that every
//! warehouse-native type is mapped into.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Warehouse-agnostic canonical type for a compiled field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DimensionType {
    String,
    Number,
    Timestamp,
    Date,
    Boolean,
}

impl DimensionType {
    /// All canonical types, in the order they are listed in error messages
    pub const ALL: [DimensionType; 5] = [
        DimensionType::String,
        DimensionType::Number,
        DimensionType::Timestamp,
        DimensionType::Date,
        DimensionType::Boolean,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Timestamp => "timestamp",
            Self::Date => "date",
            Self::Boolean => "boolean",
        }
    }

    /// Parse a declared type name, case-insensitively
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(value))
    }

    /// Comma-separated list of valid type names, for error messages
    pub fn valid_values() -> String {
        Self::ALL
            .iter()
            .map(|t| t.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl std::fmt::Display for DimensionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Field-kind marker on compiled fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Dimension,
    Metric,
}

/// Canonical aggregation kinds for metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricType {
    Average,
    Count,
    CountDistinct,
    Max,
    Min,
    Sum,
    Median,
}

impl MetricType {
    pub const ALL: [MetricType; 7] = [
        MetricType::Average,
        MetricType::Count,
        MetricType::CountDistinct,
        MetricType::Max,
        MetricType::Min,
        MetricType::Sum,
        MetricType::Median,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Average => "average",
            Self::Count => "count",
            Self::CountDistinct => "count_distinct",
            Self::Max => "max",
            Self::Min => "min",
            Self::Sum => "sum",
            Self::Median => "median",
        }
    }

    /// Parse a declared aggregation kind, case-insensitively
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(value))
    }
}

impl std::fmt::Display for MetricType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A compiled, queryable attribute derived from a declared column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dimension {
    /// Always [`FieldType::Dimension`]
    pub field_type: FieldType,

    pub name: String,

    pub label: String,

    #[serde(rename = "type")]
    pub dimension_type: DimensionType,

    /// Generated SQL expression, `${TABLE}`-qualified
    pub sql: String,

    /// Owning table name
    pub table: String,

    pub table_label: String,

    pub description: Option<String>,

    /// Base column name when this is a time-interval variant
    pub group: Option<String>,

    /// Interval for time-interval variants, upper-cased
    pub time_interval: Option<String>,

    pub hidden: bool,

    pub round: Option<u32>,

    pub format: Option<String>,

    pub group_label: Option<String>,
}

/// A compiled, queryable aggregation derived from a declared metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    /// Always [`FieldType::Metric`]
    pub field_type: FieldType,

    #[serde(rename = "type")]
    pub metric_type: MetricType,

    pub name: String,

    pub label: String,

    /// Aggregation input expression, `${TABLE}`-qualified by default
    pub sql: String,

    pub table: String,

    pub table_label: String,

    pub description: Option<String>,

    /// False for every metric produced by this pipeline; reserved for
    /// metrics synthesised by downstream layers
    pub is_auto_generated: bool,

    pub hidden: bool,

    pub round: Option<u32>,

    pub format: Option<String>,

    pub group_label: Option<String>,
}

/// Default SQL for a column: a direct qualified reference
pub fn default_sql(column_name: &str) -> String {
    format!("${{TABLE}}.{column_name}")
}

/// Human-friendly version of an identifier: words split on underscores,
/// digits and case boundaries, first word capitalised.
///
/// `friendly_name("total_revenue")` is `"Total revenue"`.
pub fn friendly_name(text: &str) -> String {
    static WORDS: OnceLock<Regex> = OnceLock::new();
    let words = WORDS.get_or_init(|| {
        Regex::new("[0-9]*[A-Za-z][a-z]*|[0-9]+").expect("static word pattern")
    });

    let mut parts = words.find_iter(text).map(|m| m.as_str());
    let first = match parts.next() {
        Some(first) => first,
        None => return String::new(),
    };
    let mut out = capitalize(first);
    for part in parts {
        out.push(' ');
        out.push_str(part);
    }
    out
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}
