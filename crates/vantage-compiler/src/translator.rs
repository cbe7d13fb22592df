//! Column and metric translation
//!
//! One declared column becomes one canonical [`Dimension`] (plus one per
//! applicable time interval, driven by the table compiler); one declared
//! metric becomes one canonical [`Metric`]. Override-then-default
//! precedence applies to names, labels, and SQL throughout.

use std::sync::OnceLock;

use regex::Regex;
use vantage_core::{
    default_sql, friendly_name, AdapterType, CompileError, Dimension, DimensionType, FieldType,
    Metric, MetricType,
};
use vantage_dbt::{ColumnMetricConfig, Model, ModelColumn, ProjectMetric};

use crate::sql;

/// Translate one column (optionally bucketed by `time_interval`) into a
/// dimension.
///
/// The effective type is the per-column override if declared, else the
/// type resolved from the warehouse catalog, else `string`. An override
/// naming an unrecognised type is a missing-catalog-entry condition. A
/// non-`RAW` interval rewrites the SQL through the dialect truncation
/// idiom, suffixes name and label with the lowercase interval, and groups
/// the variant under the base column; calendar buckets always yield a
/// `date`-typed dimension, whatever the base type was.
pub fn convert_dimension(
    adapter: AdapterType,
    model: &Model,
    table_label: &str,
    column: &ModelColumn,
    time_interval: Option<&str>,
) -> Result<Dimension, CompileError> {
    let config = column.meta.dimension.as_ref();

    let mut dimension_type = match config.and_then(|c| c.dimension_type.as_deref()) {
        Some(declared) => DimensionType::parse(declared).ok_or_else(|| {
            CompileError::MissingCatalogEntry(format!(
                "Could not recognise type \"{declared}\" for dimension \"{}\" in model \"{}\". \
                 Valid types are: {}",
                column.name,
                model.name,
                DimensionType::valid_values()
            ))
        })?,
        None => column.data_type.unwrap_or(DimensionType::String),
    };

    let mut name = config
        .and_then(|c| c.name.clone())
        .unwrap_or_else(|| column.name.clone());
    let mut sql = config
        .and_then(|c| c.sql.clone())
        .unwrap_or_else(|| default_sql(&column.name));
    let mut label = config
        .and_then(|c| c.label.clone())
        .unwrap_or_else(|| friendly_name(&name));
    let mut group = None;

    if let Some(interval) = time_interval {
        if !sql::is_raw_interval(interval) {
            sql = sql::date_trunc_sql(adapter, interval, &sql, dimension_type);
        }
        let interval_lower = interval.to_lowercase();
        name = format!("{}_{interval_lower}", column.name);
        label = format!("{label} {interval_lower}");
        group = Some(column.name.clone());
        if sql::is_date_interval(interval) {
            dimension_type = DimensionType::Date;
        }
    }

    Ok(Dimension {
        field_type: FieldType::Dimension,
        name,
        label,
        dimension_type,
        sql,
        table: model.name.clone(),
        table_label: table_label.to_string(),
        description: config
            .and_then(|c| c.description.clone())
            .or_else(|| column.description.clone()),
        group,
        time_interval: time_interval.map(str::to_uppercase),
        hidden: config.map(|c| c.hidden).unwrap_or(false),
        round: config.and_then(|c| c.round),
        format: config.and_then(|c| c.format.clone()),
        group_label: config.and_then(|c| c.group_label.clone()),
    })
}

/// Translate a metric declared on a column.
pub fn convert_column_metric(
    model_name: &str,
    column_name: &str,
    metric_name: &str,
    metric: &ColumnMetricConfig,
    table_label: &str,
) -> Result<Metric, CompileError> {
    let metric_type = MetricType::parse(&metric.metric_type).ok_or_else(|| {
        CompileError::Parse(format!(
            "Cannot parse metric \"{metric_name}\" on column \"{column_name}\" in model \
             \"{model_name}\": type \"{}\" is not a valid metric type",
            metric.metric_type
        ))
    })?;

    let sql = resolve_metric_sql(metric.sql.as_deref(), column_name);
    let default_text = format!(
        "{} of {}",
        friendly_name(metric_type.as_str()),
        friendly_name(column_name)
    );

    Ok(Metric {
        field_type: FieldType::Metric,
        metric_type,
        name: metric_name.to_string(),
        label: metric.label.clone().unwrap_or_else(|| default_text.clone()),
        sql,
        table: model_name.to_string(),
        table_label: table_label.to_string(),
        description: metric.description.clone().or(Some(default_text)),
        is_auto_generated: false,
        hidden: metric.hidden,
        round: metric.round,
        format: metric.format.clone(),
        group_label: metric.group_label.clone(),
    })
}

/// Translate a project-level metric attached to a model.
pub fn convert_project_metric(
    metric: &ProjectMetric,
    table_label: &str,
) -> Result<Metric, CompileError> {
    let metric_type = MetricType::parse(&metric.metric_type).ok_or_else(|| {
        CompileError::Parse(format!(
            "Cannot parse metric \"{}\": type \"{}\" is not a valid metric type",
            metric.unique_id, metric.metric_type
        ))
    })?;

    let model = metric.model.clone().ok_or_else(|| {
        CompileError::Parse(format!(
            "Cannot determine the model for metric \"{}\": the metric must reference exactly \
             one model",
            metric.name
        ))
    })?;

    let sql = resolve_metric_sql(metric.sql.as_deref(), &metric.name);
    let default_text = format!(
        "{} of {}",
        friendly_name(metric_type.as_str()),
        friendly_name(&metric.name)
    );

    Ok(Metric {
        field_type: FieldType::Metric,
        metric_type,
        name: metric.name.clone(),
        label: metric.label.clone().unwrap_or_else(|| default_text.clone()),
        sql,
        table: model,
        table_label: table_label.to_string(),
        description: metric.description.clone().or(Some(default_text)),
        is_auto_generated: false,
        hidden: metric.meta.hidden,
        round: metric.meta.round,
        format: metric.meta.format.clone(),
        group_label: metric.meta.group_label.clone(),
    })
}

/// A bare single-identifier override is a column reference and gets the
/// default qualification; any other override is used verbatim; no override
/// falls back to the owning column.
fn resolve_metric_sql(declared: Option<&str>, column_name: &str) -> String {
    match declared {
        Some(sql) if is_single_identifier(sql) => default_sql(sql),
        Some(sql) => sql.to_string(),
        None => default_sql(column_name),
    }
}

fn is_single_identifier(sql: &str) -> bool {
    static IDENTIFIER: OnceLock<Regex> = OnceLock::new();
    IDENTIFIER
        .get_or_init(|| Regex::new("^[a-zA-Z0-9_]+$").expect("static identifier pattern"))
        .is_match(sql)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use vantage_dbt::{ColumnMeta, DimensionConfig, ModelMeta, ProjectMetricMeta};

    fn orders_model() -> Model {
        Model {
            unique_id: "model.proj.orders".into(),
            name: "orders".into(),
            database: "db".into(),
            schema: "public".into(),
            relation_name: "\"db\".\"public\".\"orders\"".into(),
            description: None,
            tags: vec![],
            columns: BTreeMap::new(),
            meta: ModelMeta::default(),
            depends_on: vec![],
        }
    }

    #[test]
    fn plain_column_gets_defaults() {
        let model = orders_model();
        let column = ModelColumn::new("status").with_type(DimensionType::String);

        let dimension = convert_dimension(AdapterType::Postgres, &model, "Orders", &column, None)
            .unwrap();
        assert_eq!(dimension.name, "status");
        assert_eq!(dimension.label, "Status");
        assert_eq!(dimension.sql, "${TABLE}.status");
        assert_eq!(dimension.dimension_type, DimensionType::String);
        assert_eq!(dimension.table, "orders");
        assert_eq!(dimension.table_label, "Orders");
        assert!(dimension.group.is_none());
        assert!(dimension.time_interval.is_none());
    }

    #[test]
    fn untyped_column_defaults_to_string() {
        let model = orders_model();
        let column = ModelColumn::new("note");
        let dimension = convert_dimension(AdapterType::Postgres, &model, "Orders", &column, None)
            .unwrap();
        assert_eq!(dimension.dimension_type, DimensionType::String);
    }

    #[test]
    fn overrides_win_over_defaults() {
        let model = orders_model();
        let mut column = ModelColumn::new("status");
        column.meta = ColumnMeta {
            dimension: Some(DimensionConfig {
                name: Some("order_status".into()),
                label: Some("Order status".into()),
                dimension_type: Some("string".into()),
                sql: Some("UPPER(${TABLE}.status)".into()),
                hidden: true,
                ..DimensionConfig::default()
            }),
            metrics: BTreeMap::new(),
        };

        let dimension = convert_dimension(AdapterType::Postgres, &model, "Orders", &column, None)
            .unwrap();
        assert_eq!(dimension.name, "order_status");
        assert_eq!(dimension.label, "Order status");
        assert_eq!(dimension.sql, "UPPER(${TABLE}.status)");
        assert!(dimension.hidden);
    }

    #[test]
    fn unknown_declared_type_is_rejected() {
        let model = orders_model();
        let mut column = ModelColumn::new("status");
        column.meta.dimension = Some(DimensionConfig {
            dimension_type: Some("varchar".into()),
            ..DimensionConfig::default()
        });

        let err = convert_dimension(AdapterType::Postgres, &model, "Orders", &column, None)
            .unwrap_err();
        match err {
            CompileError::MissingCatalogEntry(message) => {
                assert!(message.contains("varchar"));
                assert!(message.contains("status"));
                assert!(message.contains("orders"));
                assert!(message.contains("timestamp"));
            }
            other => panic!("expected MissingCatalogEntry, got {other:?}"),
        }
    }

    #[test]
    fn calendar_interval_forces_date_type() {
        let model = orders_model();
        let column = ModelColumn::new("created_at").with_type(DimensionType::Timestamp);

        let dimension =
            convert_dimension(AdapterType::Postgres, &model, "Orders", &column, Some("MONTH"))
                .unwrap();
        assert_eq!(dimension.name, "created_at_month");
        assert_eq!(dimension.label, "Created at month");
        assert_eq!(dimension.dimension_type, DimensionType::Date);
        assert_eq!(dimension.sql, "DATE_TRUNC('MONTH', ${TABLE}.created_at)");
        assert_eq!(dimension.group.as_deref(), Some("created_at"));
        assert_eq!(dimension.time_interval.as_deref(), Some("MONTH"));
    }

    #[test]
    fn raw_interval_keeps_sql_and_type() {
        let model = orders_model();
        let column = ModelColumn::new("created_at").with_type(DimensionType::Timestamp);

        let dimension =
            convert_dimension(AdapterType::Postgres, &model, "Orders", &column, Some("RAW"))
                .unwrap();
        assert_eq!(dimension.name, "created_at_raw");
        assert_eq!(dimension.sql, "${TABLE}.created_at");
        assert_eq!(dimension.dimension_type, DimensionType::Timestamp);
        assert_eq!(dimension.group.as_deref(), Some("created_at"));
    }

    #[test]
    fn column_metric_defaults() {
        let metric = ColumnMetricConfig::new("sum");
        let compiled =
            convert_column_metric("orders", "amount", "total_revenue", &metric, "Orders").unwrap();
        assert_eq!(compiled.metric_type, MetricType::Sum);
        assert_eq!(compiled.sql, "${TABLE}.amount");
        assert_eq!(compiled.label, "Sum of Amount");
        assert_eq!(compiled.description.as_deref(), Some("Sum of Amount"));
        assert!(!compiled.is_auto_generated);
    }

    #[test]
    fn metric_sql_override_rules() {
        // bare identifier: treated as a column reference
        let mut metric = ColumnMetricConfig::new("sum");
        metric.sql = Some("net_amount".into());
        let compiled =
            convert_column_metric("orders", "amount", "net_revenue", &metric, "Orders").unwrap();
        assert_eq!(compiled.sql, "${TABLE}.net_amount");

        // anything else: verbatim
        metric.sql = Some("${TABLE}.amount - ${TABLE}.tax".into());
        let compiled =
            convert_column_metric("orders", "amount", "net_revenue", &metric, "Orders").unwrap();
        assert_eq!(compiled.sql, "${TABLE}.amount - ${TABLE}.tax");
    }

    #[test]
    fn unknown_metric_kind_is_a_parse_error() {
        let metric = ColumnMetricConfig::new("variance");
        let err = convert_column_metric("orders", "amount", "spread", &metric, "Orders")
            .unwrap_err();
        assert!(matches!(err, CompileError::Parse(_)));
        assert!(err.to_string().contains("variance"));
    }

    #[test]
    fn project_metric_requires_a_model_ref() {
        let metric = ProjectMetric {
            unique_id: "metric.proj.revenue".into(),
            name: "revenue".into(),
            model: None,
            metric_type: "sum".into(),
            label: None,
            description: None,
            sql: None,
            meta: ProjectMetricMeta::default(),
        };
        let err = convert_project_metric(&metric, "Orders").unwrap_err();
        assert!(matches!(err, CompileError::Parse(_)));
    }

    #[test]
    fn project_metric_resolves_against_its_model() {
        let metric = ProjectMetric {
            unique_id: "metric.proj.revenue".into(),
            name: "revenue".into(),
            model: Some("orders".into()),
            metric_type: "sum".into(),
            label: Some("Revenue".into()),
            description: None,
            sql: Some("amount".into()),
            meta: ProjectMetricMeta::default(),
        };
        let compiled = convert_project_metric(&metric, "Orders").unwrap();
        assert_eq!(compiled.table, "orders");
        assert_eq!(compiled.label, "Revenue");
        assert_eq!(compiled.sql, "${TABLE}.amount");
    }
}
