//! Per-model table compilation

use std::collections::BTreeMap;

use vantage_core::{friendly_name, AdapterType, CompileError, DimensionType, LineageGraph, Table};
use vantage_dbt::{Model, ProjectMetric, TimeIntervalsConfig};

use crate::sql::{DATE_INTERVALS, RAW_INTERVAL};
use crate::translator::{convert_column_metric, convert_dimension, convert_project_metric};

/// Compile one model into a [`Table`]: a dimension per column (with
/// time-interval expansion where applicable), column metrics merged with
/// the model-scoped metrics, and a name-collision check across the two
/// field sets. Pure given its inputs; the lineage slice is attached by the
/// batch compiler.
pub fn convert_table(
    adapter: AdapterType,
    model: &Model,
    project_metrics: &[ProjectMetric],
) -> Result<Table, CompileError> {
    let table_label = model
        .meta
        .label
        .clone()
        .unwrap_or_else(|| friendly_name(&model.name));

    let mut dimensions = BTreeMap::new();
    let mut metrics = BTreeMap::new();

    for column in model.columns.values() {
        let dimension = convert_dimension(adapter, model, &table_label, column, None)?;

        let time_intervals = column
            .meta
            .dimension
            .as_ref()
            .and_then(|config| config.time_intervals.as_ref());
        if time_interval_expansion_enabled(dimension.dimension_type, time_intervals) {
            for interval in applicable_intervals(dimension.dimension_type, time_intervals) {
                let variant =
                    convert_dimension(adapter, model, &table_label, column, Some(&interval))?;
                dimensions.insert(variant.name.clone(), variant);
            }
        }

        dimensions.insert(column.name.clone(), dimension);

        for (name, metric) in &column.meta.metrics {
            let compiled =
                convert_column_metric(&model.name, &column.name, name, metric, &table_label)?;
            metrics.insert(name.clone(), compiled);
        }
    }

    // Model-scoped metric names win over column-scoped ones.
    for metric in project_metrics {
        let compiled = convert_project_metric(metric, &table_label)?;
        metrics.insert(metric.name.clone(), compiled);
    }

    let duplicates: Vec<&str> = metrics
        .keys()
        .filter(|name| dimensions.contains_key(*name))
        .map(String::as_str)
        .collect();
    if !duplicates.is_empty() {
        let message = if duplicates.len() > 1 {
            "Found multiple metrics and dimensions with the same name"
        } else {
            "Found a metric and a dimension with the same name"
        };
        return Err(CompileError::Parse(format!(
            "{message}: {}",
            duplicates.join(", ")
        )));
    }

    Ok(Table {
        name: model.name.clone(),
        label: table_label,
        database: model.database.clone(),
        schema: model.schema.clone(),
        sql_table: model.relation_name.clone(),
        description: model
            .description
            .clone()
            .unwrap_or_else(|| format!("{} table", model.name)),
        dimensions,
        metrics,
        lineage: LineageGraph::new(),
    })
}

fn time_interval_expansion_enabled(
    dimension_type: DimensionType,
    config: Option<&TimeIntervalsConfig>,
) -> bool {
    let bucketable = matches!(dimension_type, DimensionType::Date | DimensionType::Timestamp);
    let disabled = config.map(TimeIntervalsConfig::is_off).unwrap_or(false);
    bucketable && !disabled
}

/// Explicit interval list when declared; otherwise the calendar set, led by
/// `RAW` for timestamp columns.
fn applicable_intervals(
    dimension_type: DimensionType,
    config: Option<&TimeIntervalsConfig>,
) -> Vec<String> {
    if let Some(TimeIntervalsConfig::Intervals(declared)) = config {
        return declared.clone();
    }
    let mut intervals = Vec::new();
    if dimension_type == DimensionType::Timestamp {
        intervals.push(RAW_INTERVAL.to_string());
    }
    intervals.extend(DATE_INTERVALS.iter().map(|interval| interval.to_string()));
    intervals
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use vantage_dbt::{ColumnMetricConfig, DimensionConfig, ModelColumn, ModelMeta, ProjectMetricMeta};

    fn model_with_columns(columns: Vec<ModelColumn>) -> Model {
        Model {
            unique_id: "model.proj.orders".into(),
            name: "orders".into(),
            database: "db".into(),
            schema: "public".into(),
            relation_name: "\"db\".\"public\".\"orders\"".into(),
            description: Some("All orders".into()),
            tags: vec![],
            columns: columns
                .into_iter()
                .map(|column| (column.name.clone(), column))
                .collect(),
            meta: ModelMeta::default(),
            depends_on: vec![],
        }
    }

    fn project_metric(name: &str, kind: &str) -> ProjectMetric {
        ProjectMetric {
            unique_id: format!("metric.proj.{name}"),
            name: name.into(),
            model: Some("orders".into()),
            metric_type: kind.into(),
            label: None,
            description: None,
            sql: None,
            meta: ProjectMetricMeta::default(),
        }
    }

    #[test]
    fn no_bucketable_columns_means_one_dimension_per_column() {
        let model = model_with_columns(vec![
            ModelColumn::new("id").with_type(DimensionType::Number),
            ModelColumn::new("status").with_type(DimensionType::String),
        ]);
        let table = convert_table(AdapterType::Postgres, &model, &[]).unwrap();
        assert_eq!(table.dimensions.len(), 2);
        assert!(table.metrics.is_empty());
    }

    #[test]
    fn timestamp_column_expands_with_raw_variant() {
        let model = model_with_columns(vec![
            ModelColumn::new("created_at").with_type(DimensionType::Timestamp)
        ]);
        let table = convert_table(AdapterType::Postgres, &model, &[]).unwrap();

        let names: Vec<&str> = table.dimensions.keys().map(String::as_str).collect();
        assert_eq!(
            names,
            vec![
                "created_at",
                "created_at_day",
                "created_at_month",
                "created_at_raw",
                "created_at_week",
                "created_at_year",
            ]
        );
        assert_eq!(
            table.dimensions["created_at_day"].dimension_type,
            DimensionType::Date
        );
        assert_eq!(
            table.dimensions["created_at_raw"].dimension_type,
            DimensionType::Timestamp
        );
    }

    #[test]
    fn date_column_expands_without_raw_variant() {
        let model = model_with_columns(vec![
            ModelColumn::new("shipped_on").with_type(DimensionType::Date)
        ]);
        let table = convert_table(AdapterType::Postgres, &model, &[]).unwrap();

        assert_eq!(table.dimensions.len(), 5);
        assert!(!table.dimensions.contains_key("shipped_on_raw"));
        assert!(table.dimensions.contains_key("shipped_on_week"));
    }

    #[test]
    fn off_flag_disables_expansion() {
        let mut column = ModelColumn::new("created_at").with_type(DimensionType::Timestamp);
        column.meta.dimension = Some(DimensionConfig {
            time_intervals: Some(TimeIntervalsConfig::Flag("OFF".into())),
            ..DimensionConfig::default()
        });
        let model = model_with_columns(vec![column]);
        let table = convert_table(AdapterType::Postgres, &model, &[]).unwrap();
        assert_eq!(table.dimensions.len(), 1);
    }

    #[test]
    fn explicit_interval_list_is_respected() {
        let mut column = ModelColumn::new("created_at").with_type(DimensionType::Timestamp);
        column.meta.dimension = Some(DimensionConfig {
            time_intervals: Some(TimeIntervalsConfig::Intervals(vec!["DAY".into()])),
            ..DimensionConfig::default()
        });
        let model = model_with_columns(vec![column]);
        let table = convert_table(AdapterType::Postgres, &model, &[]).unwrap();

        let names: Vec<&str> = table.dimensions.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["created_at", "created_at_day"]);
    }

    #[test]
    fn model_scoped_metrics_win_on_collision() {
        let mut column = ModelColumn::new("amount").with_type(DimensionType::Number);
        let mut config = ColumnMetricConfig::new("min");
        config.label = Some("Column-scoped".into());
        column.meta.metrics.insert("total_revenue".into(), config);
        let model = model_with_columns(vec![column]);

        let table = convert_table(
            AdapterType::Postgres,
            &model,
            &[project_metric("total_revenue", "sum")],
        )
        .unwrap();

        let metric = &table.metrics["total_revenue"];
        assert_eq!(metric.metric_type, vantage_core::MetricType::Sum);
        assert_eq!(metric.label, "Sum of Total revenue");
    }

    #[test]
    fn dimension_metric_name_collision_is_rejected() {
        let mut amount = ModelColumn::new("amount").with_type(DimensionType::Number);
        amount
            .meta
            .metrics
            .insert("amount".into(), ColumnMetricConfig::new("sum"));
        let model = model_with_columns(vec![amount]);

        let err = convert_table(AdapterType::Postgres, &model, &[]).unwrap_err();
        match err {
            CompileError::Parse(message) => {
                assert!(message.contains("same name"));
                assert!(message.ends_with("amount"));
            }
            other => panic!("expected Parse, got {other:?}"),
        }
    }

    #[test]
    fn recompilation_is_structurally_identical() {
        let model = model_with_columns(vec![
            ModelColumn::new("created_at").with_type(DimensionType::Timestamp),
            ModelColumn::new("amount").with_type(DimensionType::Number),
        ]);
        let metrics = [project_metric("total_revenue", "sum")];

        let first = convert_table(AdapterType::Bigquery, &model, &metrics).unwrap();
        let second = convert_table(AdapterType::Bigquery, &model, &metrics).unwrap();
        assert_eq!(first, second);
    }
}
