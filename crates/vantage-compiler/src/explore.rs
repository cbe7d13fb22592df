//! Batch compilation of models into explores
//!
//! Each model compiles independently: a failure becomes a structured
//! [`ExploreError`] for that model and never aborts the rest of the batch.

use std::collections::BTreeMap;

use tracing::warn;
use vantage_core::{
    friendly_name, AdapterType, CompileError, Explore, ExploreError, ExploreErrorDetail,
    ExploreJoin, ExploreOrError, Table,
};
use vantage_dbt::{slice_lineage, DependencyGraph, Model, ProjectMetric};

use crate::table::convert_table;

/// Assemble one model's explore from the successfully compiled tables.
///
/// Only tables that compiled are joinable; a join naming anything else is
/// a parse condition (the joined model may itself have failed, or may not
/// exist at all).
pub fn compile_explore(
    model: &Model,
    tables: &BTreeMap<String, Table>,
    adapter: AdapterType,
) -> Result<Explore, CompileError> {
    let base = tables.get(&model.name).ok_or_else(|| {
        CompileError::Parse(format!(
            "Cannot compile explore \"{}\": its base table was not compiled",
            model.name
        ))
    })?;

    let mut explore_tables = BTreeMap::new();
    explore_tables.insert(base.name.clone(), base.clone());

    let mut joined_tables = Vec::with_capacity(model.meta.joins.len());
    for join in &model.meta.joins {
        let table = tables.get(&join.join).ok_or_else(|| {
            CompileError::Parse(format!(
                "Failed to join table \"{}\" to \"{}\": table \"{}\" was not compiled",
                join.join, model.name, join.join
            ))
        })?;
        explore_tables.insert(table.name.clone(), table.clone());
        joined_tables.push(ExploreJoin {
            table: join.join.clone(),
            sql_on: join.sql_on.clone(),
        });
    }

    Ok(Explore {
        name: model.name.clone(),
        label: table_label(model),
        tags: model.tags.clone(),
        base_table: model.name.clone(),
        joined_tables,
        tables: explore_tables,
        target_database: adapter,
    })
}

/// Compile a model batch into explores.
///
/// The lineage graph is built once and sliced per model. Output ordering:
/// every successfully compiled explore first (in input model order), then
/// every explore error (in input model order). Nothing is silently
/// dropped.
pub fn convert_explores(
    models: &[Model],
    adapter: AdapterType,
    metrics: &[ProjectMetric],
) -> Vec<ExploreOrError> {
    let graph = DependencyGraph::from_models(models);

    let mut tables: BTreeMap<String, Table> = BTreeMap::new();
    let mut failures: Vec<(usize, ExploreError)> = Vec::new();

    for (index, model) in models.iter().enumerate() {
        let model_metrics: Vec<ProjectMetric> = metrics
            .iter()
            .filter(|metric| metric.model.as_deref() == Some(model.name.as_str()))
            .cloned()
            .collect();

        match convert_table(adapter, model, &model_metrics) {
            Ok(mut table) => {
                table.lineage = slice_lineage(&graph, &model.unique_id);
                tables.insert(model.name.clone(), table);
            }
            Err(error) => {
                warn!(model = %model.name, %error, "failed to compile model into a table");
                failures.push((index, explore_error(model, &error)));
            }
        }
    }

    let mut explores = Vec::with_capacity(models.len());
    for (index, model) in models.iter().enumerate() {
        if !tables.contains_key(&model.name) {
            continue;
        }
        match compile_explore(model, &tables, adapter) {
            Ok(explore) => explores.push(ExploreOrError::Explore(explore)),
            Err(error) => {
                warn!(model = %model.name, %error, "failed to assemble explore joins");
                failures.push((index, explore_error(model, &error)));
            }
        }
    }

    failures.sort_by_key(|(index, _)| *index);
    explores.extend(
        failures
            .into_iter()
            .map(|(_, error)| ExploreOrError::Error(error)),
    );
    explores
}

fn table_label(model: &Model) -> String {
    model
        .meta
        .label
        .clone()
        .unwrap_or_else(|| friendly_name(&model.name))
}

fn explore_error(model: &Model, error: &CompileError) -> ExploreError {
    ExploreError {
        name: model.name.clone(),
        label: table_label(model),
        tags: model.tags.clone(),
        errors: vec![ExploreErrorDetail::from(error)],
    }
}
