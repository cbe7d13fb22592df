//! Catalog reconciliation
//!
//! Cross-checks declared model/column identities against a live warehouse
//! catalog snapshot and copies the resolved canonical types back onto the
//! columns. Strict mode is all-or-nothing: a missing model or column aborts
//! the whole call, because partially-typed models are unsafe to compile
//! further.

use std::collections::BTreeMap;

use tracing::debug;
use vantage_core::{CatalogRequest, CompileError, DimensionType, WarehouseCatalog};
use vantage_dbt::Model;

/// Case-normalized lookup index over a catalog snapshot, built once per
/// reconciliation pass.
///
/// In case-insensitive mode all keys are folded to lowercase. When two
/// catalog keys fold to the same value, the lexicographically first
/// original key wins (the catalog is a `BTreeMap`, so folding walks keys in
/// sorted order and keeps the first insertion).
pub struct CatalogIndex {
    entries: BTreeMap<String, BTreeMap<String, BTreeMap<String, BTreeMap<String, DimensionType>>>>,
    case_sensitive: bool,
}

impl CatalogIndex {
    pub fn new(catalog: &WarehouseCatalog, case_sensitive: bool) -> Self {
        let mut entries: BTreeMap<
            String,
            BTreeMap<String, BTreeMap<String, BTreeMap<String, DimensionType>>>,
        > = BTreeMap::new();
        for (database, schemas) in catalog {
            let database_entry = entries.entry(fold_key(database, case_sensitive)).or_default();
            for (schema, tables) in schemas {
                let schema_entry = database_entry
                    .entry(fold_key(schema, case_sensitive))
                    .or_default();
                for (table, columns) in tables {
                    let table_entry = schema_entry
                        .entry(fold_key(table, case_sensitive))
                        .or_default();
                    for (column, dimension_type) in columns {
                        table_entry
                            .entry(fold_key(column, case_sensitive))
                            .or_insert(*dimension_type);
                    }
                }
            }
        }
        Self {
            entries,
            case_sensitive,
        }
    }

    /// Whether the catalog has an entry for this table
    pub fn contains_table(&self, database: &str, schema: &str, table: &str) -> bool {
        self.table(database, schema, table).is_some()
    }

    /// Resolved canonical type of one column, if present
    pub fn column_type(
        &self,
        database: &str,
        schema: &str,
        table: &str,
        column: &str,
    ) -> Option<DimensionType> {
        self.table(database, schema, table)?
            .get(&self.fold(column))
            .copied()
    }

    fn table(
        &self,
        database: &str,
        schema: &str,
        table: &str,
    ) -> Option<&BTreeMap<String, DimensionType>> {
        self.entries
            .get(&self.fold(database))?
            .get(&self.fold(schema))?
            .get(&self.fold(table))
    }

    fn fold(&self, key: &str) -> String {
        fold_key(key, self.case_sensitive)
    }
}

fn fold_key(key: &str, case_sensitive: bool) -> String {
    if case_sensitive {
        key.to_string()
    } else {
        key.to_lowercase()
    }
}

/// The (database, schema, table) triples a catalog snapshot must cover to
/// reconcile these models.
pub fn catalog_requests(models: &[Model]) -> Vec<CatalogRequest> {
    models
        .iter()
        .map(|model| CatalogRequest::new(&model.database, &model.schema, &model.name))
        .collect()
}

/// Validate models against a catalog snapshot and return a new model list
/// with each column's resolved type populated.
///
/// Neither the input models nor the catalog are mutated. In strict mode
/// the first missing model fails the call before any column-level check
/// runs, and the first missing column fails it after; in non-strict mode
/// unresolved columns are left untyped for the translator to default or
/// reject later.
pub fn attach_types(
    models: &[Model],
    catalog: &WarehouseCatalog,
    strict: bool,
    case_sensitive: bool,
) -> Result<Vec<Model>, CompileError> {
    let index = CatalogIndex::new(catalog, case_sensitive);

    for model in models {
        if index.contains_table(&model.database, &model.schema, &model.name) {
            continue;
        }
        if strict {
            return Err(missing_model(model));
        }
        debug!(
            model = %model.name,
            database = %model.database,
            schema = %model.schema,
            "model not found in warehouse catalog"
        );
    }

    let mut reconciled = Vec::with_capacity(models.len());
    for model in models {
        let mut updated = model.clone();
        for (column_name, column) in &mut updated.columns {
            let resolved =
                index.column_type(&model.database, &model.schema, &model.name, column_name);
            if resolved.is_none() {
                if strict {
                    return Err(missing_column(model, column_name));
                }
                debug!(
                    model = %model.name,
                    column = %column_name,
                    "column not found in warehouse catalog"
                );
            }
            column.data_type = resolved;
        }
        reconciled.push(updated);
    }
    Ok(reconciled)
}

/// Resolve one column's canonical type against a catalog snapshot.
///
/// Strict mode fails with a missing-catalog-entry condition when the
/// column (or its table) is absent; non-strict mode returns `None`.
/// Callers reconciling whole batches should prefer [`attach_types`], which
/// builds the case-normalized index once.
pub fn resolve_type(
    model: &Model,
    column_name: &str,
    catalog: &WarehouseCatalog,
    strict: bool,
    case_sensitive: bool,
) -> Result<Option<DimensionType>, CompileError> {
    let index = CatalogIndex::new(catalog, case_sensitive);
    match index.column_type(&model.database, &model.schema, &model.name, column_name) {
        Some(dimension_type) => Ok(Some(dimension_type)),
        None if strict => Err(missing_column(model, column_name)),
        None => Ok(None),
    }
}

fn missing_model(model: &Model) -> CompileError {
    CompileError::MissingCatalogEntry(format!(
        "Model \"{}\" was expected in your target warehouse at \"{}.{}.{}\". Does the table \
         exist in your target data warehouse?",
        model.name, model.database, model.schema, model.name
    ))
}

fn missing_column(model: &Model, column_name: &str) -> CompileError {
    CompileError::MissingCatalogEntry(format!(
        "Column \"{column_name}\" from model \"{}\" was not found in your target warehouse at \
         {}.{}.{}. Try rerunning dbt to update your warehouse.",
        model.name, model.database, model.schema, model.name
    ))
}
