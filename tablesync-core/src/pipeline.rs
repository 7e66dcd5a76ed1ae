//! Fill and update passes.
//!
//! Each pass reads one [`AdapterConfig`] snapshot and talks to the data
//! source only through a [`CommandExecutor`]. Passes keep no state between
//! calls; everything they change lives in the dataset or the executor.

use crate::error::{AdapterError, RowApplyFailure};
use crate::ports::{CommandExecutor, ExecutorError};
use tablesync_dataset::{DataSet, DataTable, DatasetError, LoadOutcome, RowState};
use tablesync_policy::AdapterConfig;
use tablesync_types::{
    ChangeKind, FillReport, FillRequest, MissingMappingAction, MissingSchemaAction, RowChange,
    RowValues, SourceTable, TableMapping, TableMappings, UpdateReport, Value,
};
use tracing::{debug, info, warn};

/// A source table resolved against the mappings and the dataset schema.
struct TablePlan {
    table_idx: usize,
    /// (source column index, dataset column name)
    columns: Vec<(usize, String)>,
}

/// Run a fill pass: fetch source tables and merge their rows into `dataset`.
pub fn run_fill<E: CommandExecutor + ?Sized>(
    policy: &AdapterConfig,
    mappings: &TableMappings,
    executor: &mut E,
    dataset: &mut DataSet,
) -> Result<FillReport, AdapterError> {
    let request = FillRequest {
        schema_only: false,
        return_provider_specific_types: policy.return_provider_specific_types(),
    };
    let batch = executor.fetch(&request)?;

    info!(
        tables = batch.tables.len(),
        load_option = %policy.fill_load_option(),
        accept_changes = policy.accept_changes_during_fill(),
        "fill pass started"
    );

    let mut report = FillReport::started();
    for source in &batch.tables {
        let Some(plan) = resolve_table(policy, mappings, dataset, source, &mut report)? else {
            continue;
        };
        merge_rows(policy, dataset, source, &plan, &mut report)?;
    }
    report.finish();

    info!(
        rows_added = report.rows_added,
        rows_merged = report.rows_merged,
        tables_added = report.tables_added,
        columns_added = report.columns_added,
        "fill pass finished"
    );
    Ok(report)
}

/// Run a schema-only fill: add or check tables, columns and keys; merge no rows.
pub fn run_fill_schema<E: CommandExecutor + ?Sized>(
    policy: &AdapterConfig,
    mappings: &TableMappings,
    executor: &mut E,
    dataset: &mut DataSet,
) -> Result<FillReport, AdapterError> {
    let request = FillRequest {
        schema_only: true,
        return_provider_specific_types: policy.return_provider_specific_types(),
    };
    let batch = executor.fetch(&request)?;

    let mut report = FillReport::started();
    for source in &batch.tables {
        resolve_table(policy, mappings, dataset, source, &mut report)?;
    }
    report.finish();

    info!(
        tables_added = report.tables_added,
        columns_added = report.columns_added,
        "fill-schema pass finished"
    );
    Ok(report)
}

fn resolve_table(
    policy: &AdapterConfig,
    mappings: &TableMappings,
    dataset: &mut DataSet,
    source: &SourceTable,
    report: &mut FillReport,
) -> Result<Option<TablePlan>, AdapterError> {
    let mapping = mappings.by_source(&source.name);
    let table_name = match mapping {
        Some(m) => m.dataset_table.clone(),
        None => match policy.missing_mapping_action() {
            MissingMappingAction::Passthrough => source.name.clone(),
            MissingMappingAction::Ignore => {
                debug!(source_table = %source.name, "no table mapping; skipping table");
                report.tables_skipped += 1;
                return Ok(None);
            }
            MissingMappingAction::Error => {
                return Err(AdapterError::MissingMapping {
                    table: source.name.clone(),
                    column: None,
                });
            }
        },
    };

    // Map every source column before the dataset is touched.
    let mut mapped: Vec<(usize, String)> = Vec::with_capacity(source.columns.len());
    for (idx, column) in source.columns.iter().enumerate() {
        match mapping.and_then(|m| m.column_by_source(column)) {
            Some(cm) => mapped.push((idx, cm.dataset_column.clone())),
            None => match policy.missing_mapping_action() {
                MissingMappingAction::Passthrough => mapped.push((idx, column.clone())),
                MissingMappingAction::Ignore => {
                    debug!(source_table = %source.name, column = %column, "no column mapping; skipping column");
                    report.columns_skipped += 1;
                }
                MissingMappingAction::Error => {
                    return Err(AdapterError::MissingMapping {
                        table: source.name.clone(),
                        column: Some(column.clone()),
                    });
                }
            },
        }
    }

    let schema_action = policy.missing_schema_action();
    let table_idx = match dataset.table_index(&table_name) {
        Some(idx) => idx,
        None => match schema_action {
            MissingSchemaAction::AddWithKey => {
                debug!(table = %table_name, "adding missing table");
                dataset.add_table(DataTable::new(table_name.clone()))?;
                report.tables_added += 1;
                dataset.tables().len() - 1
            }
            MissingSchemaAction::Ignore => {
                debug!(table = %table_name, "table missing from dataset; skipping table");
                report.tables_skipped += 1;
                return Ok(None);
            }
            MissingSchemaAction::Error => {
                return Err(AdapterError::MissingSchema {
                    table: table_name,
                    column: None,
                });
            }
        },
    };

    let table = &mut dataset.tables_mut()[table_idx];
    let mut columns = Vec::with_capacity(mapped.len());
    for (idx, column) in mapped {
        if let Some(existing) = table.resolve_column(&column) {
            columns.push((idx, existing.to_string()));
            continue;
        }
        match schema_action {
            MissingSchemaAction::AddWithKey => {
                debug!(table = %table.name(), column = %column, "adding missing column");
                table.add_column(column.clone())?;
                report.columns_added += 1;
                columns.push((idx, column));
            }
            MissingSchemaAction::Ignore => {
                debug!(table = %table.name(), column = %column, "column missing from dataset; skipping column");
                report.columns_skipped += 1;
            }
            MissingSchemaAction::Error => {
                return Err(AdapterError::MissingSchema {
                    table: table.name().to_string(),
                    column: Some(column),
                });
            }
        }
    }

    if schema_action == MissingSchemaAction::AddWithKey
        && table.primary_key().is_empty()
        && !source.key.is_empty()
    {
        let key: Option<Vec<&str>> = source
            .key
            .iter()
            .map(|k| {
                let idx = source.column_index(k)?;
                columns
                    .iter()
                    .find(|(i, _)| *i == idx)
                    .map(|(_, name)| name.as_str())
            })
            .collect();
        match key {
            Some(key) => {
                debug!(table = %table.name(), key = ?key, "adding primary key");
                table.set_primary_key(&key)?;
            }
            None => debug!(table = %table.name(), "source key columns not all mapped; no primary key added"),
        }
    }

    Ok(Some(TablePlan { table_idx, columns }))
}

fn merge_rows(
    policy: &AdapterConfig,
    dataset: &mut DataSet,
    source: &SourceTable,
    plan: &TablePlan,
    report: &mut FillReport,
) -> Result<(), AdapterError> {
    let option = policy.fill_load_option();
    let accept = policy.accept_changes_during_fill();
    let table = &mut dataset.tables_mut()[plan.table_idx];

    for row in &source.rows {
        let values: RowValues = plan
            .columns
            .iter()
            .map(|(idx, name)| (name.clone(), row.get(*idx).cloned().unwrap_or(Value::Null)))
            .collect();

        let outcome = table.load_row(values, option)?;
        match outcome {
            LoadOutcome::Added(_) => report.rows_added += 1,
            LoadOutcome::Merged(_) => report.rows_merged += 1,
        }
        if accept {
            table.accept_row(outcome.index())?;
        }
    }
    Ok(())
}

/// Where a dataset table's changes go in the source.
struct SourceTarget<'a> {
    source_table: String,
    mapping: Option<&'a TableMapping>,
}

/// Run an update pass: apply every pending row change through the executor.
///
/// With `continue_update_on_error` off, the first row failure aborts the pass.
/// With it on, failures are collected and reported together once every row
/// has been attempted. Cancellation always aborts.
pub fn run_update<E: CommandExecutor + ?Sized>(
    policy: &AdapterConfig,
    mappings: &TableMappings,
    executor: &mut E,
    dataset: &mut DataSet,
) -> Result<UpdateReport, AdapterError> {
    executor.begin_update()?;

    let accept = policy.accept_changes_during_update();
    let continue_on_error = policy.continue_update_on_error();
    info!(
        accept_changes = accept,
        continue_on_error, "update pass started"
    );

    let mut report = UpdateReport::started();
    let mut failures: Vec<RowApplyFailure> = Vec::new();
    let mut ordinal = 0usize;

    for table_idx in 0..dataset.tables().len() {
        let table = &mut dataset.tables_mut()[table_idx];
        let pending = table.pending_rows();
        if pending.is_empty() {
            continue;
        }
        let Some(target) = resolve_target(policy, mappings, table)? else {
            continue;
        };

        // Accepted deletes leave the table, shifting later indices down.
        let mut removed = 0usize;
        for pending_idx in pending {
            let row_idx = pending_idx - removed;
            let Some(change) = build_change(policy, &target, table, row_idx, ordinal + 1)? else {
                continue;
            };
            ordinal += 1;
            report.attempted += 1;

            let outcome = match executor.apply(&change) {
                Ok(0) if change.kind != ChangeKind::Insert => {
                    Err("concurrency violation: 0 source rows affected".to_string())
                }
                Ok(affected) => Ok(affected),
                Err(ExecutorError::Rejected { message }) => Err(message),
                Err(ExecutorError::Io(err)) => Err(format!("{:#}", err)),
                Err(err @ (ExecutorError::Cancelled | ExecutorError::NotSupported { .. })) => {
                    warn!(ordinal, table = %table.name(), "update pass stopped: {}", err);
                    return Err(err.into());
                }
            };

            match outcome {
                Ok(affected) => {
                    report.applied += 1;
                    report.rows_affected += affected;
                    debug!(ordinal, table = %table.name(), kind = %change.kind, affected, "row applied");
                    if let Some(row) = table.row_mut(row_idx) {
                        row.clear_row_error();
                    }
                    if accept && table.accept_row(row_idx)? {
                        removed += 1;
                    }
                }
                Err(message) => {
                    let failure = RowApplyFailure {
                        ordinal,
                        table: table.name().to_string(),
                        kind: change.kind,
                        message,
                    };
                    warn!(ordinal, table = %failure.table, "row change failed: {}", failure.message);
                    if let Some(row) = table.row_mut(row_idx) {
                        row.set_row_error(failure.message.clone());
                    }
                    if !continue_on_error {
                        return Err(AdapterError::RowApply(failure));
                    }
                    failures.push(failure);
                }
            }
        }
    }

    executor.finish_update()?;

    if !failures.is_empty() {
        info!(
            applied = report.applied,
            failed = failures.len(),
            "update pass finished with failures"
        );
        return Err(AdapterError::AggregateApply {
            failures,
            applied: report.applied,
        });
    }

    report.finish();
    info!(
        applied = report.applied,
        rows_affected = report.rows_affected,
        "update pass finished"
    );
    Ok(report)
}

fn resolve_target<'a>(
    policy: &AdapterConfig,
    mappings: &'a TableMappings,
    table: &DataTable,
) -> Result<Option<SourceTarget<'a>>, AdapterError> {
    if let Some(mapping) = mappings.by_dataset(table.name()) {
        return Ok(Some(SourceTarget {
            source_table: mapping.source_table.clone(),
            mapping: Some(mapping),
        }));
    }
    match policy.missing_mapping_action() {
        MissingMappingAction::Passthrough => Ok(Some(SourceTarget {
            source_table: table.name().to_string(),
            mapping: None,
        })),
        MissingMappingAction::Ignore => {
            debug!(table = %table.name(), "no table mapping; pending rows left untouched");
            Ok(None)
        }
        MissingMappingAction::Error => Err(AdapterError::MissingMapping {
            table: table.name().to_string(),
            column: None,
        }),
    }
}

fn build_change(
    policy: &AdapterConfig,
    target: &SourceTarget<'_>,
    table: &DataTable,
    row_idx: usize,
    ordinal: usize,
) -> Result<Option<RowChange>, AdapterError> {
    let row = table.row(row_idx).ok_or_else(|| DatasetError::RowIndex {
        table: table.name().to_string(),
        row: row_idx,
    })?;

    let kind = match row.state() {
        RowState::Added => ChangeKind::Insert,
        RowState::Modified => ChangeKind::Update,
        RowState::Deleted => ChangeKind::Delete,
        RowState::Unchanged => return Ok(None),
    };

    let to_source = |values: &RowValues| -> Result<RowValues, AdapterError> {
        let mut out = RowValues::new();
        for (column, value) in values {
            if let Some(name) = source_column(policy, target, table, column)? {
                out.insert(name, value.clone());
            }
        }
        Ok(out)
    };

    let original = row.original().map(&to_source).transpose()?;
    let current = row.current().map(&to_source).transpose()?;

    if let (Some(before), Some(after)) = (row.original(), row.current()) {
        for (column, value) in after {
            if before.get(column) != Some(value)
                && source_column(policy, target, table, column)?.is_none()
            {
                warn!(
                    ordinal,
                    table = %table.name(),
                    column = %column,
                    "edited column has no mapping; the edit stays local"
                );
            }
        }
    }

    let mut key = RowValues::new();
    for column in table.primary_key() {
        if let Some(name) = source_column(policy, target, table, column)? {
            // Locate by the version the source last saw.
            let value = row
                .original_value(column)
                .or_else(|| row.current_value(column))
                .cloned()
                .unwrap_or(Value::Null);
            key.insert(name, value);
        }
    }

    Ok(Some(RowChange {
        ordinal,
        source_table: target.source_table.clone(),
        kind,
        key,
        original,
        current,
    }))
}

fn source_column(
    policy: &AdapterConfig,
    target: &SourceTarget<'_>,
    table: &DataTable,
    column: &str,
) -> Result<Option<String>, AdapterError> {
    if let Some(cm) = target.mapping.and_then(|m| m.column_by_dataset(column)) {
        return Ok(Some(cm.source_column.clone()));
    }
    match policy.missing_mapping_action() {
        MissingMappingAction::Passthrough => Ok(Some(column.to_string())),
        MissingMappingAction::Ignore => Ok(None),
        MissingMappingAction::Error => Err(AdapterError::MissingMapping {
            table: table.name().to_string(),
            column: Some(column.to_string()),
        }),
    }
}
