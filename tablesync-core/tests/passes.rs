//! End-to-end fill and update passes through `DataAdapter`.

use pretty_assertions::assert_eq;
use serde_json::json;
use std::error::Error as _;
use tablesync_core::adapters::InMemoryExecutor;
use tablesync_core::{
    AdapterError, CommandExecutor, DataAdapter, DataSet, DataTable, LoadOption,
    MissingMappingAction, MissingSchemaAction, RowState, TableMapping,
};
use tablesync_types::{ChangeKind, FillBatch, RowChange, RowValues, SourceTable};

fn values(pairs: &[(&str, serde_json::Value)]) -> RowValues {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

fn customers_source() -> FillBatch {
    FillBatch::new(vec![
        SourceTable::new("customers", &["id", "name"])
            .with_key(&["id"])
            .with_row(vec![json!(1), json!("Ada")])
            .with_row(vec![json!(2), json!("Grace")])
            .with_row(vec![json!(3), json!("Edsger")]),
    ])
}

fn filled(exec: InMemoryExecutor) -> (DataAdapter<InMemoryExecutor>, DataSet) {
    let mut adapter = DataAdapter::with_executor(exec);
    let mut dataset = DataSet::new();
    adapter.fill(&mut dataset).expect("initial fill");
    (adapter, dataset)
}

// ---------------------------------------------------------------------------
// Base adapter
// ---------------------------------------------------------------------------

#[test]
fn base_adapter_rejects_fill_and_update() {
    let mut adapter = DataAdapter::new();
    let mut dataset = DataSet::new();

    let fill = adapter.fill(&mut dataset).unwrap_err();
    assert!(matches!(fill, AdapterError::NotSupported { .. }));
    assert!(fill.source().is_none());
    assert!(!fill.to_string().is_empty());

    let update = adapter.update(&mut dataset).unwrap_err();
    assert!(matches!(update, AdapterError::NotSupported { .. }));
    assert!(update.source().is_none());
    assert!(dataset.tables().is_empty());
}

// ---------------------------------------------------------------------------
// Fill
// ---------------------------------------------------------------------------

#[test]
fn fill_adds_table_columns_and_key() {
    let (_, dataset) = filled(InMemoryExecutor::new(customers_source()));
    let table = dataset.table("customers").expect("table added");
    assert_eq!(table.primary_key(), ["id".to_string()]);
    assert_eq!(table.len(), 3);
    assert!(!dataset.has_changes());
}

#[test]
fn fill_without_accept_leaves_rows_pending_only_under_upsert() {
    let mut adapter = DataAdapter::with_executor(InMemoryExecutor::new(customers_source()));
    adapter.policy_mut().set_accept_changes_during_fill(false);
    adapter.policy_mut().set_fill_load_option(LoadOption::Upsert);
    let mut dataset = DataSet::new();

    let report = adapter.fill(&mut dataset).unwrap();
    assert_eq!(report.rows_added, 3);
    let table = dataset.table("customers").unwrap();
    assert!(table.rows().iter().all(|r| r.state() == RowState::Added));
}

#[test]
fn upsert_without_accept_keeps_both_versions_pending() {
    let (mut adapter, mut dataset) = filled(InMemoryExecutor::new(customers_source()));

    // Local edit, then the source changes the same row.
    let table = dataset.table_mut("customers").unwrap();
    table.set_value(0, "name", json!("Ada (local)")).unwrap();
    adapter
        .executor_mut()
        .apply(&RowChange {
            ordinal: 1,
            source_table: "customers".to_string(),
            kind: ChangeKind::Update,
            key: values(&[("id", json!(1))]),
            original: None,
            current: Some(values(&[("name", json!("Ada Lovelace"))])),
        })
        .unwrap();

    adapter.policy_mut().set_fill_load_option(LoadOption::Upsert);
    adapter.policy_mut().set_accept_changes_during_fill(false);
    let report = adapter.fill(&mut dataset).unwrap();
    assert_eq!(report.rows_merged, 3);

    let row = &dataset.table("customers").unwrap().rows()[0];
    assert_eq!(row.state(), RowState::Modified);
    assert_eq!(row.original_value("name"), Some(&json!("Ada")));
    assert_eq!(row.current_value("name"), Some(&json!("Ada Lovelace")));
}

#[test]
fn preserve_changes_keeps_local_edit() {
    let (mut adapter, mut dataset) = filled(InMemoryExecutor::new(customers_source()));
    dataset
        .table_mut("customers")
        .unwrap()
        .set_value(1, "name", json!("Grace (local)"))
        .unwrap();

    adapter.policy_mut().set_fill_load_option(LoadOption::PreserveChanges);
    adapter.policy_mut().set_accept_changes_during_fill(false);
    adapter.fill(&mut dataset).unwrap();

    let row = &dataset.table("customers").unwrap().rows()[1];
    assert_eq!(row.state(), RowState::Modified);
    assert_eq!(row.current_value("name"), Some(&json!("Grace (local)")));
    assert_eq!(row.original_value("name"), Some(&json!("Grace")));
}

#[test]
fn overwrite_changes_discards_local_edit() {
    let (mut adapter, mut dataset) = filled(InMemoryExecutor::new(customers_source()));
    dataset
        .table_mut("customers")
        .unwrap()
        .set_value(1, "name", json!("Grace (local)"))
        .unwrap();

    adapter.policy_mut().set_accept_changes_during_fill(false);
    adapter.fill(&mut dataset).unwrap();

    let row = &dataset.table("customers").unwrap().rows()[1];
    assert_eq!(row.state(), RowState::Unchanged);
    assert_eq!(row.current_value("name"), Some(&json!("Grace")));
}

#[test]
fn missing_schema_error_names_table() {
    let mut adapter = DataAdapter::with_executor(InMemoryExecutor::new(customers_source()));
    adapter
        .policy_mut()
        .set_missing_schema_action(MissingSchemaAction::Error);
    let mut dataset = DataSet::new();

    let err = adapter.fill(&mut dataset).unwrap_err();
    assert!(matches!(
        &err,
        AdapterError::MissingSchema { table, column: None } if table == "customers"
    ));
    assert_eq!(err.exit_code(), 2);
}

#[test]
fn missing_schema_error_names_column() {
    let mut adapter = DataAdapter::with_executor(InMemoryExecutor::new(customers_source()));
    adapter
        .policy_mut()
        .set_missing_schema_action(MissingSchemaAction::Error);
    let mut dataset = DataSet::new();
    dataset
        .add_table(DataTable::new("customers").with_columns(&["id"]))
        .unwrap();

    let err = adapter.fill(&mut dataset).unwrap_err();
    assert!(err.to_string().contains("'name'"));
    assert!(err.to_string().contains("'customers'"));
    assert!(dataset.table("customers").unwrap().is_empty());
}

#[test]
fn missing_schema_ignore_skips_unknown_column_and_table() {
    let mut source = customers_source();
    source
        .tables
        .push(SourceTable::new("orders", &["id"]).with_row(vec![json!(10)]));
    let mut adapter = DataAdapter::with_executor(InMemoryExecutor::new(source));
    adapter
        .policy_mut()
        .set_missing_schema_action(MissingSchemaAction::Ignore);
    let mut dataset = DataSet::new();
    dataset
        .add_table(DataTable::new("customers").with_columns(&["id"]))
        .unwrap();

    let report = adapter.fill(&mut dataset).unwrap();
    assert_eq!(report.tables_skipped, 1);
    assert_eq!(report.columns_skipped, 1);
    assert!(dataset.table("orders").is_none());
    let table = dataset.table("customers").unwrap();
    assert_eq!(table.columns().len(), 1);
    assert_eq!(table.len(), 3);
    assert!(table.primary_key().is_empty());
}

#[test]
fn table_mapping_renames_table_and_columns() {
    let mut adapter = DataAdapter::with_executor(InMemoryExecutor::new(customers_source()));
    adapter
        .table_mappings_mut()
        .add(
            TableMapping::new("customers", "Clients")
                .with_column("id", "ClientId")
                .with_column("name", "FullName"),
        )
        .unwrap();
    let mut dataset = DataSet::new();
    adapter.fill(&mut dataset).unwrap();

    let table = dataset.table("Clients").expect("mapped table");
    assert_eq!(table.primary_key(), ["ClientId".to_string()]);
    assert_eq!(table.rows()[0].current_value("FullName"), Some(&json!("Ada")));
}

#[test]
fn missing_mapping_error_and_ignore() {
    let mut adapter = DataAdapter::with_executor(InMemoryExecutor::new(customers_source()));
    adapter
        .policy_mut()
        .set_missing_mapping_action(MissingMappingAction::Error);
    let mut dataset = DataSet::new();
    let err = adapter.fill(&mut dataset).unwrap_err();
    assert!(matches!(err, AdapterError::MissingMapping { column: None, .. }));
    assert!(dataset.tables().is_empty());

    // A table mapping that leaves one column unmapped.
    adapter
        .table_mappings_mut()
        .add(TableMapping::new("customers", "customers").with_column("id", "id"))
        .unwrap();
    let err = adapter.fill(&mut dataset).unwrap_err();
    assert!(matches!(
        &err,
        AdapterError::MissingMapping { column: Some(c), .. } if c == "name"
    ));

    adapter
        .policy_mut()
        .set_missing_mapping_action(MissingMappingAction::Ignore);
    let report = adapter.fill(&mut dataset).unwrap();
    assert_eq!(report.columns_skipped, 1);
    assert_eq!(dataset.table("customers").unwrap().columns().len(), 1);
}

#[test]
fn fill_passes_provider_specific_types_through() {
    let mut adapter = DataAdapter::with_executor(InMemoryExecutor::new(customers_source()));
    adapter.policy_mut().set_return_provider_specific_types(true);
    let mut dataset = DataSet::new();
    adapter.fill(&mut dataset).unwrap();
    adapter.fill_schema(&mut dataset).unwrap();

    let requests = adapter.executor().requests();
    assert_eq!(requests.len(), 2);
    assert!(requests.iter().all(|r| r.return_provider_specific_types));
    assert!(!requests[0].schema_only);
    assert!(requests[1].schema_only);
}

#[test]
fn fill_schema_adds_schema_without_rows() {
    let mut adapter = DataAdapter::with_executor(InMemoryExecutor::new(customers_source()));
    let mut dataset = DataSet::new();
    let report = adapter.fill_schema(&mut dataset).unwrap();

    assert_eq!(report.tables_added, 1);
    assert_eq!(report.columns_added, 2);
    assert_eq!(report.rows_loaded(), 0);
    let table = dataset.table("customers").unwrap();
    assert!(table.is_empty());
    assert_eq!(table.primary_key(), ["id".to_string()]);
}

#[test]
fn cancelled_fetch_leaves_dataset_untouched() {
    let mut adapter =
        DataAdapter::with_executor(InMemoryExecutor::new(customers_source()).cancel_fetch());
    let mut dataset = DataSet::new();

    let err = adapter.fill(&mut dataset).unwrap_err();
    assert!(matches!(err, AdapterError::Cancelled));
    assert_eq!(err.exit_code(), 1);
    assert!(dataset.tables().is_empty());
    assert_eq!(adapter.executor().requests().len(), 1);
}

// ---------------------------------------------------------------------------
// Update
// ---------------------------------------------------------------------------

fn three_pending_edits(dataset: &mut DataSet) {
    let table = dataset.table_mut("customers").unwrap();
    for (idx, name) in ["A", "B", "C"].iter().enumerate() {
        table.set_value(idx, "name", json!(name)).unwrap();
    }
}

#[test]
fn continue_on_error_applies_rows_around_failure() {
    let (mut adapter, mut dataset) =
        filled(InMemoryExecutor::new(customers_source()).fail_at(2, "constraint violated"));
    three_pending_edits(&mut dataset);
    adapter.policy_mut().set_continue_update_on_error(true);

    let err = adapter.update(&mut dataset).unwrap_err();
    let AdapterError::AggregateApply { failures, applied } = &err else {
        panic!("expected aggregate failure, got {err:?}");
    };
    assert_eq!(*applied, 2);
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].ordinal, 2);
    assert!(err.to_string().contains("row 2"));

    let table = dataset.table("customers").unwrap();
    assert_eq!(table.rows()[0].state(), RowState::Unchanged);
    assert_eq!(table.rows()[1].state(), RowState::Modified);
    assert_eq!(table.rows()[1].row_error(), Some("constraint violated"));
    assert_eq!(table.rows()[2].state(), RowState::Unchanged);
    assert_eq!(adapter.executor().applied().len(), 2);
}

#[test]
fn first_failure_aborts_without_continue() {
    let (mut adapter, mut dataset) =
        filled(InMemoryExecutor::new(customers_source()).fail_at(2, "constraint violated"));
    three_pending_edits(&mut dataset);

    let err = adapter.update(&mut dataset).unwrap_err();
    assert!(matches!(&err, AdapterError::RowApply(f) if f.ordinal == 2));
    assert_eq!(err.exit_code(), 2);

    let table = dataset.table("customers").unwrap();
    assert_eq!(table.rows()[0].state(), RowState::Unchanged);
    assert_eq!(table.rows()[1].state(), RowState::Modified);
    assert_eq!(table.rows()[2].state(), RowState::Modified);
    assert!(table.rows()[2].row_error().is_none());
}

#[test]
fn zero_rows_affected_is_concurrency_failure() {
    let (mut adapter, mut dataset) = filled(InMemoryExecutor::new(customers_source()));
    // The source loses row 1 behind the dataset's back.
    adapter
        .executor_mut()
        .apply(&RowChange {
            ordinal: 0,
            source_table: "customers".to_string(),
            kind: ChangeKind::Delete,
            key: values(&[("id", json!(1))]),
            original: None,
            current: None,
        })
        .unwrap();
    dataset
        .table_mut("customers")
        .unwrap()
        .set_value(0, "name", json!("Ada?"))
        .unwrap();

    let err = adapter.update(&mut dataset).unwrap_err();
    assert!(err.to_string().contains("concurrency"));
}

#[test]
fn cancellation_aborts_even_with_continue() {
    let (mut adapter, mut dataset) =
        filled(InMemoryExecutor::new(customers_source()).cancel_at(2));
    three_pending_edits(&mut dataset);
    adapter.policy_mut().set_continue_update_on_error(true);

    let err = adapter.update(&mut dataset).unwrap_err();
    assert!(matches!(err, AdapterError::Cancelled));
    assert_eq!(err.exit_code(), 1);
    assert_eq!(adapter.executor().applied().len(), 1);
}

#[test]
fn accepted_delete_leaves_table_and_later_rows_still_apply() {
    let (mut adapter, mut dataset) = filled(InMemoryExecutor::new(customers_source()));
    let table = dataset.table_mut("customers").unwrap();
    table.delete_row(0).unwrap();
    table.set_value(2, "name", json!("E. W. Dijkstra")).unwrap();
    table.add_row(values(&[("id", json!(4)), ("name", json!("Barbara"))])).unwrap();

    let report = adapter.update(&mut dataset).unwrap();
    assert_eq!(report.attempted, 3);
    assert_eq!(report.applied, 3);
    assert_eq!(report.rows_affected, 3);

    let table = dataset.table("customers").unwrap();
    assert_eq!(table.len(), 3);
    assert!(!table.has_changes());

    let kinds: Vec<ChangeKind> = adapter.executor().applied().iter().map(|c| c.kind).collect();
    assert_eq!(kinds, vec![ChangeKind::Delete, ChangeKind::Update, ChangeKind::Insert]);
    let ordinals: Vec<usize> = adapter.executor().applied().iter().map(|c| c.ordinal).collect();
    assert_eq!(ordinals, vec![1, 2, 3]);

    let source = &adapter.executor().batch().tables[0];
    assert_eq!(source.rows.len(), 3);
}

#[test]
fn update_without_accept_leaves_rows_pending() {
    let (mut adapter, mut dataset) = filled(InMemoryExecutor::new(customers_source()));
    three_pending_edits(&mut dataset);
    adapter.policy_mut().set_accept_changes_during_update(false);

    let report = adapter.update(&mut dataset).unwrap();
    assert_eq!(report.applied, 3);
    assert!(dataset.has_changes());
}

#[test]
fn update_translates_names_back_to_source() {
    let mut adapter = DataAdapter::with_executor(InMemoryExecutor::new(customers_source()));
    adapter
        .table_mappings_mut()
        .add(
            TableMapping::new("customers", "Clients")
                .with_column("id", "ClientId")
                .with_column("name", "FullName"),
        )
        .unwrap();
    let mut dataset = DataSet::new();
    adapter.fill(&mut dataset).unwrap();
    dataset
        .table_mut("Clients")
        .unwrap()
        .set_value(0, "FullName", json!("Augusta Ada King"))
        .unwrap();

    adapter.update(&mut dataset).unwrap();
    let change = &adapter.executor().applied()[0];
    assert_eq!(change.source_table, "customers");
    assert_eq!(change.key, values(&[("id", json!(1))]));
    assert_eq!(
        change.current.as_ref().and_then(|c| c.get("name")),
        Some(&json!("Augusta Ada King"))
    );
}

#[test]
fn policy_changes_apply_to_next_pass() {
    let (mut adapter, mut dataset) =
        filled(InMemoryExecutor::new(customers_source()).fail_at(1, "nope"));
    three_pending_edits(&mut dataset);

    assert!(matches!(
        adapter.update(&mut dataset),
        Err(AdapterError::RowApply(_))
    ));
    adapter.policy_mut().set_continue_update_on_error(true);
    assert!(matches!(
        adapter.update(&mut dataset),
        Err(AdapterError::AggregateApply { .. })
    ));
}

#[test]
fn update_missing_table_mapping_error_names_table() {
    let (mut adapter, mut dataset) = filled(InMemoryExecutor::new(customers_source()));
    three_pending_edits(&mut dataset);
    adapter
        .policy_mut()
        .set_missing_mapping_action(MissingMappingAction::Error);

    let err = adapter.update(&mut dataset).unwrap_err();
    assert!(matches!(
        &err,
        AdapterError::MissingMapping { table, column: None } if table == "customers"
    ));
    assert_eq!(err.to_string(), "missing mapping for table 'customers'");
    assert!(adapter.executor().applied().is_empty());
    assert!(dataset.has_changes());
}

#[test]
fn update_missing_column_mapping_error_names_column() {
    let (mut adapter, mut dataset) = filled(InMemoryExecutor::new(customers_source()));
    three_pending_edits(&mut dataset);
    adapter
        .table_mappings_mut()
        .add(TableMapping::new("customers", "customers").with_column("id", "id"))
        .unwrap();
    adapter
        .policy_mut()
        .set_missing_mapping_action(MissingMappingAction::Error);

    let err = adapter.update(&mut dataset).unwrap_err();
    assert!(matches!(
        &err,
        AdapterError::MissingMapping { table, column: Some(c) }
            if table == "customers" && c == "name"
    ));
    assert_eq!(
        err.to_string(),
        "missing mapping for column 'name' of table 'customers'"
    );
    assert!(adapter.executor().applied().is_empty());
}

#[test]
fn update_ignore_drops_unmapped_columns() {
    let (mut adapter, mut dataset) = filled(InMemoryExecutor::new(customers_source()));
    dataset
        .table_mut("customers")
        .unwrap()
        .set_value(0, "name", json!("Ada (local)"))
        .unwrap();
    adapter
        .table_mappings_mut()
        .add(TableMapping::new("customers", "customers").with_column("id", "id"))
        .unwrap();
    adapter
        .policy_mut()
        .set_missing_mapping_action(MissingMappingAction::Ignore);

    let report = adapter.update(&mut dataset).unwrap();
    assert_eq!(report.applied, 1);

    let change = &adapter.executor().applied()[0];
    assert_eq!(change.kind, ChangeKind::Update);
    assert_eq!(change.current, Some(values(&[("id", json!(1))])));

    // The source keeps its value; the local edit is accepted as is.
    let source = &adapter.executor().batch().tables[0];
    assert_eq!(source.rows[0][1], json!("Ada"));
    let row = &dataset.table("customers").unwrap().rows()[0];
    assert_eq!(row.state(), RowState::Unchanged);
    assert_eq!(row.current_value("name"), Some(&json!("Ada (local)")));
}
