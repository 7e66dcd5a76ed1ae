use crate::error::{DatasetError, DatasetResult};
use crate::row::{DataRow, RowState};
use serde::{Deserialize, Serialize};
use tablesync_types::{LoadOption, RowValues, Value};
use tracing::trace;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataColumn {
    pub name: String,
}

impl DataColumn {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Where a loaded row ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Added(usize),
    Merged(usize),
}

impl LoadOutcome {
    pub fn index(self) -> usize {
        match self {
            LoadOutcome::Added(idx) | LoadOutcome::Merged(idx) => idx,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataTable {
    name: String,

    #[serde(default)]
    columns: Vec<DataColumn>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    primary_key: Vec<String>,

    #[serde(default)]
    rows: Vec<DataRow>,
}

impl DataTable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            primary_key: Vec::new(),
            rows: Vec::new(),
        }
    }

    /// Builder used mostly by tests and embedders seeding a schema.
    pub fn with_columns(mut self, columns: &[&str]) -> Self {
        for c in columns {
            if self.resolve_column(c).is_none() {
                self.columns.push(DataColumn::new(*c));
            }
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[DataColumn] {
        &self.columns
    }

    /// Canonical column name for `name`: exact match, then ASCII case-insensitive.
    pub fn resolve_column(&self, name: &str) -> Option<&str> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .or_else(|| self.columns.iter().find(|c| c.name.eq_ignore_ascii_case(name)))
            .map(|c| c.name.as_str())
    }

    pub fn add_column(&mut self, name: impl Into<String>) -> DatasetResult<()> {
        let name = name.into();
        if self.columns.iter().any(|c| c.name == name) {
            return Err(DatasetError::DuplicateColumn {
                table: self.name.clone(),
                column: name,
            });
        }
        self.columns.push(DataColumn::new(name));
        Ok(())
    }

    pub fn primary_key(&self) -> &[String] {
        &self.primary_key
    }

    pub fn set_primary_key(&mut self, columns: &[&str]) -> DatasetResult<()> {
        let mut key = Vec::with_capacity(columns.len());
        for c in columns {
            let resolved = self.require_column(c)?;
            key.push(resolved.to_string());
        }
        self.primary_key = key;
        Ok(())
    }

    pub fn rows(&self) -> &[DataRow] {
        &self.rows
    }

    pub fn row(&self, idx: usize) -> Option<&DataRow> {
        self.rows.get(idx)
    }

    pub fn row_mut(&mut self, idx: usize) -> Option<&mut DataRow> {
        self.rows.get_mut(idx)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Append a new pending (Added) row.
    pub fn add_row(&mut self, values: RowValues) -> DatasetResult<usize> {
        let values = self.canonical_values(values)?;
        self.rows.push(DataRow::added(values));
        Ok(self.rows.len() - 1)
    }

    pub fn set_value(&mut self, idx: usize, column: &str, value: Value) -> DatasetResult<()> {
        let column = self.require_column(column)?.to_string();
        let row = self.rows.get_mut(idx).ok_or_else(|| DatasetError::RowIndex {
            table: self.name.clone(),
            row: idx,
        })?;
        if row.state() == RowState::Deleted {
            return Err(DatasetError::DeletedRow {
                table: self.name.clone(),
                row: idx,
            });
        }
        row.set(&column, value);
        Ok(())
    }

    /// Delete a row. Added rows leave the table; others become Deleted.
    pub fn delete_row(&mut self, idx: usize) -> DatasetResult<()> {
        let state = self.require_row(idx)?.state();
        match state {
            RowState::Added => {
                self.rows.remove(idx);
            }
            RowState::Deleted => {}
            RowState::Unchanged | RowState::Modified => self.rows[idx].mark_deleted(),
        }
        Ok(())
    }

    /// Find a row by primary key values, given in key order.
    pub fn find_by_key(&self, key: &[Value]) -> DatasetResult<Option<usize>> {
        if key.len() != self.primary_key.len() {
            return Err(DatasetError::KeyArity {
                table: self.name.clone(),
                expected: self.primary_key.len(),
                actual: key.len(),
            });
        }
        if key.is_empty() {
            return Ok(None);
        }
        Ok(self.rows.iter().position(|row| {
            self.primary_key
                .iter()
                .zip(key)
                .all(|(col, want)| row.value(col) == Some(want))
        }))
    }

    /// Merge an incoming row by primary key, or append it when no row matches.
    ///
    /// Rows are appended as Unchanged, except under [`LoadOption::Upsert`]
    /// where they are appended as Added.
    pub fn load_row(&mut self, values: RowValues, option: LoadOption) -> DatasetResult<LoadOutcome> {
        let values = self.canonical_values(values)?;

        let existing = if self.primary_key.is_empty()
            || !self.primary_key.iter().all(|k| values.contains_key(k))
        {
            None
        } else {
            let key: Vec<Value> = self.primary_key.iter().map(|k| values[k].clone()).collect();
            self.find_by_key(&key)?
        };

        match existing {
            Some(idx) => {
                self.rows[idx].load(&values, option);
                trace!(table = %self.name, row = idx, state = ?self.rows[idx].state(), "merged row");
                Ok(LoadOutcome::Merged(idx))
            }
            None => {
                let row = match option {
                    LoadOption::Upsert => DataRow::added(values),
                    LoadOption::OverwriteChanges | LoadOption::PreserveChanges => {
                        DataRow::unchanged(values)
                    }
                };
                self.rows.push(row);
                let idx = self.rows.len() - 1;
                trace!(table = %self.name, row = idx, "appended row");
                Ok(LoadOutcome::Added(idx))
            }
        }
    }

    /// Accept one row. Returns `true` when the row was a delete and left the table.
    pub fn accept_row(&mut self, idx: usize) -> DatasetResult<bool> {
        if self.require_row(idx)?.state() == RowState::Deleted {
            self.rows.remove(idx);
            return Ok(true);
        }
        self.rows[idx].accept();
        Ok(false)
    }

    /// Reject one row. Returns `true` when the row was an insert and left the table.
    pub fn reject_row(&mut self, idx: usize) -> DatasetResult<bool> {
        if self.require_row(idx)?.state() == RowState::Added {
            self.rows.remove(idx);
            return Ok(true);
        }
        self.rows[idx].reject();
        Ok(false)
    }

    pub fn accept_changes(&mut self) {
        self.rows.retain(|r| r.state() != RowState::Deleted);
        for row in &mut self.rows {
            row.accept();
        }
    }

    pub fn reject_changes(&mut self) {
        self.rows.retain(|r| r.state() != RowState::Added);
        for row in &mut self.rows {
            row.reject();
        }
    }

    pub fn has_changes(&self) -> bool {
        self.rows.iter().any(DataRow::has_changes)
    }

    /// Indices of rows with pending changes, in row order.
    pub fn pending_rows(&self) -> Vec<usize> {
        self.rows
            .iter()
            .enumerate()
            .filter(|(_, r)| r.has_changes())
            .map(|(i, _)| i)
            .collect()
    }

    fn require_column(&self, name: &str) -> DatasetResult<&str> {
        self.resolve_column(name)
            .ok_or_else(|| DatasetError::UnknownColumn {
                table: self.name.clone(),
                column: name.to_string(),
            })
    }

    fn require_row(&self, idx: usize) -> DatasetResult<&DataRow> {
        self.rows.get(idx).ok_or_else(|| DatasetError::RowIndex {
            table: self.name.clone(),
            row: idx,
        })
    }

    fn canonical_values(&self, values: RowValues) -> DatasetResult<RowValues> {
        let mut out = RowValues::new();
        for (column, value) in values {
            let resolved = self.require_column(&column)?;
            out.insert(resolved.to_string(), value);
        }
        Ok(out)
    }
}
