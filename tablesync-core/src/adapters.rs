//! Concrete [`CommandExecutor`] implementations.
//!
//! - [`InMemoryExecutor`] keeps source tables in memory and can be told to
//!   reject or cancel at a given row ordinal
//! - [`JsonFileExecutor`] reads a [`FillBatch`] from a JSON file and writes it
//!   back after an update pass

use crate::ports::{CommandExecutor, ExecutorError};
use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use std::collections::BTreeMap;
use tablesync_types::{ChangeKind, FillBatch, FillRequest, RowChange, RowValues, Value};
use tracing::debug;

/// In-memory source, mostly for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct InMemoryExecutor {
    batch: FillBatch,
    failures: BTreeMap<usize, String>,
    cancel_at: Option<usize>,
    cancel_fetch: bool,
    requests: Vec<FillRequest>,
    applied: Vec<RowChange>,
}

impl InMemoryExecutor {
    pub fn new(batch: FillBatch) -> Self {
        Self {
            batch,
            ..Self::default()
        }
    }

    /// Reject the change with this ordinal.
    pub fn fail_at(mut self, ordinal: usize, message: impl Into<String>) -> Self {
        self.failures.insert(ordinal, message.into());
        self
    }

    /// Report cancellation when the change with this ordinal arrives.
    pub fn cancel_at(mut self, ordinal: usize) -> Self {
        self.cancel_at = Some(ordinal);
        self
    }

    /// Report cancellation on every fetch.
    pub fn cancel_fetch(mut self) -> Self {
        self.cancel_fetch = true;
        self
    }

    pub fn batch(&self) -> &FillBatch {
        &self.batch
    }

    /// Fill requests received, in order.
    pub fn requests(&self) -> &[FillRequest] {
        &self.requests
    }

    /// Row changes that were applied successfully, in order.
    pub fn applied(&self) -> &[RowChange] {
        &self.applied
    }
}

impl CommandExecutor for InMemoryExecutor {
    fn fetch(&mut self, request: &FillRequest) -> Result<FillBatch, ExecutorError> {
        self.requests.push(*request);
        if self.cancel_fetch {
            return Err(ExecutorError::Cancelled);
        }
        Ok(fetch_from(&self.batch, request))
    }

    fn begin_update(&mut self) -> Result<(), ExecutorError> {
        Ok(())
    }

    fn apply(&mut self, change: &RowChange) -> Result<u64, ExecutorError> {
        if self.cancel_at == Some(change.ordinal) {
            return Err(ExecutorError::Cancelled);
        }
        if let Some(message) = self.failures.get(&change.ordinal) {
            return Err(ExecutorError::rejected(message.clone()));
        }
        let affected = apply_to_batch(&mut self.batch, change)?;
        self.applied.push(change.clone());
        Ok(affected)
    }
}

/// Source stored as a pretty-printed [`FillBatch`] JSON document.
#[derive(Debug)]
pub struct JsonFileExecutor {
    path: Utf8PathBuf,
    batch: FillBatch,
    dirty: bool,
}

impl JsonFileExecutor {
    /// Open the file at `path`. A missing file is an empty source.
    pub fn open(path: impl AsRef<Utf8Path>) -> anyhow::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let batch = read_batch(&path)?;
        Ok(Self {
            path,
            batch,
            dirty: false,
        })
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    pub fn batch(&self) -> &FillBatch {
        &self.batch
    }

    /// Write applied changes back to the file. No-op when nothing changed.
    pub fn flush(&mut self) -> anyhow::Result<()> {
        if !self.dirty {
            return Ok(());
        }
        let contents =
            serde_json::to_string_pretty(&self.batch).context("serialize source tables")?;
        fs_err::write(&self.path, contents + "\n")
            .with_context(|| format!("write source {}", self.path))?;
        debug!(path = %self.path, "flushed source tables");
        self.dirty = false;
        Ok(())
    }
}

impl CommandExecutor for JsonFileExecutor {
    fn fetch(&mut self, request: &FillRequest) -> Result<FillBatch, ExecutorError> {
        self.batch = read_batch(&self.path)?;
        self.dirty = false;
        Ok(fetch_from(&self.batch, request))
    }

    fn begin_update(&mut self) -> Result<(), ExecutorError> {
        Ok(())
    }

    fn apply(&mut self, change: &RowChange) -> Result<u64, ExecutorError> {
        let affected = apply_to_batch(&mut self.batch, change)?;
        if affected > 0 {
            self.dirty = true;
        }
        Ok(affected)
    }

    fn finish_update(&mut self) -> Result<(), ExecutorError> {
        self.flush()?;
        Ok(())
    }
}

fn read_batch(path: &Utf8Path) -> anyhow::Result<FillBatch> {
    if !path.exists() {
        debug!(path = %path, "source file missing; treating as empty");
        return Ok(FillBatch::default());
    }
    let contents = fs_err::read_to_string(path).with_context(|| format!("read source {}", path))?;
    serde_json::from_str(&contents).with_context(|| format!("parse source JSON {}", path))
}

fn fetch_from(batch: &FillBatch, request: &FillRequest) -> FillBatch {
    let mut out = batch.clone();
    if request.schema_only {
        for table in &mut out.tables {
            table.rows.clear();
        }
    }
    out
}

/// Apply one change to a batch. Returns the number of rows affected;
/// 0 when no row matched the change's key.
fn apply_to_batch(batch: &mut FillBatch, change: &RowChange) -> Result<u64, ExecutorError> {
    let table = batch.table_mut(&change.source_table).ok_or_else(|| {
        ExecutorError::rejected(format!("unknown source table '{}'", change.source_table))
    })?;

    match change.kind {
        ChangeKind::Insert => {
            let current = change
                .current
                .as_ref()
                .ok_or_else(|| ExecutorError::rejected("insert without values"))?;
            if let Some(unknown) = current.keys().find(|c| table.column_index(c).is_none()) {
                return Err(ExecutorError::rejected(format!(
                    "unknown column '{}' in source table '{}'",
                    unknown, table.name
                )));
            }
            let row = table
                .columns
                .iter()
                .map(|c| current.get(c).cloned().unwrap_or(Value::Null))
                .collect();
            table.rows.push(row);
            Ok(1)
        }
        ChangeKind::Update | ChangeKind::Delete => {
            let locator = locator_for(change);
            let Some(idx) = (0..table.rows.len()).find(|&i| {
                table
                    .row_values(i)
                    .is_some_and(|row| locator.iter().all(|(c, v)| row.get(c) == Some(v)))
            }) else {
                return Ok(0);
            };

            if change.kind == ChangeKind::Delete {
                table.rows.remove(idx);
                return Ok(1);
            }

            let current = change
                .current
                .as_ref()
                .ok_or_else(|| ExecutorError::rejected("update without values"))?;
            for (column, value) in current {
                let Some(col) = table.column_index(column) else {
                    return Err(ExecutorError::rejected(format!(
                        "unknown column '{}' in source table '{}'",
                        column, table.name
                    )));
                };
                let row = &mut table.rows[idx];
                if row.len() <= col {
                    row.resize(col + 1, Value::Null);
                }
                row[col] = value.clone();
            }
            Ok(1)
        }
    }
}

/// Key values when the change carries a key, else the full original row.
fn locator_for(change: &RowChange) -> RowValues {
    if !change.key.is_empty() {
        return change.key.clone();
    }
    change.original.clone().unwrap_or_default()
}
