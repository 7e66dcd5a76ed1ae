use crate::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Column name -> value.
pub type RowValues = BTreeMap<String, Value>;

/// What the adapter asks an executor for during a fill.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FillRequest {
    /// Only table/column/key descriptions are wanted; rows may be omitted.
    pub schema_only: bool,

    /// Materialize values in the provider's native representation.
    /// Passed through verbatim from the adapter policy.
    pub return_provider_specific_types: bool,
}

/// One result set returned by an executor.
///
/// Rows are positional and aligned with `columns`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceTable {
    pub name: String,
    pub columns: Vec<String>,

    /// Key columns, in key order. Empty when the source has no key.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub key: Vec<String>,

    #[serde(default)]
    pub rows: Vec<Vec<Value>>,
}

impl SourceTable {
    pub fn new(name: impl Into<String>, columns: &[&str]) -> Self {
        Self {
            name: name.into(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            key: Vec::new(),
            rows: Vec::new(),
        }
    }

    pub fn with_key(mut self, key: &[&str]) -> Self {
        self.key = key.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn with_row(mut self, row: Vec<Value>) -> Self {
        self.rows.push(row);
        self
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    /// Row `idx` as a name -> value map. Short rows are padded with nulls.
    pub fn row_values(&self, idx: usize) -> Option<RowValues> {
        let row = self.rows.get(idx)?;
        Some(
            self.columns
                .iter()
                .enumerate()
                .map(|(i, c)| (c.clone(), row.get(i).cloned().unwrap_or(Value::Null)))
                .collect(),
        )
    }
}

/// Everything an executor returns for one fill.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FillBatch {
    #[serde(default)]
    pub tables: Vec<SourceTable>,
}

impl FillBatch {
    pub fn new(tables: Vec<SourceTable>) -> Self {
        Self { tables }
    }

    pub fn table(&self, name: &str) -> Option<&SourceTable> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn table_mut(&mut self, name: &str) -> Option<&mut SourceTable> {
        self.tables.iter_mut().find(|t| t.name == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ChangeKind::Insert => "insert",
            ChangeKind::Update => "update",
            ChangeKind::Delete => "delete",
        })
    }
}

/// One pending row change handed to an executor during an update.
///
/// All column names are source names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowChange {
    /// 1-based position of this change within the update pass.
    pub ordinal: usize,
    pub source_table: String,
    pub kind: ChangeKind,

    /// Key column -> key value, taken from the original version when there is one.
    #[serde(default)]
    pub key: RowValues,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original: Option<RowValues>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current: Option<RowValues>,
}
