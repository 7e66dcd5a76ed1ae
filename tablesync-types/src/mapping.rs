//! Source-to-dataset name mappings.
//!
//! Lookups try an exact match first and fall back to an ASCII
//! case-insensitive match.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMapping {
    pub source_column: String,
    pub dataset_column: String,
}

impl ColumnMapping {
    pub fn new(source_column: impl Into<String>, dataset_column: impl Into<String>) -> Self {
        Self {
            source_column: source_column.into(),
            dataset_column: dataset_column.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableMapping {
    pub source_table: String,
    pub dataset_table: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub columns: Vec<ColumnMapping>,
}

impl TableMapping {
    pub fn new(source_table: impl Into<String>, dataset_table: impl Into<String>) -> Self {
        Self {
            source_table: source_table.into(),
            dataset_table: dataset_table.into(),
            columns: Vec::new(),
        }
    }

    /// Builder-style column mapping.
    pub fn with_column(
        mut self,
        source_column: impl Into<String>,
        dataset_column: impl Into<String>,
    ) -> Self {
        self.columns
            .push(ColumnMapping::new(source_column, dataset_column));
        self
    }

    pub fn column_by_source(&self, source_column: &str) -> Option<&ColumnMapping> {
        find_by(&self.columns, source_column, |c| &c.source_column)
    }

    pub fn column_by_dataset(&self, dataset_column: &str) -> Option<&ColumnMapping> {
        find_by(&self.columns, dataset_column, |c| &c.dataset_column)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MappingError {
    DuplicateSourceTable { source_table: String },
}

impl std::fmt::Display for MappingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MappingError::DuplicateSourceTable { source_table } => {
                write!(f, "a mapping for source table '{}' already exists", source_table)
            }
        }
    }
}

impl std::error::Error for MappingError {}

/// Ordered collection of table mappings owned by one adapter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TableMappings {
    mappings: Vec<TableMapping>,
}

impl TableMappings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, mapping: TableMapping) -> Result<(), MappingError> {
        if self
            .mappings
            .iter()
            .any(|m| m.source_table == mapping.source_table)
        {
            return Err(MappingError::DuplicateSourceTable {
                source_table: mapping.source_table,
            });
        }
        self.mappings.push(mapping);
        Ok(())
    }

    pub fn remove(&mut self, source_table: &str) -> Option<TableMapping> {
        let idx = self
            .mappings
            .iter()
            .position(|m| m.source_table == source_table)?;
        Some(self.mappings.remove(idx))
    }

    pub fn by_source(&self, source_table: &str) -> Option<&TableMapping> {
        find_by(&self.mappings, source_table, |m| &m.source_table)
    }

    pub fn by_dataset(&self, dataset_table: &str) -> Option<&TableMapping> {
        find_by(&self.mappings, dataset_table, |m| &m.dataset_table)
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TableMapping> {
        self.mappings.iter()
    }
}

fn find_by<'a, T>(items: &'a [T], name: &str, key: impl Fn(&T) -> &String) -> Option<&'a T> {
    items
        .iter()
        .find(|item| key(item) == name)
        .or_else(|| items.iter().find(|item| key(item).eq_ignore_ascii_case(name)))
}
