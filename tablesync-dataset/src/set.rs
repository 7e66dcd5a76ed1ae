use crate::error::{DatasetError, DatasetResult};
use crate::table::DataTable;
use serde::{Deserialize, Serialize};

/// A named collection of tables.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataSet {
    #[serde(default)]
    tables: Vec<DataTable>,
}

impl DataSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tables(&self) -> &[DataTable] {
        &self.tables
    }

    pub fn tables_mut(&mut self) -> &mut [DataTable] {
        &mut self.tables
    }

    /// Index of the table named `name`: exact match, then ASCII case-insensitive.
    pub fn table_index(&self, name: &str) -> Option<usize> {
        self.tables
            .iter()
            .position(|t| t.name() == name)
            .or_else(|| {
                self.tables
                    .iter()
                    .position(|t| t.name().eq_ignore_ascii_case(name))
            })
    }

    pub fn table(&self, name: &str) -> Option<&DataTable> {
        self.table_index(name).map(|i| &self.tables[i])
    }

    pub fn table_mut(&mut self, name: &str) -> Option<&mut DataTable> {
        let idx = self.table_index(name)?;
        Some(&mut self.tables[idx])
    }

    pub fn add_table(&mut self, table: DataTable) -> DatasetResult<&mut DataTable> {
        if self.tables.iter().any(|t| t.name() == table.name()) {
            return Err(DatasetError::DuplicateTable {
                table: table.name().to_string(),
            });
        }
        self.tables.push(table);
        let idx = self.tables.len() - 1;
        Ok(&mut self.tables[idx])
    }

    pub fn accept_changes(&mut self) {
        for table in &mut self.tables {
            table.accept_changes();
        }
    }

    pub fn reject_changes(&mut self) {
        for table in &mut self.tables {
            table.reject_changes();
        }
    }

    pub fn has_changes(&self) -> bool {
        self.tables.iter().any(DataTable::has_changes)
    }
}
