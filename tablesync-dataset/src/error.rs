use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DatasetError {
    #[error("unknown table '{table}'")]
    UnknownTable { table: String },

    #[error("unknown column '{column}' in table '{table}'")]
    UnknownColumn { table: String, column: String },

    #[error("table '{table}' already exists")]
    DuplicateTable { table: String },

    #[error("column '{column}' already exists in table '{table}'")]
    DuplicateColumn { table: String, column: String },

    #[error("row {row} of table '{table}' is deleted and cannot be edited")]
    DeletedRow { table: String, row: usize },

    #[error("row {row} is out of range for table '{table}'")]
    RowIndex { table: String, row: usize },

    #[error("table '{table}' has a {expected}-column key, got {actual} key values")]
    KeyArity {
        table: String,
        expected: usize,
        actual: usize,
    },
}

pub type DatasetResult<T> = Result<T, DatasetError>;
