//! Error types for adapter passes.
//!
//! Errors fall in two groups, mirroring exit-code semantics:
//! - Policy blocks (exit code 2): missing schema or mapping under an Error
//!   action, and row-level failures during an update
//! - Runtime errors (exit code 1): unsupported operations, cancellation,
//!   executor I/O and dataset misuse

use crate::ports::ExecutorError;
use tablesync_dataset::DatasetError;
use tablesync_types::ChangeKind;
use thiserror::Error;

/// One row change the executor refused during an update pass.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("row {ordinal} ({kind} on '{table}'): {message}")]
pub struct RowApplyFailure {
    /// 1-based position of the change within the pass.
    pub ordinal: usize,
    /// Dataset table the row belongs to.
    pub table: String,
    pub kind: ChangeKind,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum AdapterError {
    /// The adapter has no executor capable of the requested pass.
    #[error("{message}")]
    NotSupported { message: String },

    #[error("missing schema for {}", describe_target(.table, .column))]
    MissingSchema {
        table: String,
        column: Option<String>,
    },

    #[error("missing mapping for {}", describe_target(.table, .column))]
    MissingMapping {
        table: String,
        column: Option<String>,
    },

    #[error("update aborted: {0}")]
    RowApply(RowApplyFailure),

    #[error(
        "{} row change(s) failed ({} applied): {}",
        .failures.len(),
        .applied,
        describe_failures(.failures)
    )]
    AggregateApply {
        failures: Vec<RowApplyFailure>,
        applied: u64,
    },

    #[error("pass cancelled by the command executor")]
    Cancelled,

    #[error(transparent)]
    Dataset(#[from] DatasetError),

    #[error("executor failure: {0:#}")]
    Executor(anyhow::Error),
}

impl AdapterError {
    /// Returns true if the pass stopped because of policy (exit code 2).
    pub fn is_policy_block(&self) -> bool {
        matches!(
            self,
            AdapterError::MissingSchema { .. }
                | AdapterError::MissingMapping { .. }
                | AdapterError::RowApply(_)
                | AdapterError::AggregateApply { .. }
        )
    }

    /// Returns the recommended exit code for this error.
    pub fn exit_code(&self) -> u8 {
        if self.is_policy_block() { 2 } else { 1 }
    }

    /// Every row-level failure carried by this error.
    pub fn row_failures(&self) -> &[RowApplyFailure] {
        match self {
            AdapterError::RowApply(failure) => std::slice::from_ref(failure),
            AdapterError::AggregateApply { failures, .. } => failures,
            _ => &[],
        }
    }
}

impl From<ExecutorError> for AdapterError {
    fn from(err: ExecutorError) -> Self {
        match err {
            ExecutorError::NotSupported { message } => AdapterError::NotSupported { message },
            ExecutorError::Cancelled => AdapterError::Cancelled,
            ExecutorError::Rejected { message } => AdapterError::Executor(anyhow::anyhow!(message)),
            ExecutorError::Io(err) => AdapterError::Executor(err),
        }
    }
}

fn describe_target(table: &str, column: &Option<String>) -> String {
    match column {
        Some(column) => format!("column '{}' of table '{}'", column, table),
        None => format!("table '{}'", table),
    }
}

fn describe_failures(failures: &[RowApplyFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    fn failure(ordinal: usize) -> RowApplyFailure {
        RowApplyFailure {
            ordinal,
            table: "customers".to_string(),
            kind: ChangeKind::Update,
            message: "constraint violated".to_string(),
        }
    }

    #[test]
    fn not_supported_has_no_source() {
        let err = AdapterError::from(ExecutorError::not_supported("fill"));
        assert!(matches!(err, AdapterError::NotSupported { .. }));
        assert!(err.source().is_none());
        assert!(!err.to_string().is_empty());
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn aggregate_lists_every_row() {
        let err = AdapterError::AggregateApply {
            failures: vec![failure(2), failure(5)],
            applied: 3,
        };
        let msg = err.to_string();
        assert!(msg.contains("2 row change(s) failed"));
        assert!(msg.contains("row 2"));
        assert!(msg.contains("row 5"));
        assert!(err.is_policy_block());
        assert_eq!(err.row_failures().len(), 2);
    }

    #[test]
    fn missing_schema_names_column_and_table() {
        let err = AdapterError::MissingSchema {
            table: "customers".to_string(),
            column: Some("email".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "missing schema for column 'email' of table 'customers'"
        );
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn cancelled_is_distinct_runtime_error() {
        let err = AdapterError::from(ExecutorError::Cancelled);
        assert!(matches!(err, AdapterError::Cancelled));
        assert!(!err.is_policy_block());
        assert!(err.row_failures().is_empty());
    }
}
