//! Port traits abstracting all data-source I/O away from the passes.

use tablesync_types::{FillBatch, FillRequest, RowChange};
use thiserror::Error;

/// Failure reported by a [`CommandExecutor`].
#[derive(Debug, Error)]
pub enum ExecutorError {
    /// The executor does not implement the requested capability.
    #[error("{message}")]
    NotSupported { message: String },

    /// The operation was cancelled before it completed.
    #[error("operation cancelled")]
    Cancelled,

    /// The source refused one logical operation (for example a constraint violation).
    #[error("{message}")]
    Rejected { message: String },

    #[error("{0:#}")]
    Io(#[from] anyhow::Error),
}

impl ExecutorError {
    pub fn not_supported(operation: &str) -> Self {
        ExecutorError::NotSupported {
            message: format!(
                "specified method is not supported: {} requires a command executor",
                operation
            ),
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        ExecutorError::Rejected {
            message: message.into(),
        }
    }
}

/// Moves data between the adapter and an external tabular source.
///
/// Every method has a default body. The fill capability is `fetch`; the
/// update capability is `begin_update` plus `apply`. Executors that only
/// override part of this surface fail the other pass with
/// [`ExecutorError::NotSupported`].
pub trait CommandExecutor {
    /// Return the tables for one fill. With `request.schema_only` rows may be omitted.
    fn fetch(&mut self, request: &FillRequest) -> Result<FillBatch, ExecutorError> {
        let _ = request;
        Err(ExecutorError::not_supported("fill"))
    }

    /// Called once before an update pass inspects any row.
    fn begin_update(&mut self) -> Result<(), ExecutorError> {
        Err(ExecutorError::not_supported("update"))
    }

    /// Apply one row change; returns the number of source rows affected.
    fn apply(&mut self, change: &RowChange) -> Result<u64, ExecutorError> {
        let _ = change;
        Err(ExecutorError::not_supported("update"))
    }

    /// Called once after the last row of an update pass that was not aborted.
    fn finish_update(&mut self) -> Result<(), ExecutorError> {
        Ok(())
    }
}

impl<E: CommandExecutor + ?Sized> CommandExecutor for &mut E {
    fn fetch(&mut self, request: &FillRequest) -> Result<FillBatch, ExecutorError> {
        (**self).fetch(request)
    }

    fn begin_update(&mut self) -> Result<(), ExecutorError> {
        (**self).begin_update()
    }

    fn apply(&mut self, change: &RowChange) -> Result<u64, ExecutorError> {
        (**self).apply(change)
    }

    fn finish_update(&mut self) -> Result<(), ExecutorError> {
        (**self).finish_update()
    }
}

impl<E: CommandExecutor + ?Sized> CommandExecutor for Box<E> {
    fn fetch(&mut self, request: &FillRequest) -> Result<FillBatch, ExecutorError> {
        (**self).fetch(request)
    }

    fn begin_update(&mut self) -> Result<(), ExecutorError> {
        (**self).begin_update()
    }

    fn apply(&mut self, change: &RowChange) -> Result<u64, ExecutorError> {
        (**self).apply(change)
    }

    fn finish_update(&mut self) -> Result<(), ExecutorError> {
        (**self).finish_update()
    }
}

/// Executor with no capabilities; the default for [`crate::DataAdapter::new`].
#[derive(Debug, Clone, Copy, Default)]
pub struct UnsupportedExecutor;

impl CommandExecutor for UnsupportedExecutor {}
