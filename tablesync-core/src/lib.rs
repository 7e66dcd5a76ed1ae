//! Embeddable reconciliation adapter.
//!
//! [`DataAdapter`] couples a [`PolicyStore`], a set of table mappings and a
//! command executor. It runs fill, fill-schema and update passes against a
//! [`DataSet`], applying the current policy at call time.
//!
//! # Port traits
//!
//! All data-source I/O goes through [`CommandExecutor`](ports::CommandExecutor).
//! Its methods default to "not supported", so an adapter built with
//! [`DataAdapter::new`] defines policy but fails every pass cleanly.
//!
//! The [`adapters`] module provides an in-memory executor and a JSON-file
//! backed one.
//!
//! # Entry points
//!
//! - [`run_fill`](pipeline::run_fill) - merge source rows into a dataset
//! - [`run_fill_schema`](pipeline::run_fill_schema) - reconcile schema only
//! - [`run_update`](pipeline::run_update) - push pending dataset changes

pub mod adapter;
pub mod adapters;
pub mod error;
pub mod pipeline;
pub mod ports;

pub use adapter::DataAdapter;
pub use error::{AdapterError, RowApplyFailure};
pub use ports::{CommandExecutor, ExecutorError, UnsupportedExecutor};

// Re-exports so embedders don't need the leaf crates directly.
pub use tablesync_dataset::{DataRow, DataSet, DataTable, RowState};
pub use tablesync_policy::{AdapterConfig, PolicyError, PolicyInput, PolicyStore};
pub use tablesync_types::{
    FillReport, LoadOption, MissingMappingAction, MissingSchemaAction, TableMapping,
    TableMappings, UpdateReport,
};
