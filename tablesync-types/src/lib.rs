//! Shared DTOs for the tablesync workspace.
//!
//! # Design constraints
//! - Policy enums are closed: an out-of-range value can only exist as raw
//!   input to a validating setter, never as a stored enum.
//! - Source batches, row changes and dataset files are serialized to disk by
//!   the CLI. Prefer adding optional fields over changing semantics.

pub mod batch;
pub mod mapping;
pub mod policy;
pub mod report;

pub use batch::{ChangeKind, FillBatch, FillRequest, RowChange, RowValues, SourceTable};
pub use mapping::{ColumnMapping, MappingError, TableMapping, TableMappings};
pub use policy::{LoadOption, MissingMappingAction, MissingSchemaAction, PolicyEnum};
pub use report::{FillReport, UpdateReport};

/// A single cell value. `Value::Null` is a legal cell value.
pub type Value = serde_json::Value;
