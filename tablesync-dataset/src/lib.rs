//! Change-tracked in-memory dataset.
//!
//! A [`DataSet`] holds named [`DataTable`]s; each table holds [`DataRow`]s that
//! carry an original and a current version plus a [`RowState`]. The adapter
//! merges incoming rows with [`DataTable::load_row`] and commits them with the
//! accept-changes family of methods.

mod error;
mod row;
mod set;
mod table;

pub use error::{DatasetError, DatasetResult};
pub use row::{DataRow, RowState};
pub use set::DataSet;
pub use table::{DataColumn, DataTable, LoadOutcome};
