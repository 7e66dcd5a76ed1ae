//! Policy store for the reconciliation adapter.
//!
//! [`PolicyStore`] owns an [`AdapterConfig`] and is the only way to change it.
//! Enum-valued fields are validated on write: raw input ([`PolicyInput`]) that
//! does not name a declared member is rejected with
//! [`PolicyError::OutOfRange`] and the store is left untouched.

mod error;
mod input;
mod store;

pub use error::{PolicyError, PolicyResult};
pub use input::PolicyInput;
pub use store::{AdapterConfig, PolicyStore};
