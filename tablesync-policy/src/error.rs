//! Error types for policy validation.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    /// A raw value did not name a member of the parameter's enumeration.
    #[error("the {param} enumeration value, {value}, is invalid (parameter '{param}')")]
    OutOfRange {
        /// Parameter name, e.g. `LoadOption`.
        param: &'static str,
        /// The rejected literal, as supplied.
        value: String,
    },
}

impl PolicyError {
    /// Name of the rejected parameter.
    pub fn param(&self) -> &'static str {
        match self {
            PolicyError::OutOfRange { param, .. } => *param,
        }
    }

    /// The rejected literal value.
    pub fn value(&self) -> &str {
        match self {
            PolicyError::OutOfRange { value, .. } => value,
        }
    }
}

pub type PolicyResult<T> = Result<T, PolicyError>;
