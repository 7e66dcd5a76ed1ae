use crate::error::{PolicyError, PolicyResult};
use std::fmt;
use tablesync_types::PolicyEnum;

/// Untyped policy value as supplied by a config file or an embedding caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyInput {
    Discriminant(i32),
    Name(String),
}

impl PolicyInput {
    /// Resolve to a declared member of `T`, or fail with `OutOfRange`.
    pub fn resolve<T: PolicyEnum>(&self) -> PolicyResult<T> {
        let resolved = match self {
            PolicyInput::Discriminant(raw) => T::from_discriminant(*raw),
            PolicyInput::Name(name) => T::from_name(name),
        };
        resolved.ok_or_else(|| PolicyError::OutOfRange {
            param: T::PARAM,
            value: self.to_string(),
        })
    }
}

impl fmt::Display for PolicyInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyInput::Discriminant(raw) => write!(f, "{}", raw),
            PolicyInput::Name(name) => f.write_str(name),
        }
    }
}

impl From<i32> for PolicyInput {
    fn from(raw: i32) -> Self {
        PolicyInput::Discriminant(raw)
    }
}

impl From<&str> for PolicyInput {
    fn from(name: &str) -> Self {
        PolicyInput::Name(name.to_string())
    }
}

impl From<String> for PolicyInput {
    fn from(name: String) -> Self {
        PolicyInput::Name(name)
    }
}
