use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed set of policy values with stable raw discriminants.
///
/// Raw discriminants and names are what config files and untyped callers
/// hand to the policy store; they are only ever turned into `Self` through
/// [`PolicyEnum::from_discriminant`] or [`PolicyEnum::from_name`].
pub trait PolicyEnum: Copy + Eq + fmt::Debug + 'static {
    /// Parameter name reported when a raw value is rejected.
    const PARAM: &'static str;

    /// Every declared member, in discriminant order.
    const ALL: &'static [Self];

    fn discriminant(self) -> i32;

    /// Canonical member name (PascalCase).
    fn name(self) -> &'static str;

    fn from_discriminant(raw: i32) -> Option<Self> {
        Self::ALL.iter().copied().find(|v| v.discriminant() == raw)
    }

    /// Case-insensitive lookup; `_` and `-` separators are ignored, so
    /// `"AddWithKey"`, `"add_with_key"` and `"add-with-key"` are equivalent.
    fn from_name(name: &str) -> Option<Self> {
        let wanted = fold_name(name);
        if wanted.is_empty() {
            return None;
        }
        Self::ALL
            .iter()
            .copied()
            .find(|v| fold_name(v.name()) == wanted)
    }
}

fn fold_name(s: &str) -> String {
    s.trim()
        .chars()
        .filter(|c| *c != '_' && *c != '-')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// How incoming rows are merged into rows that already exist in the dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadOption {
    /// Incoming values replace both the original and current versions.
    OverwriteChanges,
    /// Incoming values replace the original version; local edits survive.
    PreserveChanges,
    /// Incoming values become pending edits on the current version.
    Upsert,
}

impl PolicyEnum for LoadOption {
    const PARAM: &'static str = "LoadOption";
    const ALL: &'static [Self] = &[
        LoadOption::OverwriteChanges,
        LoadOption::PreserveChanges,
        LoadOption::Upsert,
    ];

    fn discriminant(self) -> i32 {
        match self {
            LoadOption::OverwriteChanges => 1,
            LoadOption::PreserveChanges => 2,
            LoadOption::Upsert => 3,
        }
    }

    fn name(self) -> &'static str {
        match self {
            LoadOption::OverwriteChanges => "OverwriteChanges",
            LoadOption::PreserveChanges => "PreserveChanges",
            LoadOption::Upsert => "Upsert",
        }
    }
}

/// What to do when a source table or column has no entry in the mappings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingMappingAction {
    /// Use the source name unchanged.
    #[default]
    Passthrough,
    /// Skip the unmapped table or column.
    Ignore,
    /// Abort the pass.
    Error,
}

impl PolicyEnum for MissingMappingAction {
    const PARAM: &'static str = "MissingMappingAction";
    const ALL: &'static [Self] = &[
        MissingMappingAction::Passthrough,
        MissingMappingAction::Ignore,
        MissingMappingAction::Error,
    ];

    fn discriminant(self) -> i32 {
        match self {
            MissingMappingAction::Passthrough => 1,
            MissingMappingAction::Ignore => 2,
            MissingMappingAction::Error => 3,
        }
    }

    fn name(self) -> &'static str {
        match self {
            MissingMappingAction::Passthrough => "Passthrough",
            MissingMappingAction::Ignore => "Ignore",
            MissingMappingAction::Error => "Error",
        }
    }
}

/// What to do when the dataset lacks a table or column referenced by incoming data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingSchemaAction {
    /// Skip the missing table or column.
    Ignore,
    /// Abort the pass.
    Error,
    /// Create the missing table or column, including its key definition.
    #[default]
    AddWithKey,
}

impl PolicyEnum for MissingSchemaAction {
    const PARAM: &'static str = "MissingSchemaAction";
    const ALL: &'static [Self] = &[
        MissingSchemaAction::Ignore,
        MissingSchemaAction::Error,
        MissingSchemaAction::AddWithKey,
    ];

    fn discriminant(self) -> i32 {
        match self {
            MissingSchemaAction::Ignore => 2,
            MissingSchemaAction::Error => 3,
            MissingSchemaAction::AddWithKey => 4,
        }
    }

    fn name(self) -> &'static str {
        match self {
            MissingSchemaAction::Ignore => "Ignore",
            MissingSchemaAction::Error => "Error",
            MissingSchemaAction::AddWithKey => "AddWithKey",
        }
    }
}

macro_rules! display_by_name {
    ($($ty:ty),*) => {
        $(
            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(self.name())
                }
            }
        )*
    };
}

display_by_name!(LoadOption, MissingMappingAction, MissingSchemaAction);
