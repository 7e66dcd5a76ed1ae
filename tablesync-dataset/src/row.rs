use serde::{Deserialize, Serialize};
use tablesync_types::{LoadOption, RowValues, Value};

/// Pending-change state of a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowState {
    Unchanged,
    Added,
    Modified,
    Deleted,
}

impl RowState {
    pub fn is_pending(self) -> bool {
        !matches!(self, RowState::Unchanged)
    }
}

/// A row with an original version (absent for added rows) and a current
/// version (absent for deleted rows).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataRow {
    state: RowState,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    original: Option<RowValues>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    current: Option<RowValues>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl DataRow {
    pub fn unchanged(values: RowValues) -> Self {
        Self {
            state: RowState::Unchanged,
            original: Some(values.clone()),
            current: Some(values),
            error: None,
        }
    }

    pub fn added(values: RowValues) -> Self {
        Self {
            state: RowState::Added,
            original: None,
            current: Some(values),
            error: None,
        }
    }

    pub fn state(&self) -> RowState {
        self.state
    }

    pub fn has_changes(&self) -> bool {
        self.state.is_pending()
    }

    pub fn original(&self) -> Option<&RowValues> {
        self.original.as_ref()
    }

    pub fn current(&self) -> Option<&RowValues> {
        self.current.as_ref()
    }

    pub fn original_value(&self, column: &str) -> Option<&Value> {
        self.original.as_ref()?.get(column)
    }

    pub fn current_value(&self, column: &str) -> Option<&Value> {
        self.current.as_ref()?.get(column)
    }

    /// Current value, or the original one for deleted rows.
    pub fn value(&self, column: &str) -> Option<&Value> {
        self.current_value(column)
            .or_else(|| self.original_value(column))
    }

    pub fn row_error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn set_row_error(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
    }

    pub fn clear_row_error(&mut self) {
        self.error = None;
    }

    pub(crate) fn set(&mut self, column: &str, value: Value) {
        if let Some(current) = self.current.as_mut() {
            current.insert(column.to_string(), value);
        }
        if self.state == RowState::Unchanged {
            self.state = RowState::Modified;
        }
    }

    pub(crate) fn mark_deleted(&mut self) {
        self.current = None;
        self.state = RowState::Deleted;
    }

    /// Commit pending edits. Callers remove deleted rows instead.
    pub(crate) fn accept(&mut self) {
        self.original = self.current.clone();
        self.state = RowState::Unchanged;
        self.error = None;
    }

    /// Roll back to the original version. Callers remove added rows instead.
    pub(crate) fn reject(&mut self) {
        self.current = self.original.clone();
        self.state = RowState::Unchanged;
        self.error = None;
    }

    /// Merge incoming values into this row according to `option`.
    ///
    /// Columns absent from `incoming` keep their existing values.
    pub(crate) fn load(&mut self, incoming: &RowValues, option: LoadOption) {
        match option {
            LoadOption::OverwriteChanges => {
                let base = self.current.as_ref().or(self.original.as_ref());
                let merged = overlay(base, incoming);
                self.original = Some(merged.clone());
                self.current = Some(merged);
                self.state = RowState::Unchanged;
            }
            LoadOption::PreserveChanges => match self.state {
                RowState::Unchanged => self.load(incoming, LoadOption::OverwriteChanges),
                RowState::Added => {
                    self.original = Some(overlay(self.current.as_ref(), incoming));
                    self.state = RowState::Modified;
                }
                RowState::Modified | RowState::Deleted => {
                    self.original = Some(overlay(self.original.as_ref(), incoming));
                }
            },
            LoadOption::Upsert => match self.state {
                RowState::Unchanged => {
                    let merged = overlay(self.current.as_ref(), incoming);
                    if Some(&merged) != self.current.as_ref() {
                        self.state = RowState::Modified;
                    }
                    self.current = Some(merged);
                }
                RowState::Added | RowState::Modified => {
                    self.current = Some(overlay(self.current.as_ref(), incoming));
                }
                RowState::Deleted => {
                    self.current = Some(overlay(self.original.as_ref(), incoming));
                    self.state = RowState::Modified;
                }
            },
        }
    }
}

fn overlay(base: Option<&RowValues>, incoming: &RowValues) -> RowValues {
    let mut merged = base.cloned().unwrap_or_default();
    for (column, value) in incoming {
        merged.insert(column.clone(), value.clone());
    }
    merged
}
