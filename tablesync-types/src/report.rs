use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of a fill or fill-schema pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FillReport {
    pub started_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,

    pub tables_added: u64,
    pub columns_added: u64,
    pub rows_added: u64,
    pub rows_merged: u64,

    /// Tables skipped because of an Ignore mapping or schema action.
    pub tables_skipped: u64,

    /// Columns skipped because of an Ignore mapping or schema action.
    pub columns_skipped: u64,
}

impl FillReport {
    pub fn started() -> Self {
        Self {
            started_at: Utc::now(),
            ended_at: None,
            tables_added: 0,
            columns_added: 0,
            rows_added: 0,
            rows_merged: 0,
            tables_skipped: 0,
            columns_skipped: 0,
        }
    }

    /// Rows added plus rows merged into existing rows.
    pub fn rows_loaded(&self) -> u64 {
        self.rows_added + self.rows_merged
    }

    pub fn finish(&mut self) {
        self.ended_at = Some(Utc::now());
    }
}

/// Outcome of an update pass in which every row applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateReport {
    pub started_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,

    pub attempted: u64,
    pub applied: u64,

    /// Sum of the affected-row counts the executor reported.
    pub rows_affected: u64,
}

impl UpdateReport {
    pub fn started() -> Self {
        Self {
            started_at: Utc::now(),
            ended_at: None,
            attempted: 0,
            applied: 0,
            rows_affected: 0,
        }
    }

    pub fn finish(&mut self) {
        self.ended_at = Some(Utc::now());
    }
}
