//! Run bookkeeping for the `collection_runs` table.
//!
//! Runs move `queued -> running -> succeeded | failed`; each transition is
//! guarded on the current status so a run can never be completed twice.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Queued,
    Running,
    Succeeded,
    Failed,
}

impl RunStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Queued => "queued",
            RunStatus::Running => "running",
            RunStatus::Succeeded => "succeeded",
            RunStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A row from the `collection_runs` table.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CollectionRunRow {
    pub id: i64,
    pub public_id: Uuid,
    pub run_type: String,
    pub trigger_source: String,
    pub status: String,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    /// The schema defines this as `INTEGER NOT NULL DEFAULT 0`.
    pub records_processed: i32,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl CollectionRunRow {
    /// A freshly created run in `queued` status.
    #[must_use]
    pub fn queued(id: i64, run_type: &str, trigger_source: &str, now: DateTime<Utc>) -> Self {
        Self {
            id,
            public_id: Uuid::new_v4(),
            run_type: run_type.to_owned(),
            trigger_source: trigger_source.to_owned(),
            status: RunStatus::Queued.as_str().to_owned(),
            started_at: None,
            completed_at: None,
            records_processed: 0,
            error_message: None,
            created_at: now,
        }
    }

    #[must_use]
    pub fn is(&self, status: RunStatus) -> bool {
        self.status == status.as_str()
    }
}
