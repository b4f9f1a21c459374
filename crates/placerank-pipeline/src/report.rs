//! Structured per-run report, serialisable for logs and the CLI.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use placerank_core::RankedEntry;
use placerank_db::{SnapshotUpsertSummary, UpsertSummary};
use placerank_scraper::StopReason;
use placerank_trends::EntityStanding;
use serde::Serialize;

use crate::context::Trigger;

/// Entries kept per keyword in the report's top list.
pub const TOP_LIST_LEN: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunOutcome {
    Succeeded,
    Failed,
}

/// A unit of work that did not complete, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedUnit {
    pub unit: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CollectionSummary {
    pub collected: usize,
    pub pages_fetched: usize,
    pub from_options: usize,
    pub stop_reason: StopReason,
    pub entities: UpsertSummary,
    /// `None` when reconciliation did not run.
    pub deactivated: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopEntry {
    pub rank: i32,
    pub entity_id: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct KeywordReport {
    pub keyword: String,
    pub captured: usize,
    pub entities_created: usize,
    pub snapshots: SnapshotUpsertSummary,
    pub top: Vec<TopEntry>,
}

impl KeywordReport {
    #[must_use]
    pub fn new(
        keyword: &str,
        entries: &[RankedEntry],
        entities_created: usize,
        snapshots: SnapshotUpsertSummary,
    ) -> Self {
        Self {
            keyword: keyword.to_owned(),
            captured: entries.len(),
            entities_created,
            snapshots,
            top: entries
                .iter()
                .take(TOP_LIST_LEN)
                .map(|e| TopEntry {
                    rank: e.rank,
                    entity_id: e.entity_id.clone(),
                    name: e.name.clone(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Option<i64>,
    pub trigger: Trigger,
    pub outcome: RunOutcome,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub search_date: NaiveDate,
    pub search_time: NaiveTime,
    pub collection: Option<CollectionSummary>,
    pub keywords: Vec<KeywordReport>,
    pub skipped: Vec<SkippedUnit>,
    pub own_entity: Vec<EntityStanding>,
    pub aborted: bool,
    /// Set when the run could not proceed at all.
    pub error: Option<String>,
}

impl RunReport {
    #[must_use]
    pub fn new(trigger: Trigger, search_date: NaiveDate, search_time: NaiveTime) -> Self {
        Self {
            run_id: None,
            trigger,
            outcome: RunOutcome::Succeeded,
            started_at: Utc::now(),
            finished_at: None,
            search_date,
            search_time,
            collection: None,
            keywords: Vec::new(),
            skipped: Vec::new(),
            own_entity: Vec::new(),
            aborted: false,
            error: None,
        }
    }

    pub fn skip(&mut self, unit: impl Into<String>, reason: impl std::fmt::Display) {
        self.skipped.push(SkippedUnit {
            unit: unit.into(),
            reason: reason.to_string(),
        });
    }

    pub fn fail(&mut self, reason: impl std::fmt::Display) {
        self.outcome = RunOutcome::Failed;
        self.error = Some(reason.to_string());
    }

    #[must_use]
    pub fn entities_upserted(&self) -> usize {
        self.collection.as_ref().map_or(0, |c| c.entities.upserted)
    }

    #[must_use]
    pub fn snapshots_stored(&self) -> usize {
        self.keywords.iter().map(|k| k.snapshots.upserted).sum()
    }

    /// Rows that were attempted but not written, across entities and snapshots.
    #[must_use]
    pub fn rows_failed(&self) -> usize {
        let entity_failures = self.collection.as_ref().map_or(0, |c| c.entities.failed.len());
        let snapshot_failures: usize = self
            .keywords
            .iter()
            .map(|k| k.snapshots.failed.len() + k.snapshots.unresolved.len())
            .sum();
        entity_failures + snapshot_failures
    }

    #[must_use]
    pub fn records_processed(&self) -> i32 {
        i32::try_from(self.entities_upserted() + self.snapshots_stored()).unwrap_or(i32::MAX)
    }
}
