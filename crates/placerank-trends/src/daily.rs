use std::collections::HashMap;

use chrono::{Days, NaiveDate};
use placerank_db::{DbError, RankStore, SnapshotRow};
use serde::Serialize;

/// Day-over-day movement of one entity under one keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "change", rename_all = "snake_case")]
pub enum DailyChange {
    /// `previous_rank - current_rank`; positive means the entity moved up.
    Delta(i32),
    /// Ranked today but not on the previous day.
    NoPriorData,
    /// Not ranked on the requested day.
    NotRanked,
}

impl DailyChange {
    #[must_use]
    pub fn between(previous: Option<i32>, current: Option<i32>) -> Self {
        match (previous, current) {
            (_, None) => DailyChange::NotRanked,
            (None, Some(_)) => DailyChange::NoPriorData,
            (Some(prev), Some(cur)) => DailyChange::Delta(prev - cur),
        }
    }

    /// Short marker for report tables: `▲3`, `▼2`, `-`, `NEW`.
    #[must_use]
    pub fn marker(self) -> String {
        match self {
            DailyChange::Delta(d) if d > 0 => format!("▲{d}"),
            DailyChange::Delta(d) if d < 0 => format!("▼{}", d.unsigned_abs()),
            DailyChange::Delta(_) => "-".to_owned(),
            DailyChange::NoPriorData => "NEW".to_owned(),
            DailyChange::NotRanked => String::new(),
        }
    }
}

/// Rank per `(keyword, entity_id)` taken from the latest `search_time` among
/// `rows`. Callers pass rows from a single day.
#[must_use]
pub fn latest_ranks(rows: &[SnapshotRow]) -> HashMap<(&str, &str), &SnapshotRow> {
    let mut latest: HashMap<(&str, &str), &SnapshotRow> = HashMap::new();
    for row in rows {
        let key = (row.keyword.as_str(), row.entity_id.as_str());
        match latest.get(&key) {
            Some(seen) if seen.search_time >= row.search_time => {}
            _ => {
                latest.insert(key, row);
            }
        }
    }
    latest
}

fn rank_on(rows: &[SnapshotRow], keyword: &str, date: NaiveDate) -> Option<i32> {
    rows.iter()
        .filter(|r| r.keyword == keyword && r.search_date == date)
        .max_by_key(|r| r.search_time)
        .map(|r| r.rank)
}

/// Change for `(keyword, entity_id)` on `date` compared with the day before.
///
/// # Errors
///
/// Returns [`DbError`] if the snapshot read fails.
pub async fn daily_change<S: RankStore + ?Sized>(
    store: &S,
    keyword: &str,
    entity_id: &str,
    date: NaiveDate,
) -> Result<DailyChange, DbError> {
    let previous_day = date - Days::new(1);
    let rows = store
        .snapshots_for_entity(entity_id, previous_day, date)
        .await?;

    Ok(DailyChange::between(
        rank_on(&rows, keyword, previous_day),
        rank_on(&rows, keyword, date),
    ))
}
