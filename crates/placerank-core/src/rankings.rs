use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::entities::NumericFields;

/// One row of a keyword result list, as extracted by the snapshot engine.
///
/// `rank` is the 1-based ordinal among contributing rows. `entity_id` is
/// `None` when the row carried no resolvable detail-page link; persistence
/// then resolves the entity by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedEntry {
    pub rank: i32,
    pub entity_id: Option<String>,
    pub name: String,
    pub numeric: NumericFields,
}

/// One observed rank for one listing under one keyword at one point in time.
///
/// Keyed by `(search_date, search_time, keyword, entity_id)` once the entity
/// has been resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankingSnapshot {
    pub search_date: NaiveDate,
    pub search_time: NaiveTime,
    pub keyword: String,
    pub entity_id: Option<String>,
    pub entity_name: String,
    pub rank: i32,
    pub numeric: NumericFields,
}

impl RankingSnapshot {
    #[must_use]
    pub fn from_entry(
        entry: &RankedEntry,
        keyword: &str,
        search_date: NaiveDate,
        search_time: NaiveTime,
    ) -> Self {
        Self {
            search_date,
            search_time,
            keyword: keyword.to_owned(),
            entity_id: entry.entity_id.clone(),
            entity_name: entry.name.clone(),
            rank: entry.rank,
            numeric: entry.numeric.clone(),
        }
    }
}

/// Direction of a listing's rank over a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Improved,
    Declined,
    Stable,
}

impl std::fmt::Display for Trend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Trend::Improved => write!(f, "improved"),
            Trend::Declined => write!(f, "declined"),
            Trend::Stable => write!(f, "stable"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trend_serializes_lowercase() {
        let json = serde_json::to_string(&Trend::Improved).unwrap();
        assert_eq!(json, "\"improved\"");
        assert_eq!(Trend::Declined.to_string(), "declined");
    }

    #[test]
    fn snapshot_from_entry_copies_rank_and_identity() {
        let entry = RankedEntry {
            rank: 3,
            entity_id: Some("77".to_owned()),
            name: "교촌치킨 강남역점".to_owned(),
            numeric: NumericFields::default(),
        };
        let date = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
        let time = NaiveTime::from_hms_opt(6, 0, 0).unwrap();
        let snapshot = RankingSnapshot::from_entry(&entry, "강남 치킨", date, time);

        assert_eq!(snapshot.rank, 3);
        assert_eq!(snapshot.entity_id.as_deref(), Some("77"));
        assert_eq!(snapshot.keyword, "강남 치킨");
        assert_eq!(snapshot.search_date, date);
    }
}
