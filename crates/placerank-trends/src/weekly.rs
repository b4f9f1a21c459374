use std::collections::BTreeMap;

use chrono::{Days, NaiveDate};
use placerank_core::Trend;
use placerank_db::{DbError, RankStore, SnapshotRow};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeywordTrend {
    pub keyword: String,
    /// Observed ranks in capture order.
    pub ranks: Vec<i32>,
    pub dates: Vec<NaiveDate>,
    pub best_rank: i32,
    pub worst_rank: i32,
    /// `None` when the keyword was observed only once in the window.
    pub trend: Option<Trend>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TrendSummary {
    pub total_keywords: usize,
    pub improved: usize,
    pub declined: usize,
    pub stable: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeeklyReport {
    pub entity_id: String,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub keywords: Vec<KeywordTrend>,
    pub summary: TrendSummary,
}

/// Compares the first and last rank of a series. Needs two observations.
#[must_use]
pub fn classify(ranks: &[i32]) -> Option<Trend> {
    if ranks.len() < 2 {
        return None;
    }
    let (first, last) = (ranks[0], ranks[ranks.len() - 1]);
    Some(match last.cmp(&first) {
        std::cmp::Ordering::Less => Trend::Improved,
        std::cmp::Ordering::Greater => Trend::Declined,
        std::cmp::Ordering::Equal => Trend::Stable,
    })
}

/// Groups `rows` by keyword and classifies each group. Rows are expected in
/// capture order, as returned by [`RankStore::snapshots_for_entity`].
#[must_use]
pub fn build_weekly_report(
    entity_id: &str,
    period_start: NaiveDate,
    period_end: NaiveDate,
    rows: &[SnapshotRow],
) -> WeeklyReport {
    let mut groups: BTreeMap<&str, Vec<&SnapshotRow>> = BTreeMap::new();
    for row in rows {
        groups.entry(row.keyword.as_str()).or_default().push(row);
    }

    let mut summary = TrendSummary::default();
    let keywords: Vec<KeywordTrend> = groups
        .into_iter()
        .filter_map(|(keyword, mut group)| {
            group.sort_by_key(|r| (r.search_date, r.search_time));
            let ranks: Vec<i32> = group.iter().map(|r| r.rank).collect();
            let best_rank = ranks.iter().copied().min()?;
            let worst_rank = ranks.iter().copied().max()?;
            let trend = classify(&ranks);
            match trend {
                Some(Trend::Improved) => summary.improved += 1,
                Some(Trend::Declined) => summary.declined += 1,
                Some(Trend::Stable) => summary.stable += 1,
                None => {}
            }
            Some(KeywordTrend {
                keyword: keyword.to_owned(),
                dates: group.iter().map(|r| r.search_date).collect(),
                ranks,
                best_rank,
                worst_rank,
                trend,
            })
        })
        .collect();
    summary.total_keywords = summary.improved + summary.declined + summary.stable;

    WeeklyReport {
        entity_id: entity_id.to_owned(),
        period_start,
        period_end,
        keywords,
        summary,
    }
}

/// Report over `[today - window_days, today]`. A window reaching past the
/// earliest representable date starts at [`NaiveDate::MIN`].
///
/// # Errors
///
/// Returns [`DbError`] if the snapshot read fails.
pub async fn weekly_report<S: RankStore + ?Sized>(
    store: &S,
    entity_id: &str,
    window_days: u32,
    today: NaiveDate,
) -> Result<WeeklyReport, DbError> {
    let period_start = today
        .checked_sub_days(Days::new(u64::from(window_days)))
        .unwrap_or(NaiveDate::MIN);
    let rows = store
        .snapshots_for_entity(entity_id, period_start, today)
        .await?;
    tracing::debug!(entity_id, rows = rows.len(), "building weekly report");
    Ok(build_weekly_report(entity_id, period_start, today, &rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_compares_first_and_last() {
        assert_eq!(classify(&[5, 3, 1]), Some(Trend::Improved));
        assert_eq!(classify(&[1, 3, 5]), Some(Trend::Declined));
        assert_eq!(classify(&[3, 3, 3]), Some(Trend::Stable));
        assert_eq!(classify(&[4, 1, 4]), Some(Trend::Stable));
    }

    #[test]
    fn single_observation_is_unclassified() {
        assert_eq!(classify(&[2]), None);
        assert_eq!(classify(&[]), None);
    }
}
