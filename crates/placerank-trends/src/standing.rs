use chrono::{Days, NaiveDate};
use placerank_db::{DbError, RankStore};
use serde::Serialize;

use crate::daily::{latest_ranks, DailyChange};

/// Where one of our listings stands under one keyword on a given day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityStanding {
    pub entity_id: String,
    pub name: String,
    pub keyword: String,
    pub rank: i32,
    pub change: DailyChange,
}

/// Today's ranks for every active entity whose name contains `name`, each
/// with its change since the day before. Ordered by keyword then rank.
///
/// # Errors
///
/// Returns [`DbError`] if a read fails.
pub async fn track_entity_by_name<S: RankStore + ?Sized>(
    store: &S,
    name: &str,
    date: NaiveDate,
) -> Result<Vec<EntityStanding>, DbError> {
    let matches = store.search_entities_by_name(name).await?;
    if matches.is_empty() {
        tracing::info!(name, "no tracked entity matches name");
        return Ok(Vec::new());
    }

    let today_rows = store.snapshots_on_date(date).await?;
    let yesterday_rows = store.snapshots_on_date(date - Days::new(1)).await?;
    let today = latest_ranks(&today_rows);
    let yesterday = latest_ranks(&yesterday_rows);

    let mut standings: Vec<EntityStanding> = today
        .iter()
        .filter(|((_, id), _)| matches.iter().any(|m| m.entity_id == *id))
        .map(|(key, row)| EntityStanding {
            entity_id: row.entity_id.clone(),
            name: row.entity_name.clone(),
            keyword: row.keyword.clone(),
            rank: row.rank,
            change: DailyChange::between(yesterday.get(key).map(|r| r.rank), Some(row.rank)),
        })
        .collect();

    standings.sort_by(|a, b| {
        a.keyword
            .cmp(&b.keyword)
            .then(a.rank.cmp(&b.rank))
            .then(a.entity_id.cmp(&b.entity_id))
    });
    Ok(standings)
}
