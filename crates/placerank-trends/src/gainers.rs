use chrono::{Days, NaiveDate};
use placerank_db::{DbError, RankStore};
use serde::Serialize;

use crate::daily::latest_ranks;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Gainer {
    pub keyword: String,
    pub entity_id: String,
    pub entity_name: String,
    pub previous_rank: i32,
    pub current_rank: i32,
    pub change: i32,
}

/// Entities that moved up on `date` compared with the day before, largest
/// climb first, at most `limit` rows.
///
/// # Errors
///
/// Returns [`DbError`] if a snapshot read fails.
pub async fn top_gainers<S: RankStore + ?Sized>(
    store: &S,
    date: NaiveDate,
    limit: usize,
) -> Result<Vec<Gainer>, DbError> {
    let today_rows = store.snapshots_on_date(date).await?;
    let yesterday_rows = store.snapshots_on_date(date - Days::new(1)).await?;
    let today = latest_ranks(&today_rows);
    let yesterday = latest_ranks(&yesterday_rows);

    let mut gainers: Vec<Gainer> = today
        .iter()
        .filter_map(|(key, current)| {
            let previous = yesterday.get(key)?;
            let change = previous.rank - current.rank;
            (change > 0).then(|| Gainer {
                keyword: current.keyword.clone(),
                entity_id: current.entity_id.clone(),
                entity_name: current.entity_name.clone(),
                previous_rank: previous.rank,
                current_rank: current.rank,
                change,
            })
        })
        .collect();

    gainers.sort_by(|a, b| {
        b.change
            .cmp(&a.change)
            .then(a.current_rank.cmp(&b.current_rank))
            .then(a.keyword.cmp(&b.keyword))
            .then(a.entity_id.cmp(&b.entity_id))
    });
    gainers.truncate(limit);
    Ok(gainers)
}
