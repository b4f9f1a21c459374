//! Head-to-head comparison with listings in the same category.

use chrono::NaiveDate;
use placerank_db::{DbError, RankStore};
use serde::Serialize;

use crate::daily::latest_ranks;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompetitorRow {
    pub keyword: String,
    pub competitor_id: String,
    pub competitor_name: String,
    pub our_rank: i32,
    pub competitor_rank: i32,
    pub we_win: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompetitorComparison {
    pub entity_id: String,
    pub category: Option<String>,
    pub date: NaiveDate,
    pub rows: Vec<CompetitorRow>,
    pub wins: usize,
    pub losses: usize,
}

/// Whether our rank beats theirs. Rank 1 is the top of the list.
#[must_use]
pub fn we_win(our_rank: i32, competitor_rank: i32) -> bool {
    our_rank < competitor_rank
}

/// Compares `our_entity_id` with up to `limit` active entities sharing its
/// category, one row per keyword on which both were ranked on `date`.
///
/// An empty `keywords` slice means every keyword we were ranked under.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the entity does not exist, or another
/// [`DbError`] if a read fails.
pub async fn compare_competitors<S: RankStore + ?Sized>(
    store: &S,
    our_entity_id: &str,
    keywords: &[String],
    date: NaiveDate,
    limit: usize,
) -> Result<CompetitorComparison, DbError> {
    let ours = store
        .get_entity(our_entity_id)
        .await?
        .ok_or(DbError::NotFound)?;

    let mut comparison = CompetitorComparison {
        entity_id: ours.entity_id.clone(),
        category: ours.category.clone(),
        date,
        rows: Vec::new(),
        wins: 0,
        losses: 0,
    };
    let Some(category) = ours.category.as_deref() else {
        tracing::info!(entity_id = our_entity_id, "entity has no category; nothing to compare");
        return Ok(comparison);
    };

    let competitors = store
        .list_entities_in_category(category, our_entity_id, limit)
        .await?;
    let day = store.snapshots_on_date(date).await?;
    let ranks = latest_ranks(&day);

    let mut our_keywords: Vec<&str> = ranks
        .keys()
        .filter(|(_, id)| *id == our_entity_id)
        .map(|(kw, _)| *kw)
        .filter(|kw| keywords.is_empty() || keywords.iter().any(|k| k == kw))
        .collect();
    our_keywords.sort_unstable();

    for keyword in our_keywords {
        let Some(our_row) = ranks.get(&(keyword, our_entity_id)) else {
            continue;
        };
        for competitor in &competitors {
            let Some(their_row) = ranks.get(&(keyword, competitor.entity_id.as_str())) else {
                continue;
            };
            let win = we_win(our_row.rank, their_row.rank);
            if win {
                comparison.wins += 1;
            } else {
                comparison.losses += 1;
            }
            comparison.rows.push(CompetitorRow {
                keyword: keyword.to_owned(),
                competitor_id: competitor.entity_id.clone(),
                competitor_name: competitor.name.clone(),
                our_rank: our_row.rank,
                competitor_rank: their_row.rank,
                we_win: win,
            });
        }
    }

    Ok(comparison)
}
