//! Batch writes over a [`RankStore`].
//!
//! Every row is written independently: a failed row is logged and reported
//! in the summary while the rest of the batch continues.

use std::collections::{HashMap, HashSet};

use chrono::{NaiveDate, NaiveTime};
use placerank_core::{Entity, RankedEntry, RankingSnapshot};
use serde::Serialize;

use crate::rows::SnapshotRow;
use crate::store::RankStore;
use crate::DbError;

/// One row that could not be written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowFailure {
    /// `entity_id`, or the entity name when no id was available.
    pub key: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UpsertSummary {
    pub attempted: usize,
    pub upserted: usize,
    pub failed: Vec<RowFailure>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SnapshotUpsertSummary {
    pub attempted: usize,
    pub upserted: usize,
    /// Snapshots dropped because their entity could not be resolved.
    pub unresolved: Vec<RowFailure>,
    /// Snapshots dropped because an earlier rank in the same partition
    /// already resolved to their entity.
    pub duplicates: Vec<RowFailure>,
    pub failed: Vec<RowFailure>,
}

type Partition = (NaiveDate, NaiveTime, String);

/// Upserts each entity, marking it active.
///
/// Entities missing from `entities` are left untouched; see
/// [`reconcile_active_entities`].
pub async fn upsert_entities<S: RankStore + ?Sized>(
    store: &S,
    entities: &[Entity],
) -> UpsertSummary {
    let mut summary = UpsertSummary {
        attempted: entities.len(),
        ..UpsertSummary::default()
    };

    for entity in entities {
        if entity.entity_id.trim().is_empty() {
            tracing::warn!(name = %entity.name, "skipping entity without entity_id");
            summary.failed.push(RowFailure {
                key: entity.name.clone(),
                reason: "missing entity_id".to_owned(),
            });
            continue;
        }
        match store.upsert_entity(entity).await {
            Ok(()) => summary.upserted += 1,
            Err(e) => {
                tracing::error!(entity_id = %entity.entity_id, error = %e, "entity upsert failed");
                summary.failed.push(RowFailure {
                    key: entity.entity_id.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    summary
}

/// Inserts name-only entities for ranked entries whose id is not stored yet,
/// so their snapshots can be written. Existing entities are not touched.
pub async fn ensure_entities<S: RankStore + ?Sized>(
    store: &S,
    entries: &[RankedEntry],
) -> UpsertSummary {
    let mut missing: Vec<Entity> = Vec::new();
    for entry in entries {
        let Some(id) = entry.entity_id.as_deref() else {
            continue;
        };
        if missing.iter().any(|e| e.entity_id == id) {
            continue;
        }
        match store.entity_exists(id).await {
            Ok(true) => {}
            Ok(false) => missing.push(Entity::minimal(id, &entry.name)),
            Err(e) => {
                tracing::warn!(entity_id = id, error = %e, "entity lookup failed");
            }
        }
    }
    upsert_entities(store, &missing).await
}

/// Upserts each snapshot after resolving its entity.
///
/// A snapshot carrying an `entity_id` is written only if that entity exists;
/// one without an id is matched by exact entity name. Unresolvable snapshots
/// are dropped and reported, as are later ranks that resolve to an entity
/// already placed in the same `(date, time, keyword)` partition. Ranks of
/// the remaining rows are renumbered in order within their partition so the
/// stored ranks run `1..N` without gaps.
pub async fn upsert_snapshots<S: RankStore + ?Sized>(
    store: &S,
    snapshots: &[RankingSnapshot],
) -> SnapshotUpsertSummary {
    let mut summary = SnapshotUpsertSummary {
        attempted: snapshots.len(),
        ..SnapshotUpsertSummary::default()
    };

    let mut ordered: Vec<&RankingSnapshot> = snapshots.iter().collect();
    ordered.sort_by_key(|s| s.rank);

    let mut placed: HashSet<(Partition, String)> = HashSet::new();
    let mut next_rank: HashMap<Partition, i32> = HashMap::new();

    for snapshot in ordered {
        let key = snapshot
            .entity_id
            .clone()
            .unwrap_or_else(|| snapshot.entity_name.clone());

        let entity_id = match resolve_entity_id(store, snapshot).await {
            Ok(Some(id)) => id,
            Ok(None) => {
                tracing::warn!(
                    keyword = %snapshot.keyword,
                    entity = %key,
                    rank = snapshot.rank,
                    "dropping snapshot for unresolved entity"
                );
                summary.unresolved.push(RowFailure {
                    key,
                    reason: "entity not found".to_owned(),
                });
                continue;
            }
            Err(e) => {
                tracing::error!(keyword = %snapshot.keyword, entity = %key, error = %e, "entity resolution failed");
                summary.failed.push(RowFailure {
                    key,
                    reason: e.to_string(),
                });
                continue;
            }
        };

        let partition: Partition = (
            snapshot.search_date,
            snapshot.search_time,
            snapshot.keyword.clone(),
        );
        if !placed.insert((partition.clone(), entity_id.clone())) {
            tracing::warn!(
                keyword = %snapshot.keyword,
                entity_id = %entity_id,
                rank = snapshot.rank,
                "dropping repeated entity within one ranking"
            );
            summary.duplicates.push(RowFailure {
                key: entity_id,
                reason: "entity already ranked higher in this partition".to_owned(),
            });
            continue;
        }

        let rank = next_rank.entry(partition).or_insert(0);
        *rank += 1;

        let row = SnapshotRow {
            search_date: snapshot.search_date,
            search_time: snapshot.search_time,
            keyword: snapshot.keyword.clone(),
            entity_id,
            entity_name: snapshot.entity_name.clone(),
            rank: *rank,
            numeric: snapshot.numeric.clone(),
        };
        match store.upsert_snapshot(&row).await {
            Ok(()) => summary.upserted += 1,
            Err(e) => {
                tracing::error!(
                    keyword = %row.keyword,
                    entity_id = %row.entity_id,
                    error = %e,
                    "snapshot upsert failed"
                );
                summary.failed.push(RowFailure {
                    key: row.entity_id,
                    reason: e.to_string(),
                });
            }
        }
    }

    summary
}

async fn resolve_entity_id<S: RankStore + ?Sized>(
    store: &S,
    snapshot: &RankingSnapshot,
) -> Result<Option<String>, DbError> {
    let direct = snapshot
        .entity_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty());

    match direct {
        Some(id) if store.entity_exists(id).await? => Ok(Some(id.to_owned())),
        Some(_) => Ok(None),
        None => store.find_entity_id_by_name(&snapshot.entity_name).await,
    }
}

/// Deactivates every active entity absent from `active_ids`, the complete
/// result of the latest harvest.
///
/// # Errors
///
/// Returns [`DbError::EmptyActiveSet`] when `active_ids` is empty, since an
/// empty harvest would otherwise deactivate everything.
pub async fn reconcile_active_entities<S: RankStore + ?Sized>(
    store: &S,
    active_ids: &[String],
) -> Result<u64, DbError> {
    if active_ids.is_empty() {
        return Err(DbError::EmptyActiveSet);
    }
    let deactivated = store.deactivate_entities_except(active_ids).await?;
    tracing::info!(
        kept = active_ids.len(),
        deactivated,
        "reconciled active entities"
    );
    Ok(deactivated)
}
