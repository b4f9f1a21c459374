//! Batch persistence semantics, exercised against the in-memory store.
//! These tests do not require a live database connection.

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveTime};
use placerank_core::{Entity, NumericFields, RankedEntry, RankingSnapshot};
use placerank_db::{
    ensure_entities, reconcile_active_entities, upsert_entities, upsert_snapshots, DbError,
    EntityRow, MemoryRankStore, RankStore,
};

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
}

fn morning() -> NaiveTime {
    NaiveTime::from_hms_opt(6, 0, 0).unwrap()
}

fn entity(id: &str, name: &str) -> Entity {
    Entity {
        entity_id: id.to_owned(),
        name: name.to_owned(),
        category: Some("치킨".to_owned()),
        address: Some("서울 강남구".to_owned()),
        phone: None,
        source_url: format!("https://m.place.naver.com/restaurant/{id}"),
        numeric: NumericFields {
            blog_count: Some(1_204),
            ..NumericFields::default()
        },
    }
}

fn snapshot(keyword: &str, id: Option<&str>, name: &str, rank: i32) -> RankingSnapshot {
    RankingSnapshot {
        search_date: date(),
        search_time: morning(),
        keyword: keyword.to_owned(),
        entity_id: id.map(str::to_owned),
        entity_name: name.to_owned(),
        rank,
        numeric: NumericFields::default(),
    }
}

/// Entity rows without the refresh timestamp, which changes on every write.
fn entity_state(store: &MemoryRankStore) -> Vec<EntityRow> {
    store
        .entities()
        .into_iter()
        .map(|mut row| {
            row.updated_at = chrono::DateTime::<chrono::Utc>::UNIX_EPOCH;
            row
        })
        .collect()
}

#[tokio::test]
async fn repeated_entity_batch_leaves_identical_state() {
    let store = MemoryRankStore::new();
    let batch = vec![entity("1", "교촌치킨"), entity("2", "BBQ치킨"), entity("3", "BHC")];

    let first = upsert_entities(&store, &batch).await;
    let after_first = entity_state(&store);
    let second = upsert_entities(&store, &batch).await;
    let after_second = entity_state(&store);

    assert_eq!(first.upserted, 3);
    assert_eq!(second.upserted, 3);
    assert_eq!(after_first, after_second);
    assert_eq!(after_second.len(), 3);
}

#[tokio::test]
async fn reharvest_overwrites_attributes_without_duplicating() {
    let store = MemoryRankStore::new();
    upsert_entities(&store, &[entity("1", "교촌치킨 강남점")]).await;

    let mut renamed = entity("1", "교촌치킨 강남역점");
    renamed.numeric.blog_count = Some(2_000);
    upsert_entities(&store, &[renamed]).await;

    let rows = store.entities();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].name, "교촌치킨 강남역점");
    assert_eq!(rows[0].numeric.blog_count, Some(2_000));
    assert!(rows[0].is_active);
}

#[tokio::test]
async fn failed_row_does_not_lose_other_writes() {
    let store = MemoryRankStore::new();
    store.reject_writes_for("2");

    let summary = upsert_entities(
        &store,
        &[entity("1", "가"), entity("2", "나"), entity("3", "다")],
    )
    .await;

    assert_eq!(summary.attempted, 3);
    assert_eq!(summary.upserted, 2);
    assert_eq!(summary.failed.len(), 1);
    assert_eq!(summary.failed[0].key, "2");
    let ids: Vec<String> = store.entities().into_iter().map(|r| r.entity_id).collect();
    assert_eq!(ids, vec!["1", "3"]);
}

#[tokio::test]
async fn entity_without_id_is_reported_not_written() {
    let store = MemoryRankStore::new();
    let summary = upsert_entities(&store, &[entity("  ", "이름만")]).await;

    assert_eq!(summary.upserted, 0);
    assert_eq!(summary.failed[0].reason, "missing entity_id");
    assert!(store.entities().is_empty());
}

#[tokio::test]
async fn snapshots_resolve_by_name_and_drop_unknown_entities() {
    let store = MemoryRankStore::new();
    upsert_entities(&store, &[entity("1", "교촌치킨"), entity("2", "BBQ치킨")]).await;

    let summary = upsert_snapshots(
        &store,
        &[
            snapshot("강남 치킨", Some("1"), "교촌치킨", 1),
            snapshot("강남 치킨", None, "BBQ치킨", 2),
            snapshot("강남 치킨", None, "처음 보는 가게", 3),
            snapshot("강남 치킨", Some("999"), "사라진 가게", 4),
        ],
    )
    .await;

    assert_eq!(summary.attempted, 4);
    assert_eq!(summary.upserted, 2);
    assert_eq!(summary.unresolved.len(), 2);
    assert!(summary.failed.is_empty());

    let stored = store.snapshots();
    let by_entity: BTreeMap<&str, i32> = stored
        .iter()
        .map(|s| (s.entity_id.as_str(), s.rank))
        .collect();
    assert_eq!(by_entity.get("1"), Some(&1));
    assert_eq!(by_entity.get("2"), Some(&2));
}

#[tokio::test]
async fn rerun_of_same_snapshot_batch_replaces_rows() {
    let store = MemoryRankStore::new();
    upsert_entities(&store, &[entity("1", "가"), entity("2", "나")]).await;
    let batch = vec![
        snapshot("강남 맛집", Some("1"), "가", 1),
        snapshot("강남 맛집", Some("2"), "나", 2),
    ];

    upsert_snapshots(&store, &batch).await;
    let once = store.snapshots();
    upsert_snapshots(&store, &batch).await;

    assert_eq!(store.snapshots(), once);
    assert_eq!(once.len(), 2);
}

#[tokio::test]
async fn ranks_in_each_partition_are_contiguous_from_one() {
    let store = MemoryRankStore::new();
    let ids: Vec<String> = (1..=12).map(|i| i.to_string()).collect();
    let entries: Vec<RankedEntry> = ids
        .iter()
        .zip(1..)
        .map(|(id, rank)| RankedEntry {
            rank,
            entity_id: Some(id.clone()),
            name: format!("가게 {id}"),
            numeric: NumericFields::default(),
        })
        .collect();

    let ensured = ensure_entities(&store, &entries).await;
    assert_eq!(ensured.upserted, 12);

    for keyword in ["강남 맛집", "서초 맛집"] {
        let snapshots: Vec<RankingSnapshot> = entries
            .iter()
            .take(if keyword == "강남 맛집" { 12 } else { 7 })
            .map(|e| RankingSnapshot::from_entry(e, keyword, date(), morning()))
            .collect();
        upsert_snapshots(&store, &snapshots).await;
    }

    let mut partitions: BTreeMap<(NaiveDate, String), Vec<i32>> = BTreeMap::new();
    for row in store.snapshots() {
        partitions
            .entry((row.search_date, row.keyword))
            .or_default()
            .push(row.rank);
    }
    assert_eq!(partitions.len(), 2);
    for ranks in partitions.values_mut() {
        ranks.sort_unstable();
        let expected: Vec<i32> = (1..).take(ranks.len()).collect();
        assert_eq!(*ranks, expected);
    }
}

fn stored_ranks(store: &MemoryRankStore) -> Vec<(String, i32)> {
    let mut ranks: Vec<(String, i32)> = store
        .snapshots()
        .into_iter()
        .map(|s| (s.entity_id, s.rank))
        .collect();
    ranks.sort_by_key(|(_, rank)| *rank);
    ranks
}

#[tokio::test]
async fn repeated_entity_in_one_ranking_keeps_first_rank() {
    let store = MemoryRankStore::new();
    upsert_entities(&store, &[entity("111", "가"), entity("222", "나")]).await;

    let summary = upsert_snapshots(
        &store,
        &[
            snapshot("강남 맛집", Some("111"), "가", 1),
            snapshot("강남 맛집", Some("222"), "나", 2),
            snapshot("강남 맛집", Some("111"), "가", 3),
        ],
    )
    .await;

    assert_eq!(summary.upserted, 2);
    assert_eq!(summary.duplicates.len(), 1);
    assert_eq!(summary.duplicates[0].key, "111");
    assert_eq!(
        stored_ranks(&store),
        vec![("111".to_owned(), 1), ("222".to_owned(), 2)]
    );
}

#[tokio::test]
async fn name_resolved_duplicate_closes_the_rank_gap() {
    let store = MemoryRankStore::new();
    upsert_entities(&store, &[entity("1", "교촌치킨"), entity("2", "BBQ치킨")]).await;

    let summary = upsert_snapshots(
        &store,
        &[
            snapshot("강남 치킨", None, "교촌치킨", 1),
            snapshot("강남 치킨", Some("1"), "교촌치킨", 2),
            snapshot("강남 치킨", Some("2"), "BBQ치킨", 3),
        ],
    )
    .await;

    assert_eq!(summary.upserted, 2);
    assert_eq!(summary.duplicates.len(), 1);
    assert_eq!(
        stored_ranks(&store),
        vec![("1".to_owned(), 1), ("2".to_owned(), 2)]
    );
}

#[tokio::test]
async fn ensure_entities_keeps_existing_attributes() {
    let store = MemoryRankStore::new();
    upsert_entities(&store, &[entity("1", "교촌치킨")]).await;

    let summary = ensure_entities(
        &store,
        &[
            RankedEntry {
                rank: 1,
                entity_id: Some("1".to_owned()),
                name: "교촌치킨".to_owned(),
                numeric: NumericFields::default(),
            },
            RankedEntry {
                rank: 2,
                entity_id: Some("5".to_owned()),
                name: "새 가게".to_owned(),
                numeric: NumericFields::default(),
            },
            RankedEntry {
                rank: 3,
                entity_id: None,
                name: "아이디 없음".to_owned(),
                numeric: NumericFields::default(),
            },
        ],
    )
    .await;

    assert_eq!(summary.upserted, 1);
    let existing = store.get_entity("1").await.unwrap().unwrap();
    assert_eq!(existing.category.as_deref(), Some("치킨"));
    assert_eq!(existing.numeric.blog_count, Some(1_204));
    assert!(store.entity_exists("5").await.unwrap());
}

#[tokio::test]
async fn reconcile_deactivates_entities_missing_from_harvest() {
    let store = MemoryRankStore::new();
    upsert_entities(
        &store,
        &[entity("1", "가"), entity("2", "나"), entity("3", "다")],
    )
    .await;

    let deactivated = reconcile_active_entities(&store, &["1".to_owned(), "3".to_owned()])
        .await
        .unwrap();

    assert_eq!(deactivated, 1);
    let inactive = store.get_entity("2").await.unwrap().unwrap();
    assert!(!inactive.is_active);

    // re-harvest reactivates
    upsert_entities(&store, &[entity("2", "나")]).await;
    assert!(store.get_entity("2").await.unwrap().unwrap().is_active);
}

#[tokio::test]
async fn reconcile_refuses_empty_harvest() {
    let store = MemoryRankStore::new();
    upsert_entities(&store, &[entity("1", "가")]).await;

    let result = reconcile_active_entities(&store, &[]).await;

    assert!(matches!(result, Err(DbError::EmptyActiveSet)));
    assert!(store.get_entity("1").await.unwrap().unwrap().is_active);
}

#[tokio::test]
async fn name_resolution_prefers_active_entity() {
    let store = MemoryRankStore::new();
    upsert_entities(&store, &[entity("old", "같은 이름")]).await;
    reconcile_active_entities(&store, &["other".to_owned()])
        .await
        .unwrap();
    upsert_entities(&store, &[entity("new", "같은 이름")]).await;

    let found = store.find_entity_id_by_name(" 같은 이름 ").await.unwrap();
    assert_eq!(found.as_deref(), Some("new"));
}
