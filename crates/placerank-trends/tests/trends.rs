//! Trend computations over an in-memory history.

use chrono::{Days, NaiveDate, NaiveTime};
use placerank_core::{Entity, NumericFields, Trend};
use placerank_db::{MemoryRankStore, RankStore, SnapshotRow};
use placerank_trends::{
    compare_competitors, daily_change, top_gainers, track_entity_by_name, weekly_report,
    DailyChange,
};

fn day(offset: u64) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 10).unwrap() + Days::new(offset)
}

fn at(hour: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, 0, 0).unwrap()
}

fn seed(store: &MemoryRankStore, date: NaiveDate, hour: u32, keyword: &str, id: &str, rank: i32) {
    store.seed_snapshot(SnapshotRow {
        search_date: date,
        search_time: at(hour),
        keyword: keyword.to_owned(),
        entity_id: id.to_owned(),
        entity_name: format!("가게 {id}"),
        rank,
        numeric: NumericFields::default(),
    });
}

async fn add_entity(store: &MemoryRankStore, id: &str, name: &str, category: &str) {
    let mut entity = Entity::minimal(id, name);
    entity.category = Some(category.to_owned());
    store.upsert_entity(&entity).await.unwrap();
}

#[tokio::test]
async fn daily_change_is_previous_minus_current() {
    let store = MemoryRankStore::new();
    seed(&store, day(0), 6, "강남 치킨", "1", 5);
    seed(&store, day(1), 6, "강남 치킨", "1", 2);

    let change = daily_change(&store, "강남 치킨", "1", day(1)).await.unwrap();

    assert_eq!(change, DailyChange::Delta(3));
}

#[tokio::test]
async fn daily_change_without_previous_day_is_new_entrant() {
    let store = MemoryRankStore::new();
    seed(&store, day(0), 6, "강남 치킨", "1", 5);
    seed(&store, day(2), 6, "강남 치킨", "1", 2);

    assert_eq!(
        daily_change(&store, "강남 치킨", "1", day(2)).await.unwrap(),
        DailyChange::NoPriorData
    );
    assert_eq!(
        daily_change(&store, "강남 치킨", "1", day(3)).await.unwrap(),
        DailyChange::NotRanked
    );
}

#[tokio::test]
async fn daily_change_uses_latest_capture_of_each_day() {
    let store = MemoryRankStore::new();
    seed(&store, day(0), 6, "강남 치킨", "1", 9);
    seed(&store, day(0), 18, "강남 치킨", "1", 7);
    seed(&store, day(1), 6, "강남 치킨", "1", 6);
    seed(&store, day(1), 18, "강남 치킨", "1", 4);

    let change = daily_change(&store, "강남 치킨", "1", day(1)).await.unwrap();

    assert_eq!(change, DailyChange::Delta(3));
}

#[tokio::test]
async fn weekly_report_classifies_each_keyword() {
    let store = MemoryRankStore::new();
    for (offset, (a, b, c)) in [(5, 1, 3), (3, 3, 3), (1, 5, 3)].into_iter().enumerate() {
        let date = day(offset as u64 + 1);
        seed(&store, date, 6, "강남 맛집", "1", a);
        seed(&store, date, 6, "서초 맛집", "1", b);
        seed(&store, date, 6, "송파 맛집", "1", c);
    }
    seed(&store, day(3), 6, "해운대 맛집", "1", 8);

    let report = weekly_report(&store, "1", 7, day(4)).await.unwrap();

    let trend_of = |kw: &str| {
        report
            .keywords
            .iter()
            .find(|k| k.keyword == kw)
            .map(|k| k.trend)
            .unwrap()
    };
    assert_eq!(trend_of("강남 맛집"), Some(Trend::Improved));
    assert_eq!(trend_of("서초 맛집"), Some(Trend::Declined));
    assert_eq!(trend_of("송파 맛집"), Some(Trend::Stable));
    assert_eq!(trend_of("해운대 맛집"), None);

    assert_eq!(report.keywords.len(), 4);
    assert_eq!(report.summary.total_keywords, 3);
    assert_eq!(report.summary.improved, 1);
    assert_eq!(report.summary.declined, 1);
    assert_eq!(report.summary.stable, 1);

    let gangnam = report.keywords.iter().find(|k| k.keyword == "강남 맛집").unwrap();
    assert_eq!(gangnam.ranks, vec![5, 3, 1]);
    assert_eq!(gangnam.best_rank, 1);
    assert_eq!(gangnam.worst_rank, 5);
    assert_eq!(report.period_start, day(4) - Days::new(7));
}

#[tokio::test]
async fn weekly_report_ignores_snapshots_outside_window() {
    let store = MemoryRankStore::new();
    seed(&store, day(0), 6, "강남 맛집", "1", 10);
    seed(&store, day(8), 6, "강남 맛집", "1", 4);
    seed(&store, day(9), 6, "강남 맛집", "1", 4);

    let report = weekly_report(&store, "1", 7, day(9)).await.unwrap();

    assert_eq!(report.keywords[0].ranks, vec![4, 4]);
    assert_eq!(report.keywords[0].trend, Some(Trend::Stable));
}

#[tokio::test]
async fn oversized_window_is_clamped_to_earliest_date() {
    let store = MemoryRankStore::new();
    seed(&store, day(0), 6, "강남 맛집", "1", 3);
    seed(&store, day(1), 6, "강남 맛집", "1", 2);

    let report = weekly_report(&store, "1", u32::MAX, day(1)).await.unwrap();

    assert_eq!(report.period_start, NaiveDate::MIN);
    assert_eq!(report.keywords[0].ranks, vec![3, 2]);
    assert_eq!(report.keywords[0].trend, Some(Trend::Improved));
}

#[tokio::test]
async fn competitors_share_category_and_lower_rank_wins() {
    let store = MemoryRankStore::new();
    add_entity(&store, "me", "우리 치킨", "치킨").await;
    add_entity(&store, "a", "경쟁 A", "치킨").await;
    add_entity(&store, "b", "경쟁 B", "치킨").await;
    add_entity(&store, "cafe", "카페", "카페").await;
    seed(&store, day(1), 6, "강남 치킨", "me", 3);
    seed(&store, day(1), 6, "강남 치킨", "a", 1);
    seed(&store, day(1), 6, "강남 치킨", "b", 7);
    seed(&store, day(1), 6, "강남 치킨", "cafe", 2);
    seed(&store, day(1), 6, "서초 맛집", "a", 1);

    let comparison = compare_competitors(&store, "me", &[], day(1), 10)
        .await
        .unwrap();

    assert_eq!(comparison.rows.len(), 2);
    let vs_a = comparison.rows.iter().find(|r| r.competitor_id == "a").unwrap();
    let vs_b = comparison.rows.iter().find(|r| r.competitor_id == "b").unwrap();
    assert!(!vs_a.we_win);
    assert!(vs_b.we_win);
    assert_eq!(comparison.wins, 1);
    assert_eq!(comparison.losses, 1);
}

#[tokio::test]
async fn top_gainers_lists_positive_moves_largest_first() {
    let store = MemoryRankStore::new();
    seed(&store, day(0), 6, "강남 맛집", "1", 10);
    seed(&store, day(0), 6, "강남 맛집", "2", 4);
    seed(&store, day(0), 6, "강남 맛집", "3", 2);
    seed(&store, day(1), 6, "강남 맛집", "1", 3);
    seed(&store, day(1), 6, "강남 맛집", "2", 2);
    seed(&store, day(1), 6, "강남 맛집", "3", 5);
    seed(&store, day(1), 6, "강남 맛집", "4", 1);

    let gainers = top_gainers(&store, day(1), 10).await.unwrap();

    let ids: Vec<(&str, i32)> = gainers
        .iter()
        .map(|g| (g.entity_id.as_str(), g.change))
        .collect();
    assert_eq!(ids, vec![("1", 7), ("2", 2)]);

    let limited = top_gainers(&store, day(1), 1).await.unwrap();
    assert_eq!(limited.len(), 1);
}

#[tokio::test]
async fn own_entity_is_tracked_by_name_fragment() {
    let store = MemoryRankStore::new();
    add_entity(&store, "1", "우리 치킨 강남점", "치킨").await;
    add_entity(&store, "2", "남의 치킨", "치킨").await;
    seed(&store, day(0), 6, "강남 치킨", "1", 6);
    seed(&store, day(1), 6, "강남 치킨", "1", 2);
    seed(&store, day(1), 6, "강남 맛집", "1", 9);
    seed(&store, day(1), 6, "강남 치킨", "2", 1);

    let standings = track_entity_by_name(&store, "우리 치킨", day(1)).await.unwrap();

    assert_eq!(standings.len(), 2);
    assert_eq!(standings[0].keyword, "강남 맛집");
    assert_eq!(standings[0].change, DailyChange::NoPriorData);
    assert_eq!(standings[1].keyword, "강남 치킨");
    assert_eq!(standings[1].change, DailyChange::Delta(4));
    assert_eq!(standings[1].change.marker(), "▲4");
}
