//! In-process [`RankStore`] used by tests and dry runs.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime, Utc};
use placerank_core::Entity;

use crate::collection_runs::{CollectionRunRow, RunStatus};
use crate::news::{NewNewsArticle, NewsArticleRow};
use crate::rows::{EntityRow, SnapshotRow};
use crate::store::RankStore;
use crate::DbError;

type SnapshotKey = (NaiveDate, NaiveTime, String, String);

#[derive(Debug, Default)]
struct State {
    entities: BTreeMap<String, EntityRow>,
    snapshots: BTreeMap<SnapshotKey, SnapshotRow>,
    news: Vec<NewsArticleRow>,
    runs: BTreeMap<i64, CollectionRunRow>,
    rejected_ids: HashSet<String>,
}

#[derive(Debug, Default)]
pub struct MemoryRankStore {
    state: Mutex<State>,
}

impl MemoryRankStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Makes every later write touching `entity_id` fail with
    /// [`DbError::Rejected`], simulating a store that refuses one row.
    pub fn reject_writes_for(&self, entity_id: &str) {
        self.lock().rejected_ids.insert(entity_id.to_owned());
    }

    /// All entity rows ordered by `entity_id`.
    #[must_use]
    pub fn entities(&self) -> Vec<EntityRow> {
        self.lock().entities.values().cloned().collect()
    }

    /// All snapshot rows ordered by key.
    #[must_use]
    pub fn snapshots(&self) -> Vec<SnapshotRow> {
        self.lock().snapshots.values().cloned().collect()
    }

    #[must_use]
    pub fn news_articles(&self) -> Vec<NewsArticleRow> {
        self.lock().news.clone()
    }

    #[must_use]
    pub fn runs(&self) -> Vec<CollectionRunRow> {
        self.lock().runs.values().cloned().collect()
    }

    /// Inserts a snapshot row directly, bypassing entity checks. For seeding
    /// trend fixtures.
    pub fn seed_snapshot(&self, snapshot: SnapshotRow) {
        let key = snapshot_key(&snapshot);
        self.lock().snapshots.insert(key, snapshot);
    }

    fn transition(
        &self,
        id: i64,
        from: RunStatus,
        apply: impl FnOnce(&mut CollectionRunRow),
    ) -> Result<(), DbError> {
        let mut state = self.lock();
        match state.runs.get_mut(&id) {
            Some(run) if run.is(from) => {
                apply(run);
                Ok(())
            }
            _ => Err(DbError::InvalidCollectionRunTransition {
                id,
                expected_status: from.as_str(),
            }),
        }
    }
}

fn snapshot_key(snapshot: &SnapshotRow) -> SnapshotKey {
    (
        snapshot.search_date,
        snapshot.search_time,
        snapshot.keyword.clone(),
        snapshot.entity_id.clone(),
    )
}

#[async_trait]
impl RankStore for MemoryRankStore {
    async fn upsert_entity(&self, entity: &Entity) -> Result<(), DbError> {
        let mut state = self.lock();
        if state.rejected_ids.contains(&entity.entity_id) {
            return Err(DbError::Rejected(format!("entity {}", entity.entity_id)));
        }
        state.entities.insert(
            entity.entity_id.clone(),
            EntityRow::from_entity(entity, Utc::now()),
        );
        Ok(())
    }

    async fn entity_exists(&self, entity_id: &str) -> Result<bool, DbError> {
        Ok(self.lock().entities.contains_key(entity_id))
    }

    async fn find_entity_id_by_name(&self, name: &str) -> Result<Option<String>, DbError> {
        let name = name.trim();
        let state = self.lock();
        let found = state
            .entities
            .values()
            .filter(|row| row.name == name)
            .max_by_key(|row| (row.is_active, row.updated_at))
            .map(|row| row.entity_id.clone());
        Ok(found)
    }

    async fn get_entity(&self, entity_id: &str) -> Result<Option<EntityRow>, DbError> {
        Ok(self.lock().entities.get(entity_id).cloned())
    }

    async fn search_entities_by_name(&self, fragment: &str) -> Result<Vec<EntityRow>, DbError> {
        let fragment = fragment.trim();
        let mut rows: Vec<EntityRow> = self
            .lock()
            .entities
            .values()
            .filter(|row| row.is_active && row.name.contains(fragment))
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name).then(a.entity_id.cmp(&b.entity_id)));
        Ok(rows)
    }

    async fn list_entities_in_category(
        &self,
        category: &str,
        exclude_id: &str,
        limit: usize,
    ) -> Result<Vec<EntityRow>, DbError> {
        let mut rows: Vec<EntityRow> = self
            .lock()
            .entities
            .values()
            .filter(|row| {
                row.is_active
                    && row.entity_id != exclude_id
                    && row.category.as_deref() == Some(category)
            })
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name).then(a.entity_id.cmp(&b.entity_id)));
        rows.truncate(limit);
        Ok(rows)
    }

    async fn deactivate_entities_except(&self, keep_ids: &[String]) -> Result<u64, DbError> {
        let keep: HashSet<&str> = keep_ids.iter().map(String::as_str).collect();
        let now = Utc::now();
        let mut changed = 0u64;
        for row in self.lock().entities.values_mut() {
            if row.is_active && !keep.contains(row.entity_id.as_str()) {
                row.is_active = false;
                row.updated_at = now;
                changed += 1;
            }
        }
        Ok(changed)
    }

    async fn upsert_snapshot(&self, snapshot: &SnapshotRow) -> Result<(), DbError> {
        let mut state = self.lock();
        if state.rejected_ids.contains(&snapshot.entity_id) {
            return Err(DbError::Rejected(format!(
                "snapshot for {}",
                snapshot.entity_id
            )));
        }
        if !state.entities.contains_key(&snapshot.entity_id) {
            return Err(DbError::UnknownEntity {
                entity_id: snapshot.entity_id.clone(),
            });
        }
        state
            .snapshots
            .insert(snapshot_key(snapshot), snapshot.clone());
        Ok(())
    }

    async fn snapshots_for_entity(
        &self,
        entity_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<SnapshotRow>, DbError> {
        let mut rows: Vec<SnapshotRow> = self
            .lock()
            .snapshots
            .values()
            .filter(|s| s.entity_id == entity_id && s.search_date >= from && s.search_date <= to)
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            (a.search_date, a.search_time, &a.keyword).cmp(&(
                b.search_date,
                b.search_time,
                &b.keyword,
            ))
        });
        Ok(rows)
    }

    async fn snapshots_on_date(&self, date: NaiveDate) -> Result<Vec<SnapshotRow>, DbError> {
        let mut rows: Vec<SnapshotRow> = self
            .lock()
            .snapshots
            .values()
            .filter(|s| s.search_date == date)
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            (&a.keyword, a.search_time, a.rank).cmp(&(&b.keyword, b.search_time, b.rank))
        });
        Ok(rows)
    }

    async fn existing_news_sources(
        &self,
        source_urls: &[String],
    ) -> Result<Vec<String>, DbError> {
        let state = self.lock();
        Ok(source_urls
            .iter()
            .filter(|url| state.news.iter().any(|n| &n.source_url == *url))
            .cloned()
            .collect())
    }

    async fn insert_news_article(&self, article: &NewNewsArticle) -> Result<bool, DbError> {
        let mut state = self.lock();
        if state
            .news
            .iter()
            .any(|n| n.source_url == article.source_url)
        {
            return Ok(false);
        }
        let id = i64::try_from(state.news.len()).unwrap_or(i64::MAX) + 1;
        state.news.push(NewsArticleRow {
            id,
            title: article.title.clone(),
            content: article.content.clone(),
            category: article.category.clone(),
            image_url: article.image_url.clone(),
            source_url: article.source_url.clone(),
            author: article.author.clone(),
            is_featured: article.is_featured,
            created_at: Utc::now(),
        });
        Ok(true)
    }

    async fn create_run(
        &self,
        run_type: &str,
        trigger_source: &str,
    ) -> Result<CollectionRunRow, DbError> {
        let mut state = self.lock();
        let id = state.runs.keys().next_back().copied().unwrap_or(0) + 1;
        let row = CollectionRunRow::queued(id, run_type, trigger_source, Utc::now());
        state.runs.insert(id, row.clone());
        Ok(row)
    }

    async fn start_run(&self, id: i64) -> Result<(), DbError> {
        self.transition(id, RunStatus::Queued, |run| {
            run.status = RunStatus::Running.as_str().to_owned();
            run.started_at = Some(Utc::now());
        })
    }

    async fn complete_run(&self, id: i64, records_processed: i32) -> Result<(), DbError> {
        self.transition(id, RunStatus::Running, |run| {
            run.status = RunStatus::Succeeded.as_str().to_owned();
            run.completed_at = Some(Utc::now());
            run.records_processed = records_processed;
        })
    }

    async fn fail_run(&self, id: i64, error_message: &str) -> Result<(), DbError> {
        self.transition(id, RunStatus::Running, |run| {
            run.status = RunStatus::Failed.as_str().to_owned();
            run.completed_at = Some(Utc::now());
            run.error_message = Some(error_message.to_owned());
        })
    }

    async fn get_run(&self, id: i64) -> Result<CollectionRunRow, DbError> {
        self.lock().runs.get(&id).cloned().ok_or(DbError::NotFound)
    }
}
