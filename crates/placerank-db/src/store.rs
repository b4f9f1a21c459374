//! Row-level storage primitives for entities, snapshots, news and runs.
//!
//! Implemented by [`crate::PgRankStore`] (postgres) and
//! [`crate::MemoryRankStore`] (tests, dry runs). Also implemented for
//! `Arc<S>` so a store can be shared with a scheduler job.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use placerank_core::Entity;

use crate::collection_runs::CollectionRunRow;
use crate::news::NewNewsArticle;
use crate::rows::{EntityRow, SnapshotRow};
use crate::DbError;

#[async_trait]
pub trait RankStore: Send + Sync {
    /// Insert-or-replace keyed by `entity_id`; sets `is_active` and refreshes
    /// `updated_at`.
    async fn upsert_entity(&self, entity: &Entity) -> Result<(), DbError>;

    async fn entity_exists(&self, entity_id: &str) -> Result<bool, DbError>;

    /// Exact name match; prefers active and most recently updated rows.
    async fn find_entity_id_by_name(&self, name: &str) -> Result<Option<String>, DbError>;

    async fn get_entity(&self, entity_id: &str) -> Result<Option<EntityRow>, DbError>;

    /// Active entities whose name contains `fragment`.
    async fn search_entities_by_name(&self, fragment: &str) -> Result<Vec<EntityRow>, DbError>;

    /// Active entities in `category`, excluding `exclude_id`, ordered by name.
    async fn list_entities_in_category(
        &self,
        category: &str,
        exclude_id: &str,
        limit: usize,
    ) -> Result<Vec<EntityRow>, DbError>;

    /// Marks every active entity not in `keep_ids` inactive. Returns the
    /// number of rows changed.
    async fn deactivate_entities_except(&self, keep_ids: &[String]) -> Result<u64, DbError>;

    /// Insert-or-replace keyed by `(search_date, search_time, keyword, entity_id)`.
    ///
    /// Fails with [`DbError::UnknownEntity`] when the entity does not exist.
    async fn upsert_snapshot(&self, snapshot: &SnapshotRow) -> Result<(), DbError>;

    /// Snapshots for one entity with `from <= search_date <= to`, ordered by
    /// date and time.
    async fn snapshots_for_entity(
        &self,
        entity_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<SnapshotRow>, DbError>;

    /// Every snapshot taken on `date`, ordered by keyword, time and rank.
    async fn snapshots_on_date(&self, date: NaiveDate) -> Result<Vec<SnapshotRow>, DbError>;

    /// The subset of `source_urls` already stored as news articles.
    async fn existing_news_sources(&self, source_urls: &[String])
        -> Result<Vec<String>, DbError>;

    /// Returns `false` when an article with the same `source_url` exists.
    async fn insert_news_article(&self, article: &NewNewsArticle) -> Result<bool, DbError>;

    async fn create_run(
        &self,
        run_type: &str,
        trigger_source: &str,
    ) -> Result<CollectionRunRow, DbError>;

    /// `queued -> running`.
    async fn start_run(&self, id: i64) -> Result<(), DbError>;

    /// `running -> succeeded`.
    async fn complete_run(&self, id: i64, records_processed: i32) -> Result<(), DbError>;

    /// `running -> failed`.
    async fn fail_run(&self, id: i64, error_message: &str) -> Result<(), DbError>;

    async fn get_run(&self, id: i64) -> Result<CollectionRunRow, DbError>;
}

#[async_trait]
impl<S: RankStore + ?Sized> RankStore for Arc<S> {
    async fn upsert_entity(&self, entity: &Entity) -> Result<(), DbError> {
        (**self).upsert_entity(entity).await
    }

    async fn entity_exists(&self, entity_id: &str) -> Result<bool, DbError> {
        (**self).entity_exists(entity_id).await
    }

    async fn find_entity_id_by_name(&self, name: &str) -> Result<Option<String>, DbError> {
        (**self).find_entity_id_by_name(name).await
    }

    async fn get_entity(&self, entity_id: &str) -> Result<Option<EntityRow>, DbError> {
        (**self).get_entity(entity_id).await
    }

    async fn search_entities_by_name(&self, fragment: &str) -> Result<Vec<EntityRow>, DbError> {
        (**self).search_entities_by_name(fragment).await
    }

    async fn list_entities_in_category(
        &self,
        category: &str,
        exclude_id: &str,
        limit: usize,
    ) -> Result<Vec<EntityRow>, DbError> {
        (**self)
            .list_entities_in_category(category, exclude_id, limit)
            .await
    }

    async fn deactivate_entities_except(&self, keep_ids: &[String]) -> Result<u64, DbError> {
        (**self).deactivate_entities_except(keep_ids).await
    }

    async fn upsert_snapshot(&self, snapshot: &SnapshotRow) -> Result<(), DbError> {
        (**self).upsert_snapshot(snapshot).await
    }

    async fn snapshots_for_entity(
        &self,
        entity_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<SnapshotRow>, DbError> {
        (**self).snapshots_for_entity(entity_id, from, to).await
    }

    async fn snapshots_on_date(&self, date: NaiveDate) -> Result<Vec<SnapshotRow>, DbError> {
        (**self).snapshots_on_date(date).await
    }

    async fn existing_news_sources(
        &self,
        source_urls: &[String],
    ) -> Result<Vec<String>, DbError> {
        (**self).existing_news_sources(source_urls).await
    }

    async fn insert_news_article(&self, article: &NewNewsArticle) -> Result<bool, DbError> {
        (**self).insert_news_article(article).await
    }

    async fn create_run(
        &self,
        run_type: &str,
        trigger_source: &str,
    ) -> Result<CollectionRunRow, DbError> {
        (**self).create_run(run_type, trigger_source).await
    }

    async fn start_run(&self, id: i64) -> Result<(), DbError> {
        (**self).start_run(id).await
    }

    async fn complete_run(&self, id: i64, records_processed: i32) -> Result<(), DbError> {
        (**self).complete_run(id, records_processed).await
    }

    async fn fail_run(&self, id: i64, error_message: &str) -> Result<(), DbError> {
        (**self).fail_run(id, error_message).await
    }

    async fn get_run(&self, id: i64) -> Result<CollectionRunRow, DbError> {
        (**self).get_run(id).await
    }
}
