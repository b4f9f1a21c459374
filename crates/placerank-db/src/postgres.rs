//! Postgres-backed [`RankStore`].

use async_trait::async_trait;
use chrono::NaiveDate;
use placerank_core::Entity;
use sqlx::PgPool;
use uuid::Uuid;

use crate::collection_runs::CollectionRunRow;
use crate::news::NewNewsArticle;
use crate::rows::{EntityRow, PgEntityRow, PgSnapshotRow, SnapshotRow};
use crate::store::RankStore;
use crate::DbError;

const ENTITY_COLUMNS: &str = "entity_id, name, category, address, phone, source_url, \
     blog_count, visitor_review_count, n1_score, n2_score, n3_score, is_active, updated_at";

const SNAPSHOT_COLUMNS: &str = "search_date, search_time, keyword, entity_id, entity_name, rank, \
     blog_count, visitor_review_count, n1_score, n2_score, n3_score";

const RUN_COLUMNS: &str = "id, public_id, run_type, trigger_source, status, \
     started_at, completed_at, records_processed, error_message, created_at";

const FOREIGN_KEY_VIOLATION: &str = "23503";

#[derive(Debug, Clone)]
pub struct PgRankStore {
    pool: PgPool,
}

impl PgRankStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn sql_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some(FOREIGN_KEY_VIOLATION))
}

#[async_trait]
impl RankStore for PgRankStore {
    async fn upsert_entity(&self, entity: &Entity) -> Result<(), DbError> {
        sqlx::query(
            "INSERT INTO entities \
                 (entity_id, name, category, address, phone, source_url, \
                  blog_count, visitor_review_count, n1_score, n2_score, n3_score, is_active) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, TRUE) \
             ON CONFLICT (entity_id) DO UPDATE SET \
                 name                 = EXCLUDED.name, \
                 category             = EXCLUDED.category, \
                 address              = EXCLUDED.address, \
                 phone                = EXCLUDED.phone, \
                 source_url           = EXCLUDED.source_url, \
                 blog_count           = EXCLUDED.blog_count, \
                 visitor_review_count = EXCLUDED.visitor_review_count, \
                 n1_score             = EXCLUDED.n1_score, \
                 n2_score             = EXCLUDED.n2_score, \
                 n3_score             = EXCLUDED.n3_score, \
                 is_active            = TRUE, \
                 updated_at           = NOW()",
        )
        .bind(&entity.entity_id)
        .bind(&entity.name)
        .bind(entity.category.as_deref())
        .bind(entity.address.as_deref())
        .bind(entity.phone.as_deref())
        .bind(&entity.source_url)
        .bind(entity.numeric.blog_count)
        .bind(entity.numeric.visitor_review_count)
        .bind(entity.numeric.n1_score)
        .bind(entity.numeric.n2_score)
        .bind(entity.numeric.n3_score)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn entity_exists(&self, entity_id: &str) -> Result<bool, DbError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM entities WHERE entity_id = $1)",
        )
        .bind(entity_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn find_entity_id_by_name(&self, name: &str) -> Result<Option<String>, DbError> {
        let id = sqlx::query_scalar::<_, String>(
            "SELECT entity_id FROM entities \
             WHERE name = $1 \
             ORDER BY is_active DESC, updated_at DESC \
             LIMIT 1",
        )
        .bind(name.trim())
        .fetch_optional(&self.pool)
        .await?;

        Ok(id)
    }

    async fn get_entity(&self, entity_id: &str) -> Result<Option<EntityRow>, DbError> {
        let row = sqlx::query_as::<_, PgEntityRow>(&format!(
            "SELECT {ENTITY_COLUMNS} FROM entities WHERE entity_id = $1"
        ))
        .bind(entity_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(EntityRow::from))
    }

    async fn search_entities_by_name(&self, fragment: &str) -> Result<Vec<EntityRow>, DbError> {
        let rows = sqlx::query_as::<_, PgEntityRow>(&format!(
            "SELECT {ENTITY_COLUMNS} FROM entities \
             WHERE is_active = TRUE AND strpos(name, $1) > 0 \
             ORDER BY name, entity_id"
        ))
        .bind(fragment.trim())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(EntityRow::from).collect())
    }

    async fn list_entities_in_category(
        &self,
        category: &str,
        exclude_id: &str,
        limit: usize,
    ) -> Result<Vec<EntityRow>, DbError> {
        let rows = sqlx::query_as::<_, PgEntityRow>(&format!(
            "SELECT {ENTITY_COLUMNS} FROM entities \
             WHERE is_active = TRUE AND category = $1 AND entity_id <> $2 \
             ORDER BY name, entity_id \
             LIMIT $3"
        ))
        .bind(category)
        .bind(exclude_id)
        .bind(sql_limit(limit))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(EntityRow::from).collect())
    }

    async fn deactivate_entities_except(&self, keep_ids: &[String]) -> Result<u64, DbError> {
        let result = sqlx::query(
            "UPDATE entities \
             SET is_active = FALSE, updated_at = NOW() \
             WHERE is_active = TRUE \
               AND entity_id != ALL($1::text[])",
        )
        .bind(keep_ids)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn upsert_snapshot(&self, snapshot: &SnapshotRow) -> Result<(), DbError> {
        let result = sqlx::query(
            "INSERT INTO ranking_snapshots \
                 (search_date, search_time, keyword, entity_id, entity_name, rank, \
                  blog_count, visitor_review_count, n1_score, n2_score, n3_score) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             ON CONFLICT (search_date, search_time, keyword, entity_id) DO UPDATE SET \
                 entity_name          = EXCLUDED.entity_name, \
                 rank                 = EXCLUDED.rank, \
                 blog_count           = EXCLUDED.blog_count, \
                 visitor_review_count = EXCLUDED.visitor_review_count, \
                 n1_score             = EXCLUDED.n1_score, \
                 n2_score             = EXCLUDED.n2_score, \
                 n3_score             = EXCLUDED.n3_score",
        )
        .bind(snapshot.search_date)
        .bind(snapshot.search_time)
        .bind(&snapshot.keyword)
        .bind(&snapshot.entity_id)
        .bind(&snapshot.entity_name)
        .bind(snapshot.rank)
        .bind(snapshot.numeric.blog_count)
        .bind(snapshot.numeric.visitor_review_count)
        .bind(snapshot.numeric.n1_score)
        .bind(snapshot.numeric.n2_score)
        .bind(snapshot.numeric.n3_score)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_foreign_key_violation(&e) => Err(DbError::UnknownEntity {
                entity_id: snapshot.entity_id.clone(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn snapshots_for_entity(
        &self,
        entity_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<SnapshotRow>, DbError> {
        let rows = sqlx::query_as::<_, PgSnapshotRow>(&format!(
            "SELECT {SNAPSHOT_COLUMNS} FROM ranking_snapshots \
             WHERE entity_id = $1 AND search_date BETWEEN $2 AND $3 \
             ORDER BY search_date, search_time, keyword"
        ))
        .bind(entity_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(SnapshotRow::from).collect())
    }

    async fn snapshots_on_date(&self, date: NaiveDate) -> Result<Vec<SnapshotRow>, DbError> {
        let rows = sqlx::query_as::<_, PgSnapshotRow>(&format!(
            "SELECT {SNAPSHOT_COLUMNS} FROM ranking_snapshots \
             WHERE search_date = $1 \
             ORDER BY keyword, search_time, rank"
        ))
        .bind(date)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(SnapshotRow::from).collect())
    }

    async fn existing_news_sources(
        &self,
        source_urls: &[String],
    ) -> Result<Vec<String>, DbError> {
        if source_urls.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query_scalar::<_, String>(
            "SELECT source_url FROM news_articles WHERE source_url = ANY($1::text[])",
        )
        .bind(source_urls)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn insert_news_article(&self, article: &NewNewsArticle) -> Result<bool, DbError> {
        let result = sqlx::query(
            "INSERT INTO news_articles \
                 (title, content, category, image_url, source_url, author, is_featured) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT (source_url) DO NOTHING",
        )
        .bind(&article.title)
        .bind(&article.content)
        .bind(&article.category)
        .bind(article.image_url.as_deref())
        .bind(&article.source_url)
        .bind(&article.author)
        .bind(article.is_featured)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn create_run(
        &self,
        run_type: &str,
        trigger_source: &str,
    ) -> Result<CollectionRunRow, DbError> {
        let row = sqlx::query_as::<_, CollectionRunRow>(&format!(
            "INSERT INTO collection_runs (public_id, run_type, trigger_source, status) \
             VALUES ($1, $2, $3, 'queued') \
             RETURNING {RUN_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(run_type)
        .bind(trigger_source)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn start_run(&self, id: i64) -> Result<(), DbError> {
        let result = sqlx::query(
            "UPDATE collection_runs \
             SET status = 'running', started_at = NOW() \
             WHERE id = $1 AND status = 'queued'",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::InvalidCollectionRunTransition {
                id,
                expected_status: "queued",
            });
        }
        Ok(())
    }

    async fn complete_run(&self, id: i64, records_processed: i32) -> Result<(), DbError> {
        let result = sqlx::query(
            "UPDATE collection_runs \
             SET status = 'succeeded', completed_at = NOW(), records_processed = $2 \
             WHERE id = $1 AND status = 'running'",
        )
        .bind(id)
        .bind(records_processed)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::InvalidCollectionRunTransition {
                id,
                expected_status: "running",
            });
        }
        Ok(())
    }

    async fn fail_run(&self, id: i64, error_message: &str) -> Result<(), DbError> {
        let result = sqlx::query(
            "UPDATE collection_runs \
             SET status = 'failed', completed_at = NOW(), error_message = $2 \
             WHERE id = $1 AND status = 'running'",
        )
        .bind(id)
        .bind(error_message)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::InvalidCollectionRunTransition {
                id,
                expected_status: "running",
            });
        }
        Ok(())
    }

    async fn get_run(&self, id: i64) -> Result<CollectionRunRow, DbError> {
        sqlx::query_as::<_, CollectionRunRow>(&format!(
            "SELECT {RUN_COLUMNS} FROM collection_runs WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(DbError::NotFound)
    }
}
