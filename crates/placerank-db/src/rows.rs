//! Stored shapes of entities and ranking snapshots.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use placerank_core::{Entity, NumericFields};
use rust_decimal::Decimal;
use serde::Serialize;

/// A row from the `entities` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityRow {
    pub entity_id: String,
    pub name: String,
    pub category: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub source_url: String,
    pub numeric: NumericFields,
    pub is_active: bool,
    pub updated_at: DateTime<Utc>,
}

impl EntityRow {
    /// Active row for `entity`, stamped `now`.
    #[must_use]
    pub fn from_entity(entity: &Entity, now: DateTime<Utc>) -> Self {
        Self {
            entity_id: entity.entity_id.clone(),
            name: entity.name.clone(),
            category: entity.category.clone(),
            address: entity.address.clone(),
            phone: entity.phone.clone(),
            source_url: entity.source_url.clone(),
            numeric: entity.numeric.clone(),
            is_active: true,
            updated_at: now,
        }
    }
}

/// A row from the `ranking_snapshots` table. Unlike
/// [`placerank_core::RankingSnapshot`] the entity is always resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotRow {
    pub search_date: NaiveDate,
    pub search_time: NaiveTime,
    pub keyword: String,
    pub entity_id: String,
    pub entity_name: String,
    pub rank: i32,
    pub numeric: NumericFields,
}

/// Flat `sqlx` mapping; numeric columns are regrouped into [`NumericFields`].
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct PgEntityRow {
    pub entity_id: String,
    pub name: String,
    pub category: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub source_url: String,
    pub blog_count: Option<i64>,
    pub visitor_review_count: Option<i64>,
    pub n1_score: Option<Decimal>,
    pub n2_score: Option<Decimal>,
    pub n3_score: Option<Decimal>,
    pub is_active: bool,
    pub updated_at: DateTime<Utc>,
}

impl From<PgEntityRow> for EntityRow {
    fn from(row: PgEntityRow) -> Self {
        Self {
            entity_id: row.entity_id,
            name: row.name,
            category: row.category,
            address: row.address,
            phone: row.phone,
            source_url: row.source_url,
            numeric: NumericFields {
                blog_count: row.blog_count,
                visitor_review_count: row.visitor_review_count,
                n1_score: row.n1_score,
                n2_score: row.n2_score,
                n3_score: row.n3_score,
            },
            is_active: row.is_active,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct PgSnapshotRow {
    pub search_date: NaiveDate,
    pub search_time: NaiveTime,
    pub keyword: String,
    pub entity_id: String,
    pub entity_name: String,
    pub rank: i32,
    pub blog_count: Option<i64>,
    pub visitor_review_count: Option<i64>,
    pub n1_score: Option<Decimal>,
    pub n2_score: Option<Decimal>,
    pub n3_score: Option<Decimal>,
}

impl From<PgSnapshotRow> for SnapshotRow {
    fn from(row: PgSnapshotRow) -> Self {
        Self {
            search_date: row.search_date,
            search_time: row.search_time,
            keyword: row.keyword,
            entity_id: row.entity_id,
            entity_name: row.entity_name,
            rank: row.rank,
            numeric: NumericFields {
                blog_count: row.blog_count,
                visitor_review_count: row.visitor_review_count,
                n1_score: row.n1_score,
                n2_score: row.n2_score,
                n3_score: row.n3_score,
            },
        }
    }
}
