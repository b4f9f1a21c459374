use chrono::{DateTime, Utc};
use serde::Serialize;

/// A news board row to insert. Mirrors the payload the news crate builds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNewsArticle {
    pub title: String,
    pub content: String,
    pub category: String,
    pub image_url: Option<String>,
    pub source_url: String,
    pub author: String,
    pub is_featured: bool,
}

/// A row from the `news_articles` table.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct NewsArticleRow {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub category: String,
    pub image_url: Option<String>,
    pub source_url: String,
    pub author: String,
    pub is_featured: bool,
    pub created_at: DateTime<Utc>,
}
