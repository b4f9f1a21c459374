use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Context as _;
use chrono::{FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Offset, Timelike, Utc};
use placerank_core::{load_tracking, AppConfig, TrackingFile};
use placerank_db::{MemoryRankStore, PgRankStore, RankStore};
use placerank_scraper::{HttpFetcherConfig, HttpPageFetcher, PageFetcher};
use serde::Serialize;

/// Everything a run needs, shared cheaply between scheduled jobs.
#[derive(Clone)]
pub struct PipelineContext {
    pub config: Arc<AppConfig>,
    pub keywords: Arc<Vec<String>>,
    pub news_categories: Arc<BTreeMap<String, Vec<String>>>,
    pub fetcher: Arc<dyn PageFetcher>,
    pub store: Arc<dyn RankStore>,
}

impl PipelineContext {
    #[must_use]
    pub fn new(
        config: AppConfig,
        tracking: TrackingFile,
        fetcher: Arc<dyn PageFetcher>,
        store: Arc<dyn RankStore>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            keywords: Arc::new(tracking.keywords),
            news_categories: Arc::new(tracking.news_categories),
            fetcher,
            store,
        }
    }

    /// Production wiring: reads the tracking file, builds the HTTP fetcher
    /// and connects the Postgres store. Migrations are not run here.
    ///
    /// # Errors
    ///
    /// Returns an error if the tracking file is invalid, the source base URL
    /// does not parse, or the database is unreachable.
    pub async fn connect(config: AppConfig) -> anyhow::Result<(Self, Arc<PgRankStore>)> {
        let tracking = load_tracking(&config.tracking_path).with_context(|| {
            format!(
                "loading tracking file {}",
                config.tracking_path.display()
            )
        })?;
        let fetcher = HttpPageFetcher::new(&HttpFetcherConfig::from_app_config(&config))
            .context("building ranking source client")?;
        let pool = placerank_db::connect_pool(
            &config.database_url,
            placerank_db::PoolConfig::from_app_config(&config),
        )
        .await
        .context("connecting to database")?;
        let store = Arc::new(PgRankStore::new(pool));
        let shared: Arc<dyn RankStore> = store.clone();

        Ok((
            Self::new(config, tracking, Arc::new(fetcher), shared),
            store,
        ))
    }

    /// Like [`PipelineContext::connect`] but backed by an in-memory store, for
    /// previews that must not touch the database.
    ///
    /// # Errors
    ///
    /// Returns an error if the tracking file is invalid or the source base
    /// URL does not parse.
    pub fn offline(config: AppConfig) -> anyhow::Result<Self> {
        let tracking = load_tracking(&config.tracking_path).with_context(|| {
            format!(
                "loading tracking file {}",
                config.tracking_path.display()
            )
        })?;
        let fetcher = HttpPageFetcher::new(&HttpFetcherConfig::from_app_config(&config))
            .context("building ranking source client")?;
        Ok(Self::new(
            config,
            tracking,
            Arc::new(fetcher),
            Arc::new(MemoryRankStore::new()),
        ))
    }

    /// Wall-clock time on the tracking clock, truncated to whole seconds.
    #[must_use]
    pub fn local_now(&self) -> NaiveDateTime {
        local_now(self.config.utc_offset_hours)
    }

    #[must_use]
    pub fn today(&self) -> NaiveDate {
        self.local_now().date()
    }
}

impl std::fmt::Debug for PipelineContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineContext")
            .field("config", &self.config)
            .field("keywords", &self.keywords)
            .field("news_categories", &self.news_categories.keys())
            .finish_non_exhaustive()
    }
}

/// What started a run; stored as the run record's `trigger_source`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trigger {
    Cli,
    Scheduler,
}

impl Trigger {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Trigger::Cli => "cli",
            Trigger::Scheduler => "scheduler",
        }
    }
}

fn tracking_offset(utc_offset_hours: i32) -> FixedOffset {
    FixedOffset::east_opt(utc_offset_hours * 3600).unwrap_or_else(|| Utc.fix())
}

#[must_use]
pub fn local_now(utc_offset_hours: i32) -> NaiveDateTime {
    let now = Utc::now()
        .with_timezone(&tracking_offset(utc_offset_hours))
        .naive_local();
    now.with_nanosecond(0).unwrap_or(now)
}

/// Splits a capture timestamp into the snapshot key columns.
#[must_use]
pub fn capture_key(at: NaiveDateTime) -> (NaiveDate, NaiveTime) {
    (at.date(), at.time())
}
