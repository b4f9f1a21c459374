//! Daily news board collection: search, enrich, dedupe, insert.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use placerank_core::{AbortFlag, AppConfig};
use placerank_db::NewNewsArticle;
use placerank_news::{
    EnrichmentChain, NewsCollectSettings, NewsCollector, NewsError, NewsPayload, NewsSearchClient,
};
use serde::Serialize;

use crate::context::{PipelineContext, Trigger};
use crate::report::SkippedUnit;
use crate::run::{begin_run, close_run};

pub const NEWS_RUN_TYPE: &str = "news";

/// Clients used by a news run.
#[derive(Debug)]
pub struct NewsSources {
    pub search: NewsSearchClient,
    pub chain: EnrichmentChain,
    pub settings: NewsCollectSettings,
}

impl NewsSources {
    /// Returns `Ok(None)` when news search credentials are not configured.
    ///
    /// # Errors
    ///
    /// Returns [`NewsError`] if an HTTP client cannot be constructed.
    pub fn from_app_config(config: &AppConfig) -> Result<Option<Self>, NewsError> {
        let (Some(id), Some(secret)) = (
            config.news_client_id.as_deref(),
            config.news_client_secret.as_deref(),
        ) else {
            return Ok(None);
        };
        Ok(Some(Self {
            search: NewsSearchClient::new(id, secret)?,
            chain: EnrichmentChain::new(&config.enrich_endpoints, config.enrich_timeout_secs)?,
            settings: NewsCollectSettings::from_app_config(config),
        }))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArticleLine {
    pub category: String,
    pub title: String,
    pub source_url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewsRunReport {
    pub run_id: Option<i64>,
    pub trigger: Trigger,
    pub dry_run: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub collected: usize,
    pub inserted: usize,
    /// Collected items whose `source_url` was already stored.
    pub duplicates: usize,
    pub articles: Vec<ArticleLine>,
    pub failed_searches: Vec<SkippedUnit>,
    pub failed_inserts: Vec<SkippedUnit>,
    pub aborted: bool,
}

impl NewsRunReport {
    fn new(trigger: Trigger, dry_run: bool) -> Self {
        Self {
            run_id: None,
            trigger,
            dry_run,
            started_at: Utc::now(),
            finished_at: None,
            collected: 0,
            inserted: 0,
            duplicates: 0,
            articles: Vec::new(),
            failed_searches: Vec::new(),
            failed_inserts: Vec::new(),
            aborted: false,
        }
    }
}

fn to_article(payload: NewsPayload) -> NewNewsArticle {
    NewNewsArticle {
        title: payload.title,
        content: payload.content,
        category: payload.category,
        image_url: payload.image_url,
        source_url: payload.source_url,
        author: payload.author,
        is_featured: payload.is_featured,
    }
}

/// Collects up to the per-category limit for every configured news category
/// and inserts articles not already stored. With `dry_run` nothing is
/// written and no run record is kept.
pub async fn run_news_collection(
    ctx: &PipelineContext,
    sources: &NewsSources,
    trigger: Trigger,
    abort: &AbortFlag,
    dry_run: bool,
) -> NewsRunReport {
    let store = &*ctx.store;
    let mut report = NewsRunReport::new(trigger, dry_run);

    if ctx.news_categories.is_empty() {
        tracing::info!("no news categories configured; nothing to collect");
        report.finished_at = Some(Utc::now());
        return report;
    }

    if !dry_run {
        match begin_run(store, NEWS_RUN_TYPE, trigger).await {
            Ok(id) => report.run_id = Some(id),
            Err(e) => tracing::warn!(error = %e, "could not open news run record"),
        }
    }

    let collector = NewsCollector::new(
        &sources.search,
        &sources.chain,
        sources.settings.clone(),
        abort.clone(),
    );
    let harvest = collector.collect(&ctx.news_categories).await;
    report.aborted = harvest.aborted;
    report.failed_searches = harvest
        .failed_searches
        .into_iter()
        .map(|(category, keyword, reason)| SkippedUnit {
            unit: format!("news:{category}:{keyword}"),
            reason,
        })
        .collect();

    let mut seen = HashSet::new();
    let payloads: Vec<NewsPayload> = harvest
        .payloads
        .into_iter()
        .filter(|p| seen.insert(p.source_url.clone()))
        .collect();
    report.collected = payloads.len();

    let urls: Vec<String> = payloads.iter().map(|p| p.source_url.clone()).collect();
    let existing: HashSet<String> = match store.existing_news_sources(&urls).await {
        Ok(found) => found.into_iter().collect(),
        Err(e) => {
            tracing::warn!(error = %e, "could not check stored news sources; relying on insert conflict");
            HashSet::new()
        }
    };

    for payload in payloads {
        if existing.contains(&payload.source_url) {
            tracing::debug!(source_url = %payload.source_url, "news item already stored");
            report.duplicates += 1;
            continue;
        }
        let line = ArticleLine {
            category: payload.category.clone(),
            title: payload.title.clone(),
            source_url: payload.source_url.clone(),
        };
        if dry_run {
            report.articles.push(line);
            continue;
        }
        match store.insert_news_article(&to_article(payload)).await {
            Ok(true) => {
                report.inserted += 1;
                report.articles.push(line);
            }
            Ok(false) => report.duplicates += 1,
            Err(e) => {
                tracing::error!(source_url = %line.source_url, error = %e, "news insert failed");
                report.failed_inserts.push(SkippedUnit {
                    unit: line.source_url,
                    reason: e.to_string(),
                });
            }
        }
    }

    report.finished_at = Some(Utc::now());
    tracing::info!(
        collected = report.collected,
        inserted = report.inserted,
        duplicates = report.duplicates,
        failed_searches = report.failed_searches.len(),
        dry_run,
        "news run finished"
    );

    if let Some(run_id) = report.run_id {
        let outcome = if report.aborted {
            Err("run aborted".to_owned())
        } else {
            Ok(i32::try_from(report.inserted).unwrap_or(i32::MAX))
        };
        close_run(store, run_id, outcome).await;
    }
    report
}
