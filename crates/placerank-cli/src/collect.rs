//! Single-step handlers: `collect`, `snapshot` and `news`.

use placerank_core::{AbortFlag, AppConfig};
use placerank_pipeline::{
    collect_and_store, local_now, run_news_collection, snapshot_keyword, NewsSources,
    PipelineContext, Trigger,
};
use placerank_scraper::PageFetcher as _;
use serde::Serialize;

use crate::print_json;

#[derive(Debug, Serialize)]
struct CollectReport {
    dry_run: bool,
    #[serde(flatten)]
    summary: placerank_pipeline::CollectionSummary,
    reconcile_error: Option<String>,
}

/// Collects the entity population. With `dry_run` the harvest is written to
/// an in-memory store only, so the summary reflects what a real run would
/// upsert against an empty database.
pub(crate) async fn run_collect(
    mut config: AppConfig,
    target: Option<usize>,
    max_pages: Option<usize>,
    dry_run: bool,
) -> anyhow::Result<()> {
    if let Some(target) = target {
        config.target_entity_count = target;
    }
    if let Some(max_pages) = max_pages {
        config.max_pages = max_pages;
    }

    let ctx = if dry_run {
        PipelineContext::offline(config)?
    } else {
        PipelineContext::connect(config).await?.0
    };

    let mut session = ctx.fetcher.authenticate(&ctx.config.credentials).await?;
    let (summary, reconcile_error) =
        collect_and_store(&ctx, &mut session, &AbortFlag::new()).await?;

    print_json(&CollectReport {
        dry_run,
        summary,
        reconcile_error: reconcile_error.map(|e| e.to_string()),
    })
}

pub(crate) async fn run_snapshot(config: AppConfig, keyword: &str) -> anyhow::Result<()> {
    let keyword = keyword.trim();
    if keyword.is_empty() {
        anyhow::bail!("keyword must not be empty");
    }

    let (ctx, _store) = PipelineContext::connect(config).await?;
    let (search_date, search_time) = {
        let now = local_now(ctx.config.utc_offset_hours);
        (now.date(), now.time())
    };

    let mut session = ctx.fetcher.authenticate(&ctx.config.credentials).await?;
    let report = snapshot_keyword(&ctx, &mut session, keyword, search_date, search_time).await?;
    print_json(&report)
}

pub(crate) async fn run_news(config: AppConfig, dry_run: bool) -> anyhow::Result<()> {
    let Some(sources) = NewsSources::from_app_config(&config)? else {
        println!("news search credentials are not configured; nothing to do");
        return Ok(());
    };

    let (ctx, _store) = PipelineContext::connect(config).await?;
    let report = run_news_collection(&ctx, &sources, Trigger::Cli, &AbortFlag::new(), dry_run).await;
    print_json(&report)
}
