//! One full ranking run: collect, persist, snapshot every keyword, summarise.

use chrono::{NaiveDate, NaiveTime};
use placerank_core::{AbortFlag, RankingSnapshot};
use placerank_db::{
    ensure_entities, reconcile_active_entities, upsert_entities, upsert_snapshots, DbError,
    RankStore,
};
use placerank_scraper::{
    Collector, CollectorSettings, PageFetcher as _, ScraperError, Session, SnapshotEngine,
    SnapshotSettings, StopReason, Throttle,
};
use placerank_trends::track_entity_by_name;

use crate::context::{capture_key, PipelineContext, Trigger};
use crate::report::{CollectionSummary, KeywordReport, RunOutcome, RunReport};

pub const RANKINGS_RUN_TYPE: &str = "rankings";

/// Runs the pipeline once. Never returns an error: every failure is recorded
/// in the report, and an authentication failure at start marks it failed.
///
/// Raising `abort` stops the run between pages or keywords; whatever was
/// collected before that point has already been written.
pub async fn run_pipeline(ctx: &PipelineContext, trigger: Trigger, abort: &AbortFlag) -> RunReport {
    let (search_date, search_time) = capture_key(ctx.local_now());
    let mut report = RunReport::new(trigger, search_date, search_time);
    let store = &*ctx.store;

    match begin_run(store, RANKINGS_RUN_TYPE, trigger).await {
        Ok(id) => report.run_id = Some(id),
        Err(e) => {
            tracing::warn!(error = %e, "could not open run record; continuing without one");
            report.skip("run_record", e);
        }
    }
    tracing::info!(
        run_id = ?report.run_id,
        trigger = trigger.as_str(),
        %search_date,
        %search_time,
        keywords = ctx.keywords.len(),
        "ranking run started"
    );

    let mut session = match ctx.fetcher.authenticate(&ctx.config.credentials).await {
        Ok(session) => session,
        Err(e) => {
            tracing::error!(error = %e, "authentication failed; run cannot proceed");
            report.fail(format!("authentication failed: {e}"));
            finish_run(store, &mut report).await;
            return report;
        }
    };

    collect_entities(ctx, &mut session, abort, &mut report).await;
    snapshot_keywords(ctx, &mut session, abort, &mut report).await;

    if let Some(name) = ctx.config.my_entity_name.as_deref() {
        match track_entity_by_name(store, name, search_date).await {
            Ok(standings) => report.own_entity = standings,
            Err(e) => {
                tracing::warn!(name, error = %e, "own-entity summary failed");
                report.skip("own_entity", e);
            }
        }
    }

    if report.aborted {
        report.fail("run aborted");
    }
    finish_run(store, &mut report).await;
    report
}

async fn collect_entities(
    ctx: &PipelineContext,
    session: &mut Session,
    abort: &AbortFlag,
    report: &mut RunReport,
) {
    match collect_and_store(ctx, session, abort).await {
        Ok((summary, reconcile_error)) => {
            if let Some(e) = reconcile_error {
                report.skip("reconcile", e);
            }
            if summary.stop_reason == StopReason::Aborted {
                report.aborted = true;
            }
            report.collection = Some(summary);
        }
        Err(e) => {
            tracing::warn!(error = %e, "entity collection failed; continuing with keywords");
            report.skip("collect", e);
        }
    }
}

/// Harvests the entity population, upserts it, and deactivates entities
/// missing from a complete, non-empty harvest.
///
/// A reconciliation failure does not fail the step; it is returned alongside
/// the summary.
///
/// # Errors
///
/// Returns [`ScraperError`] when the first listing page cannot be read.
pub async fn collect_and_store(
    ctx: &PipelineContext,
    session: &mut Session,
    abort: &AbortFlag,
) -> Result<(CollectionSummary, Option<DbError>), ScraperError> {
    let store = &*ctx.store;
    let collector = Collector::new(
        &*ctx.fetcher,
        &ctx.config.credentials,
        CollectorSettings::from_app_config(&ctx.config),
        abort.clone(),
    );
    let outcome = collector.collect(session).await?;

    let entities = upsert_entities(store, &outcome.entities).await;

    let mut reconcile_error = None;
    let deactivated = if outcome.stop_reason.is_complete() && !outcome.entities.is_empty() {
        let ids: Vec<String> = outcome
            .entities
            .iter()
            .map(|e| e.entity_id.clone())
            .collect();
        match reconcile_active_entities(store, &ids).await {
            Ok(n) => Some(n),
            Err(e) => {
                tracing::warn!(error = %e, "reconciliation failed");
                reconcile_error = Some(e);
                None
            }
        }
    } else {
        tracing::info!(
            stop_reason = ?outcome.stop_reason,
            collected = outcome.entities.len(),
            "harvest incomplete; skipping deactivation"
        );
        None
    };

    let summary = CollectionSummary {
        collected: outcome.entities.len(),
        pages_fetched: outcome.pages_fetched,
        from_options: outcome.from_options,
        stop_reason: outcome.stop_reason,
        entities,
        deactivated,
    };
    Ok((summary, reconcile_error))
}

async fn snapshot_keywords(
    ctx: &PipelineContext,
    session: &mut Session,
    abort: &AbortFlag,
    report: &mut RunReport,
) {
    let mut throttle = Throttle::from_millis(ctx.config.keyword_delay_ms);

    for keyword in ctx.keywords.iter() {
        if abort.is_raised() {
            tracing::warn!(keyword = %keyword, "run aborted before keyword");
            report.aborted = true;
            break;
        }
        throttle.wait().await;

        match snapshot_keyword(ctx, session, keyword, report.search_date, report.search_time).await
        {
            Ok(keyword_report) => report.keywords.push(keyword_report),
            Err(e) => {
                tracing::warn!(keyword = %keyword, error = %e, "keyword snapshot failed; skipping");
                report.skip(format!("keyword:{keyword}"), e);
            }
        }
    }
}

/// Captures one keyword's ranking and stores it under the given capture key.
///
/// # Errors
///
/// Returns [`ScraperError`] when the ranking page cannot be read, including
/// after one re-authentication.
pub async fn snapshot_keyword(
    ctx: &PipelineContext,
    session: &mut Session,
    keyword: &str,
    search_date: NaiveDate,
    search_time: NaiveTime,
) -> Result<KeywordReport, ScraperError> {
    let store = &*ctx.store;
    let engine = SnapshotEngine::new(
        &*ctx.fetcher,
        &ctx.config.credentials,
        SnapshotSettings::from_app_config(&ctx.config),
    );
    let entries = engine.snapshot(session, keyword).await?;

    let created = ensure_entities(store, &entries).await;
    let snapshots: Vec<RankingSnapshot> = entries
        .iter()
        .map(|e| RankingSnapshot::from_entry(e, keyword, search_date, search_time))
        .collect();
    let stored = upsert_snapshots(store, &snapshots).await;
    tracing::info!(
        keyword = %keyword,
        captured = entries.len(),
        stored = stored.upserted,
        unresolved = stored.unresolved.len(),
        duplicates = stored.duplicates.len(),
        "keyword snapshot stored"
    );
    Ok(KeywordReport::new(keyword, &entries, created.upserted, stored))
}

/// Creates a run record and moves it to `running`.
pub(crate) async fn begin_run(
    store: &dyn RankStore,
    run_type: &str,
    trigger: Trigger,
) -> Result<i64, DbError> {
    let run = store.create_run(run_type, trigger.as_str()).await?;
    store.start_run(run.id).await?;
    Ok(run.id)
}

/// Moves a run record to its terminal state. Logs instead of failing.
pub(crate) async fn close_run(store: &dyn RankStore, run_id: i64, outcome: Result<i32, String>) {
    let result = match outcome {
        Ok(records) => store.complete_run(run_id, records).await,
        Err(message) => store.fail_run(run_id, &message).await,
    };
    if let Err(e) = result {
        tracing::error!(run_id, error = %e, "failed to record run outcome");
    }
}

async fn finish_run(store: &dyn RankStore, report: &mut RunReport) {
    report.finished_at = Some(chrono::Utc::now());

    tracing::info!(
        run_id = ?report.run_id,
        outcome = ?report.outcome,
        entities = report.entities_upserted(),
        snapshots = report.snapshots_stored(),
        failed_rows = report.rows_failed(),
        skipped = report.skipped.len(),
        aborted = report.aborted,
        "ranking run finished"
    );

    if let Some(run_id) = report.run_id {
        let outcome = match report.outcome {
            RunOutcome::Succeeded => Ok(report.records_processed()),
            RunOutcome::Failed => Err(report.error.clone().unwrap_or_else(|| "failed".to_owned())),
        };
        close_run(store, run_id, outcome).await;
    }
}
