//! `run` and `schedule` handlers.

use std::sync::Arc;
use std::time::Duration;

use placerank_core::{AbortFlag, AppConfig};
use placerank_pipeline::{
    build_scheduler, run_pipeline, NewsSources, PipelineContext, RunOutcome, RunState,
    RunStateMachine, Trigger,
};

use crate::{print_json, shutdown_signal};

/// Upper bound on how long `schedule` waits for an in-flight run to flush
/// after a shutdown signal.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(120);

async fn prepare(config: AppConfig) -> anyhow::Result<PipelineContext> {
    let (ctx, store) = PipelineContext::connect(config).await?;
    let applied = placerank_db::run_migrations(store.pool()).await?;
    if applied > 0 {
        tracing::info!(applied, "applied pending migrations");
    }
    Ok(ctx)
}

/// Runs the pipeline once. A shutdown signal raises the abort flag so the
/// run stops at the next page or keyword boundary.
pub(crate) async fn run_once(config: AppConfig) -> anyhow::Result<()> {
    let ctx = prepare(config).await?;
    let abort = AbortFlag::new();

    let watcher = {
        let abort = abort.clone();
        tokio::spawn(async move {
            shutdown_signal().await;
            abort.raise();
        })
    };

    let report = run_pipeline(&ctx, Trigger::Cli, &abort).await;
    watcher.abort();
    print_json(&report)?;

    if report.outcome == RunOutcome::Failed {
        anyhow::bail!(
            "run failed: {}",
            report.error.as_deref().unwrap_or("unknown error")
        );
    }
    Ok(())
}

/// Registers the daily jobs and blocks until a shutdown signal, then lets
/// the in-flight run flush before stopping the scheduler.
pub(crate) async fn run_schedule(config: AppConfig) -> anyhow::Result<()> {
    let ctx = prepare(config).await?;
    let news = NewsSources::from_app_config(&ctx.config)?.map(Arc::new);
    let machine = RunStateMachine::new();
    let abort = AbortFlag::new();

    let times: Vec<String> = ctx
        .config
        .schedule_times
        .iter()
        .map(ToString::to_string)
        .collect();
    let mut scheduler = build_scheduler(ctx, machine.clone(), abort.clone(), news).await?;
    tracing::info!(times = ?times, "scheduler running; waiting for shutdown signal");

    shutdown_signal().await;
    abort.raise();

    let deadline = tokio::time::Instant::now() + DRAIN_TIMEOUT;
    while machine.state() == RunState::Running {
        if tokio::time::Instant::now() >= deadline {
            tracing::warn!("in-flight run did not finish before the drain timeout");
            break;
        }
        tokio::time::sleep(Duration::from_millis(250)).await;
    }

    scheduler.shutdown().await?;
    tracing::info!(
        completed_runs = machine.completed_runs(),
        last_outcome = ?machine.last_outcome(),
        "scheduler stopped"
    );
    Ok(())
}
