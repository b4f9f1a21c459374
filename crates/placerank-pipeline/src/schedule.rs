//! Daily cron triggers for ranking and news runs.

use std::sync::Arc;

use placerank_core::{AbortFlag, ScheduleTime};
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use crate::context::{PipelineContext, Trigger};
use crate::news_run::{run_news_collection, NewsRunReport, NewsSources};
use crate::report::{RunOutcome, RunReport};
use crate::run::run_pipeline;
use crate::state::RunStateMachine;

/// Six-field cron expression (`sec min hour * * *`, UTC) for a daily time
/// given on a clock `utc_offset_hours` ahead of UTC.
#[must_use]
pub fn daily_cron(time: ScheduleTime, utc_offset_hours: i32) -> String {
    let utc_hour = (i32::from(time.hour) - utc_offset_hours).rem_euclid(24);
    format!("0 {} {} * * *", time.minute, utc_hour)
}

/// Runs the pipeline unless another run holds `machine`.
///
/// Returns `None` when the trigger was skipped because a run is in progress.
pub async fn run_guarded(
    ctx: &PipelineContext,
    machine: &RunStateMachine,
    abort: &AbortFlag,
    trigger: Trigger,
) -> Option<RunReport> {
    let Some(guard) = machine.try_begin() else {
        tracing::warn!(trigger = trigger.as_str(), "a run is already in progress; skipping trigger");
        return None;
    };
    let report = run_pipeline(ctx, trigger, abort).await;
    guard.finish(report.outcome);
    Some(report)
}

/// News counterpart of [`run_guarded`]. Shares the same machine so a news
/// run never overlaps a ranking run.
pub async fn run_news_guarded(
    ctx: &PipelineContext,
    sources: &NewsSources,
    machine: &RunStateMachine,
    abort: &AbortFlag,
    trigger: Trigger,
) -> Option<NewsRunReport> {
    let Some(guard) = machine.try_begin() else {
        tracing::warn!(trigger = trigger.as_str(), "a run is already in progress; skipping news trigger");
        return None;
    };
    let report = run_news_collection(ctx, sources, trigger, abort, false).await;
    let outcome = if report.aborted {
        RunOutcome::Failed
    } else {
        RunOutcome::Succeeded
    };
    guard.finish(outcome);
    Some(report)
}

/// Builds and starts the job scheduler with one ranking job per configured
/// time and, when `news` is given and a news time is configured, a daily
/// news job.
///
/// Returns the running [`JobScheduler`] handle, which must be kept alive for
/// the lifetime of the process.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised, a
/// job cannot be registered, or the scheduler fails to start.
pub async fn build_scheduler(
    ctx: PipelineContext,
    machine: RunStateMachine,
    abort: AbortFlag,
    news: Option<Arc<NewsSources>>,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;
    let offset = ctx.config.utc_offset_hours;

    for time in ctx.config.schedule_times.clone() {
        let cron = daily_cron(time, offset);
        register_rankings_job(&scheduler, &cron, ctx.clone(), machine.clone(), abort.clone())
            .await?;
        tracing::info!(local_time = %time, cron = %cron, "scheduler: registered rankings job");
    }

    match (news, ctx.config.news_schedule_time) {
        (Some(sources), Some(time)) => {
            let cron = daily_cron(time, offset);
            register_news_job(&scheduler, &cron, ctx.clone(), sources, machine, abort).await?;
            tracing::info!(local_time = %time, cron = %cron, "scheduler: registered news job");
        }
        (None, Some(_)) => {
            tracing::warn!("news schedule configured but search credentials are missing; news job not registered");
        }
        _ => {}
    }

    scheduler.start().await?;
    Ok(scheduler)
}

async fn register_rankings_job(
    scheduler: &JobScheduler,
    cron: &str,
    ctx: PipelineContext,
    machine: RunStateMachine,
    abort: AbortFlag,
) -> Result<(), JobSchedulerError> {
    let job = Job::new_async(cron, move |_uuid, _lock| {
        let ctx = ctx.clone();
        let machine = machine.clone();
        let abort = abort.clone();

        Box::pin(async move {
            if abort.is_raised() {
                tracing::info!("scheduler: shutdown in progress; skipping rankings trigger");
                return;
            }
            tracing::info!("scheduler: starting rankings run");
            if let Some(report) = run_guarded(&ctx, &machine, &abort, Trigger::Scheduler).await {
                tracing::info!(
                    outcome = ?report.outcome,
                    snapshots = report.snapshots_stored(),
                    skipped = report.skipped.len(),
                    "scheduler: rankings run complete"
                );
            }
        })
    })?;

    scheduler.add(job).await?;
    Ok(())
}

async fn register_news_job(
    scheduler: &JobScheduler,
    cron: &str,
    ctx: PipelineContext,
    sources: Arc<NewsSources>,
    machine: RunStateMachine,
    abort: AbortFlag,
) -> Result<(), JobSchedulerError> {
    let job = Job::new_async(cron, move |_uuid, _lock| {
        let ctx = ctx.clone();
        let sources = Arc::clone(&sources);
        let machine = machine.clone();
        let abort = abort.clone();

        Box::pin(async move {
            if abort.is_raised() {
                return;
            }
            tracing::info!("scheduler: starting news run");
            if let Some(report) =
                run_news_guarded(&ctx, &sources, &machine, &abort, Trigger::Scheduler).await
            {
                tracing::info!(
                    inserted = report.inserted,
                    duplicates = report.duplicates,
                    "scheduler: news run complete"
                );
            }
        })
    })?;

    scheduler.add(job).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(hour: u8, minute: u8) -> ScheduleTime {
        ScheduleTime { hour, minute }
    }

    #[test]
    fn cron_converts_local_time_to_utc() {
        assert_eq!(daily_cron(at(6, 0), 9), "0 0 21 * * *");
        assert_eq!(daily_cron(at(18, 30), 9), "0 30 9 * * *");
        assert_eq!(daily_cron(at(7, 15), 0), "0 15 7 * * *");
    }

    #[test]
    fn cron_wraps_negative_offsets() {
        assert_eq!(daily_cron(at(22, 0), -5), "0 0 3 * * *");
    }
}
