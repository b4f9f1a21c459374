//! Orchestration of ranking and news runs, and their daily schedule.

pub mod context;
pub mod news_run;
pub mod report;
pub mod run;
pub mod schedule;
pub mod state;

pub use context::{local_now, PipelineContext, Trigger};
pub use news_run::{run_news_collection, ArticleLine, NewsRunReport, NewsSources};
pub use report::{
    CollectionSummary, KeywordReport, RunOutcome, RunReport, SkippedUnit, TopEntry, TOP_LIST_LEN,
};
pub use run::{collect_and_store, run_pipeline, snapshot_keyword, RANKINGS_RUN_TYPE};
pub use schedule::{build_scheduler, daily_cron, run_guarded, run_news_guarded};
pub use state::{RunGuard, RunState, RunStateMachine};
