//! Rank trends derived from stored snapshots. Read-only over a
//! [`placerank_db::RankStore`].

pub mod competitors;
pub mod daily;
pub mod gainers;
pub mod standing;
pub mod weekly;

pub use competitors::{compare_competitors, we_win, CompetitorComparison, CompetitorRow};
pub use daily::{daily_change, latest_ranks, DailyChange};
pub use gainers::{top_gainers, Gainer};
pub use standing::{track_entity_by_name, EntityStanding};
pub use weekly::{build_weekly_report, classify, weekly_report, KeywordTrend, TrendSummary, WeeklyReport};
