//! Trend report subcommands. All are read-only.

use chrono::NaiveDate;
use clap::Subcommand;
use placerank_core::AppConfig;
use placerank_pipeline::local_now;
use placerank_trends::{compare_competitors, daily_change, top_gainers, weekly_report};
use serde_json::json;

use crate::{connect_store, print_json};

/// Sub-commands available under `report`.
#[derive(Debug, Subcommand)]
pub enum ReportCommands {
    /// Day-over-day rank change for one entity under one keyword
    Daily {
        #[arg(long)]
        keyword: String,
        /// Entity id
        #[arg(long)]
        entity: String,
        /// Day to report (YYYY-MM-DD, defaults to today on the tracking clock)
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Improved / declined / stable classification per keyword
    Weekly {
        #[arg(long)]
        entity: String,
        /// Window length in days
        #[arg(long, default_value = "7")]
        days: u32,
    },
    /// Head-to-head ranks against same-category competitors
    Compare {
        #[arg(long)]
        entity: String,
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Maximum number of competitors
        #[arg(long, default_value = "10")]
        limit: usize,
        /// Restrict to these keywords (repeatable); all keywords when omitted
        #[arg(long = "keyword")]
        keywords: Vec<String>,
    },
    /// Entities that climbed the most since the day before
    Gainers {
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long, default_value = "10")]
        limit: usize,
    },
}

pub(crate) async fn run_report(config: &AppConfig, command: ReportCommands) -> anyhow::Result<()> {
    let store = connect_store(config).await?;
    let today = local_now(config.utc_offset_hours).date();

    match command {
        ReportCommands::Daily {
            keyword,
            entity,
            date,
        } => {
            let date = date.unwrap_or(today);
            let change = daily_change(&store, &keyword, &entity, date).await?;
            print_json(&json!({
                "keyword": keyword,
                "entity_id": entity,
                "date": date,
                "change": change,
                "marker": change.marker(),
            }))
        }
        ReportCommands::Weekly { entity, days } => {
            let report = weekly_report(&store, &entity, days, today).await?;
            print_json(&report)
        }
        ReportCommands::Compare {
            entity,
            date,
            limit,
            keywords,
        } => {
            let comparison =
                compare_competitors(&store, &entity, &keywords, date.unwrap_or(today), limit)
                    .await?;
            print_json(&comparison)
        }
        ReportCommands::Gainers { date, limit } => {
            let gainers = top_gainers(&store, date.unwrap_or(today), limit).await?;
            print_json(&gainers)
        }
    }
}
