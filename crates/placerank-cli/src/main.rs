mod collect;
mod report;
mod run;


use anyhow::Context as _;
use clap::{Parser, Subcommand};
use placerank_core::AppConfig;
use placerank_db::PgRankStore;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use crate::report::ReportCommands;

#[derive(Debug, Parser)]
#[command(name = "placerank")]
#[command(about = "Keyword ranking tracker for place listings")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the full pipeline once: collect, snapshot every keyword, summarise
    Run,
    /// Run the pipeline at the configured daily times until interrupted
    Schedule,
    /// Collect the entity population without snapshotting keywords
    Collect {
        /// Override the number of entities to collect
        #[arg(long)]
        target: Option<usize>,
        /// Override the listing page bound
        #[arg(long)]
        max_pages: Option<usize>,
        /// Collect and report without writing to the database
        #[arg(long)]
        dry_run: bool,
    },
    /// Capture and store the current ranking for a single keyword
    Snapshot {
        /// Keyword to query
        keyword: String,
    },
    /// Trend reports over stored ranking history
    Report {
        #[command(subcommand)]
        command: ReportCommands,
    },
    /// Collect news items for every configured news category
    News {
        /// List what would be inserted without writing to the database
        #[arg(long)]
        dry_run: bool,
    },
    /// Database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Apply pending migrations
    Migrate,
    /// Check that the database is reachable
    Ping,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("placerank: no command given; run with --help for usage");
        return Ok(());
    };

    let config = placerank_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    match command {
        Commands::Run => run::run_once(config).await,
        Commands::Schedule => run::run_schedule(config).await,
        Commands::Collect {
            target,
            max_pages,
            dry_run,
        } => collect::run_collect(config, target, max_pages, dry_run).await,
        Commands::Snapshot { keyword } => collect::run_snapshot(config, &keyword).await,
        Commands::Report { command } => report::run_report(&config, command).await,
        Commands::News { dry_run } => collect::run_news(config, dry_run).await,
        Commands::Db { command } => run_db(&config, command).await,
    }
}

async fn run_db(config: &AppConfig, command: DbCommands) -> anyhow::Result<()> {
    let pool = placerank_db::connect_pool(
        &config.database_url,
        placerank_db::PoolConfig::from_app_config(config),
    )
    .await
    .context("connecting to database")?;

    match command {
        DbCommands::Migrate => {
            let applied = placerank_db::run_migrations(&pool).await?;
            println!("applied {applied} migration(s)");
        }
        DbCommands::Ping => {
            placerank_db::ping(&pool).await?;
            println!("database reachable");
        }
    }
    Ok(())
}

/// Read-only store for report commands.
pub(crate) async fn connect_store(config: &AppConfig) -> anyhow::Result<PgRankStore> {
    let pool = placerank_db::connect_pool(
        &config.database_url,
        placerank_db::PoolConfig::from_app_config(config),
    )
    .await
    .context("connecting to database")?;
    Ok(PgRankStore::new(pool))
}

pub(crate) fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Resolves on Ctrl-C or SIGTERM. A signal that cannot be installed is
/// logged and never fires.
pub(crate) async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal");
}
