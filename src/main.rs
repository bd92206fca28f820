//! # Care Engine Main Entry Point
//!
//! Serves the API by default; `migrate` and `sync-once` are operator chores.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use migration::{Migrator, MigratorTrait};
use tokio_util::sync::CancellationToken;

use care_engine::clock::SystemClock;
use care_engine::config::ConfigLoader;
use care_engine::server::{AppState, pharmacy_api, run_server};
use care_engine::sync::JobType;
use care_engine::{db, telemetry};

#[derive(Debug, Parser)]
#[command(name = "care-engine")]
#[command(about = "Zone serviceability, pricing and pharmacy sync service")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run migrations and serve the HTTP API (default)
    Serve,
    /// Apply pending migrations and exit
    Migrate,
    /// Enqueue one sync job and run it in the foreground
    SyncOnce {
        #[arg(long, value_parser = parse_job_type)]
        job_type: JobType,
    },
}

fn parse_job_type(value: &str) -> Result<JobType, String> {
    value.parse().map_err(|err: care_engine::sync::SyncError| err.to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = ConfigLoader::new().load()?;
    telemetry::init_tracing(&config)?;

    tracing::info!(profile = %config.profile, "Configuration loaded");
    if let Ok(redacted) = config.redacted_json() {
        tracing::debug!(config = %redacted, "Effective configuration");
    }

    let conn = db::init_pool(&config).await?;
    Migrator::up(&conn, None).await?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => run_server(config, conn).await,
        Commands::Migrate => {
            tracing::info!("Migrations applied");
            Ok(())
        }
        Commands::SyncOnce { job_type } => {
            let config = Arc::new(config);
            let api = pharmacy_api(&config);
            let state = AppState::new(
                config,
                Arc::new(conn),
                api,
                Arc::new(SystemClock),
                CancellationToken::new(),
            );
            let job = state.scheduler.trigger_sync(job_type).await?;
            let outcome = state.scheduler.executor().execute_job(job.id).await?;
            tracing::info!(job_id = %job.id, ?outcome, "Sync finished");
            Ok(())
        }
    }
}
