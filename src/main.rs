use camsnap::app_state::AppState;
use camsnap::config::load_config;
use camsnap::error::{ConfigError, ServerError};
use camsnap::prelude::*;
use camsnap::scheduler::{CronSchedule, ScheduleZone, SnapshotScheduler};
use camsnap::server::HttpServer;
use camsnap::snapshotter::{build_http_client, Snapshotter};
use camsnap::storage::build_storage;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Periodically archive still images from network cameras.
#[derive(Parser)]
#[command(author, version)]
struct Cli {
    /// Path to the configuration file
    #[arg(env = "CAMSNAP_CONFIG", value_name = "FILE")]
    config: PathBuf,
}

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    info!("Starting camera snapshot service");

    let settings = load_config(&cli.config)?;
    let storage = build_storage(&settings.storage.clone().unwrap_or_default()).await?;
    let client = build_http_client(&settings.http)
        .map_err(|e| ConfigError::InvalidValue(format!("HTTP client: {e}")))?;
    let snapshotter = Arc::new(Snapshotter::from_settings(&settings, client, storage));

    let scheduler = match &settings.snapshot {
        Some(snapshot) => {
            let schedule = CronSchedule::parse(&snapshot.cron_schedule)?;
            let zone = ScheduleZone::from_option(settings.timezone()?);
            Some(SnapshotScheduler::start(schedule, zone, snapshotter.clone()))
        }
        None => {
            warn!("No snapshot schedule configured, only manual triggers will run");
            None
        }
    };

    let server = HttpServer::spawn(AppState::new(snapshotter), settings.listen_addr()?);
    let Some(addr) = server.local_addr().await else {
        server.shutdown(SHUTDOWN_GRACE).await?;
        return Err(ServerError::Task("listener exited before binding".to_string()).into());
    };
    info!("Server started on {}", addr);

    tokio::signal::ctrl_c().await?;
    info!("Shutting down...");

    if let Some(scheduler) = scheduler {
        scheduler.shutdown().await?;
        info!("Scheduler shut down successfully");
    }

    server.shutdown(SHUTDOWN_GRACE).await?;
    info!("Server shut down successfully");

    Ok(())
}
