//! Scheduled Database Backup Agent
//!
//! Dumps every configured database with its native tool, archives the dump and
//! uploads it to S3-compatible object storage, on a cron schedule and/or once
//! at startup. All configuration comes from the environment.

// dbbackup-agent/src/main.rs
mod backup;
mod config;
mod errors;
mod scheduler;
mod utils;

use anyhow::{Context, Result};
use backup::archive::TarGzArchiver;
use backup::s3_upload::S3ObjectStore;
use backup::BackupOrchestrator;
use config::AppConfig;
use scheduler::CronSchedule;
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use utils::process::TokioProcessRunner;

/// Main entry point for the backup agent
#[tokio::main]
async fn main() -> ExitCode {
    // Load .env before the subscriber so RUST_LOG can live there too.
    let dotenv_result = dotenv::dotenv();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match dotenv_result {
        Ok(path) => debug!("Loaded environment from {}", path.display()),
        Err(e) => debug!("No .env file loaded: {}", e),
    }

    match run_app().await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("❌ Error: {:?}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run_app() -> Result<()> {
    let config = Arc::new(
        AppConfig::from_env().context("Failed to load configuration from environment")?,
    );
    let schedule = config
        .cron
        .as_deref()
        .map(CronSchedule::parse)
        .transpose()
        .context("Invalid CRON setting")?;

    info!(
        "Backup agent configured for {} database(s), bucket {}",
        config.databases.len(),
        config.spaces.bucket_name
    );

    let shutdown = CancellationToken::new();
    let store = S3ObjectStore::connect(&config.spaces).await;
    let orchestrator = Arc::new(
        BackupOrchestrator::new(
            Arc::clone(&config),
            Arc::new(TokioProcessRunner::new(config.command_timeout)),
            Arc::new(TarGzArchiver),
            Arc::new(store),
        )
        .with_shutdown(shutdown.clone()),
    );

    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            match wait_for_shutdown_signal().await {
                Ok(()) => info!("Shutdown signal received, stopping scheduler"),
                Err(e) => error!("❌ Signal handling failed, shutting down: {:?}", e),
            }
            shutdown.cancel();
        }
    });

    scheduler::serve(schedule, config.run_on_startup, shutdown, move || {
        let orchestrator = Arc::clone(&orchestrator);
        async move {
            orchestrator.run().await;
        }
    })
    .await
    .context("Scheduler failed")?;
    Ok(())
}

async fn wait_for_shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut terminate =
            signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => result.context("Failed to listen for Ctrl-C")?,
            _ = terminate.recv() => {}
        }
    }

    #[cfg(not(unix))]
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;

    Ok(())
}
