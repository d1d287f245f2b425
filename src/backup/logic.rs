// dbbackup-agent/src/backup/logic.rs
use chrono::Local;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::archive::Archiver;
use super::artifact::BackupArtifact;
use super::db_dump::build_dump_command;
use super::s3_upload::ObjectStore;
use super::target::{redact_uri, DatabaseTarget};
use crate::config::AppConfig;
use crate::errors::{AppError, Result};
use crate::utils::process::ProcessRunner;

/// Whether a trigger actually performed a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Completed,
    /// Another run was still in flight, so this trigger did nothing.
    Skipped,
}

/// Drives dump, compress and upload for every configured database.
///
/// Targets are processed one at a time in configured order. A failing target
/// is logged and the run moves on; nothing is returned to the caller beyond
/// whether the run happened at all.
///
/// Cancelling the shutdown token interrupts the dump or upload in progress,
/// removes that target's staged files and ends the run.
pub struct BackupOrchestrator {
    config: Arc<AppConfig>,
    runner: Arc<dyn ProcessRunner>,
    archiver: Arc<dyn Archiver>,
    store: Arc<dyn ObjectStore>,
    run_lock: Mutex<()>,
    shutdown: CancellationToken,
}

impl BackupOrchestrator {
    pub fn new(
        config: Arc<AppConfig>,
        runner: Arc<dyn ProcessRunner>,
        archiver: Arc<dyn Archiver>,
        store: Arc<dyn ObjectStore>,
    ) -> Self {
        BackupOrchestrator {
            config,
            runner,
            archiver,
            store,
            run_lock: Mutex::new(()),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub async fn run(&self) -> RunStatus {
        let Ok(_guard) = self.run_lock.try_lock() else {
            warn!("⚠️ A backup run is already in progress, skipping this trigger.");
            return RunStatus::Skipped;
        };

        let databases = &self.config.databases;
        if databases.is_empty() {
            info!("No databases configured, nothing to back up.");
            return RunStatus::Completed;
        }

        let total = databases.len();
        info!("🚀 Starting backup run for {} database(s)", total);

        for (index, uri) in databases.iter().enumerate() {
            let position = index + 1;
            if self.shutdown.is_cancelled() {
                warn!(
                    "Shutdown requested, {} of {} database(s) not backed up in this run",
                    total - index,
                    total
                );
                break;
            }

            let target = match DatabaseTarget::parse(uri) {
                Ok(target) => target,
                Err(e) => {
                    error!("[{}/{}] ❌ Skipping {}: {}", position, total, redact_uri(uri), e);
                    continue;
                }
            };

            info!(
                "[{}/{}] {}/{} backup in progress...",
                position, total, target.kind, target.db_name
            );

            match self.back_up_target(&target).await {
                Ok(key) => info!(
                    kind = %target.kind,
                    db = %target.db_name,
                    host = %target.host,
                    "✓ Backup of {} {} on {} completed successfully ({})",
                    target.kind,
                    target.db_name,
                    target.host,
                    key
                ),
                Err(AppError::UnrecognizedKind(kind)) => warn!(
                    db = %target.db_name,
                    host = %target.host,
                    "⚠️ Unknown database type '{}', skipping this target",
                    kind
                ),
                Err(e) => error!(
                    kind = %target.kind,
                    db = %target.db_name,
                    host = %target.host,
                    "❌ Backup of {} {} on {} failed: {}",
                    target.kind,
                    target.db_name,
                    target.host,
                    e
                ),
            }
        }

        info!("🎉 Backup run finished");
        RunStatus::Completed
    }

    /// Runs every step for one target and removes its staged files afterwards,
    /// whatever the outcome. Returns the uploaded object key.
    async fn back_up_target(&self, target: &DatabaseTarget) -> Result<String> {
        let artifact = BackupArtifact::new(target, Local::now(), &self.config.scratch_dir);
        debug!(
            timestamp = %artifact.timestamp,
            "Staging {} in {}",
            artifact.filename,
            self.config.scratch_dir.display()
        );
        let result = self.dump_compress_upload(target, &artifact).await;
        artifact.cleanup().await;
        result
    }

    async fn dump_compress_upload(
        &self,
        target: &DatabaseTarget,
        artifact: &BackupArtifact,
    ) -> Result<String> {
        let command = build_dump_command(target, &artifact.dump_path)?;

        tokio::fs::create_dir_all(&self.config.scratch_dir).await?;

        // 1. Dump
        let output = self.until_shutdown("dump", self.runner.run(&command)).await??;
        if !output.stderr.trim().is_empty() {
            debug!("{} stderr: {}", command.program, output.stderr.trim());
        }
        if !output.stdout.trim().is_empty() {
            debug!("{} stdout: {}", command.program, output.stdout.trim());
        }

        // 2. Compress (local work, always allowed to finish so cleanup sees the file)
        let archiver = Arc::clone(&self.archiver);
        let source = artifact.dump_path.clone();
        let dest = artifact.archive_path.clone();
        tokio::task::spawn_blocking(move || archiver.archive(&source, &dest))
            .await
            .map_err(|e| AppError::Archive(format!("archive task failed: {}", e)))??;

        // 3. Read the archive
        let body = tokio::fs::read(&artifact.archive_path).await?;

        // 4. Upload
        let key = self.config.spaces.object_key(&artifact.filename);
        self.until_shutdown(
            "upload",
            self.store
                .put_object(&self.config.spaces.bucket_name, &key, body),
        )
        .await??;

        Ok(key)
    }

    /// Drives `step` unless shutdown is requested first, in which case the
    /// step future is dropped (killing any child process it owns).
    async fn until_shutdown<F: Future>(&self, step: &str, fut: F) -> Result<F::Output> {
        tokio::select! {
            output = fut => Ok(output),
            _ = self.shutdown.cancelled() => {
                Err(AppError::Cancelled(format!("{} interrupted by shutdown", step)))
            }
        }
    }
}
