// dbbackup-agent/src/backup/artifact.rs
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::target::DatabaseTarget;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H:%M:%S";

/// Staged files for one target in one run.
#[derive(Debug, Clone)]
pub struct BackupArtifact {
    pub timestamp: String,
    pub filename: String,
    pub archive_path: PathBuf,
    pub dump_path: PathBuf,
}

impl BackupArtifact {
    pub fn new(target: &DatabaseTarget, now: DateTime<Local>, scratch_dir: &Path) -> Self {
        let timestamp = now.format(TIMESTAMP_FORMAT).to_string();
        let filename = format!(
            "backup-{}-{}-{}-{}.tar.gz",
            target.kind, timestamp, target.db_name, target.host
        );
        let archive_path = scratch_dir.join(&filename);
        let dump_path = scratch_dir.join(format!("{}.dump", filename));

        BackupArtifact {
            timestamp,
            filename,
            archive_path,
            dump_path,
        }
    }

    /// Removes the staged dump and archive. Missing files are not an error.
    pub async fn cleanup(&self) {
        for path in [&self.dump_path, &self.archive_path] {
            match tokio::fs::remove_file(path).await {
                Ok(()) => debug!("Removed staged file {}", path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!("⚠️ Could not remove staged file {}: {}", path.display(), e),
            }
        }
    }
}
