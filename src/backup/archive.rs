// dbbackup-agent/src/backup/archive.rs
use anyhow::{Context, Result};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::path::Path;
use tar::Builder;
use tracing::{debug, info};

use crate::errors::AppError;

/// Compresses a single dump file into an archive.
pub trait Archiver: Send + Sync {
    fn archive(&self, source_file: &Path, archive_dest_path: &Path) -> crate::errors::Result<()>;
}

/// Produces `.tar.gz` archives with flate2 and tar.
#[derive(Debug, Clone, Copy, Default)]
pub struct TarGzArchiver;

impl Archiver for TarGzArchiver {
    fn archive(&self, source_file: &Path, archive_dest_path: &Path) -> crate::errors::Result<()> {
        create_tar_gz_archive(source_file, archive_dest_path)
            .map_err(|e| AppError::Archive(format!("{:#}", e)))
    }
}

/// Creates a GZipped TAR archive holding one file.
///
/// The file is stored under its own file name, without any leading directories.
///
/// # Arguments
/// * `source_file` - The file to archive.
/// * `archive_dest_path` - The full path where the `.tar.gz` archive will be created.
pub fn create_tar_gz_archive(source_file: &Path, archive_dest_path: &Path) -> Result<()> {
    if !source_file.is_file() {
        return Err(anyhow::anyhow!(
            "Source for archival is not a file: {}",
            source_file.display()
        ));
    }
    let entry_name = source_file
        .file_name()
        .with_context(|| format!("Source for archival has no file name: {}", source_file.display()))?;

    if let Some(parent) = archive_dest_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!(
                    "Failed to create parent directory for archive: {}",
                    parent.display()
                )
            })?;
        }
    }

    debug!(
        "Creating tar.gz archive from {} to {}",
        source_file.display(),
        archive_dest_path.display()
    );

    let archive_file = File::create(archive_dest_path).with_context(|| {
        format!(
            "Failed to create archive file: {}",
            archive_dest_path.display()
        )
    })?;
    let enc = GzEncoder::new(archive_file, Compression::default());
    let mut tar_builder = Builder::new(enc);

    tar_builder
        .append_path_with_name(source_file, entry_name)
        .with_context(|| format!("Failed to append file {} to archive", source_file.display()))?;

    let encoder = tar_builder.into_inner().with_context(|| {
        format!(
            "Failed to get inner encoder from tar builder for archive: {}",
            archive_dest_path.display()
        )
    })?;

    encoder.finish().with_context(|| {
        format!(
            "Failed to finish Gzip encoding for archive: {}",
            archive_dest_path.display()
        )
    })?;

    info!(
        "✓ Tar.gz archive created successfully at {}",
        archive_dest_path.display()
    );
    Ok(())
}
