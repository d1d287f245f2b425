use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid database URI: {0}")]
    InvalidTarget(String),

    #[error("Unrecognized database kind: {0}")]
    UnrecognizedKind(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to start {program}: {reason}")]
    Spawn { program: String, reason: String },

    #[error("{program} exited with {status}: {stderr}")]
    Command {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("{program} did not finish within {after:?}")]
    Timeout { program: String, after: Duration },

    #[error("Archive creation failed: {0}")]
    Archive(String),

    #[error("Object store upload failed: {0}")]
    Upload(String),

    #[error("Operation cancelled: {0}")]
    Cancelled(String),

    #[error("Invalid cron schedule: {0}")]
    Schedule(String),
}

pub type Result<T> = std::result::Result<T, AppError>;
