pub mod process;

use std::path::PathBuf;
use which::which;

use crate::errors::{AppError, Result};

/// Finds an executable in the system PATH.
pub fn find_executable(program: &str) -> Result<PathBuf> {
    which(program).map_err(|e| AppError::Spawn {
        program: program.to_string(),
        reason: format!(
            "executable not found in PATH ({}). Please ensure the database client tools are installed.",
            e
        ),
    })
}
