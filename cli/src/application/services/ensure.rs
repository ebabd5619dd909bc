//! Application service: idempotent create-if-absent for filesystem targets.
//!
//! Pre-existing targets are never modified and never an error. Nothing here
//! deletes.

use std::path::Path;

use anyhow::Result;

use crate::application::ports::LocalFs;
use crate::domain::ProvisionError;

/// State of a target after an ensure call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnsureOutcome {
    Created,
    AlreadyPresent,
}

fn write_error(path: &Path, err: &anyhow::Error) -> ProvisionError {
    ProvisionError::Write {
        path: path.display().to_string(),
        reason: format!("{err:#}"),
    }
}

/// Create `path` (and its parents) as a directory if it does not exist.
///
/// # Errors
///
/// Returns `ProvisionError::Write` if the directory cannot be created or the
/// path exists as something other than a directory.
pub fn ensure_directory(fs: &impl LocalFs, path: &Path) -> Result<EnsureOutcome> {
    if fs.is_dir(path) {
        tracing::debug!(path = %path.display(), "directory already present");
        return Ok(EnsureOutcome::AlreadyPresent);
    }
    if fs.exists(path) {
        return Err(ProvisionError::Write {
            path: path.display().to_string(),
            reason: "exists and is not a directory".to_string(),
        }
        .into());
    }
    fs.create_dir_all(path).map_err(|e| write_error(path, &e))?;
    tracing::info!(path = %path.display(), "directory created");
    Ok(EnsureOutcome::Created)
}

/// Create `path` as an empty file if it does not exist.
///
/// Missing parent directories are not created.
///
/// # Errors
///
/// Returns `ProvisionError::Write` if the file cannot be created.
pub fn ensure_file(fs: &impl LocalFs, path: &Path) -> Result<EnsureOutcome> {
    if fs.exists(path) {
        tracing::debug!(path = %path.display(), "file already present");
        return Ok(EnsureOutcome::AlreadyPresent);
    }
    fs.create_file(path).map_err(|e| write_error(path, &e))?;
    tracing::info!(path = %path.display(), "file created");
    Ok(EnsureOutcome::Created)
}
