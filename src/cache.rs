//! Compiled keymap cache purge
//!
//! xkbcomp caches compiled keymaps as `*.xkm` files. They are derived state
//! and must be dropped after the layout sources change.

use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{InstallerError, Result};

/// Extension of compiled keymap cache files
pub const CACHE_EXTENSION: &str = "xkm";

/// Returns true if the final dot-delimited suffix of `file_name` is `xkm`.
///
/// A bare `xkm` counts too: its only suffix is the whole name. The name is
/// compared as raw bytes, so names that are not valid UTF-8 still match.
pub fn is_cache_artifact(file_name: impl AsRef<OsStr>) -> bool {
    let suffix = file_name.as_ref().as_encoded_bytes().rsplit(|b| *b == b'.').next();
    suffix == Some(CACHE_EXTENSION.as_bytes())
}

/// Immediate entries of `cache_dir` that are cache artifacts, sorted by name
pub fn list_cache_artifacts(cache_dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(cache_dir).map_err(|e| InstallerError::io(cache_dir, e))?;

    let mut artifacts = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| InstallerError::io(cache_dir, e))?;
        if is_cache_artifact(entry.file_name()) {
            artifacts.push(entry.path());
        }
    }
    artifacts.sort();
    Ok(artifacts)
}

/// Delete every cache artifact in `cache_dir` and return what was removed.
///
/// An empty or artifact-free directory is not an error.
pub fn purge_cache(cache_dir: &Path) -> Result<Vec<PathBuf>> {
    let artifacts = list_cache_artifacts(cache_dir)?;

    for path in &artifacts {
        tracing::info!("Deleting cache: {}", path.display());
        fs::remove_file(path).map_err(|e| InstallerError::io(path, e))?;
    }

    if artifacts.is_empty() {
        tracing::debug!("No cache files in {}", cache_dir.display());
    }
    Ok(artifacts)
}
