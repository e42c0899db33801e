//! Error handling module for the layout installer
//!
//! Precondition failures are not errors: they are collected into a
//! `ValidationReport` (see `sanity`). The types here cover the unexpected
//! failures that abort an installation once mutation has begun.

use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::installer::InstallStage;

/// Main error type for the layout installer
#[derive(Error, Debug)]
pub enum InstallerError {
    /// IO errors with the path that was being touched
    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration errors (invalid request values)
    #[error("Configuration error: {0}")]
    Config(String),

    /// The registry document could not be parsed
    #[error("Malformed registry document {}: {message}", path.display())]
    RegistryParse { path: PathBuf, message: String },

    /// The registry document could not be serialized back to disk
    #[error("Failed to write registry document {}: {message}", path.display())]
    RegistryWrite { path: PathBuf, message: String },

    /// Install stage machine transition errors
    #[error("Invalid install transition: {from:?} -> {to:?}")]
    InstallTransition { from: InstallStage, to: InstallStage },
}

/// Result type alias for installer operations
pub type Result<T> = std::result::Result<T, InstallerError>;

impl InstallerError {
    /// Create an IO error bound to a path
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
