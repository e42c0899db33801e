//! Installer module
//!
//! Runs one installation: validate everything, then copy the payloads,
//! register the layout and purge the keymap cache, in that order.
//!
//! # Stage Flow
//!
//! ```text
//! Validating ──→ Aborted        (one or more obstructions, nothing touched)
//!     │
//!     ↓
//! Mutating ──→ Done
//! ```
//!
//! Errors raised while `Mutating` abort the remaining steps. Completed steps
//! are not rolled back; each step is safe to retry.

use std::fs;
use std::path::{Path, PathBuf};

use crate::cache;
use crate::config::{InstallRequest, PayloadCopy};
use crate::error::{InstallerError, Result};
use crate::registry::RegistryDocument;
use crate::sanity::{self, AccessProbe, SystemProbe, ValidationReport};

/// Installation stages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstallStage {
    /// Checking preconditions, nothing touched yet
    Validating,
    /// Preconditions failed (terminal)
    Aborted,
    /// Copying, registering, purging
    Mutating,
    /// All steps completed (terminal)
    Done,
}

impl InstallStage {
    /// Returns true if this is a terminal state (Aborted or Done)
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Aborted | Self::Done)
    }

    /// Returns true if `self -> to` is a legal transition
    pub const fn can_transition_to(self, to: InstallStage) -> bool {
        matches!(
            (self, to),
            (Self::Validating, Self::Aborted)
                | (Self::Validating, Self::Mutating)
                | (Self::Mutating, Self::Done)
        )
    }
}

/// What a successful installation did (or, in dry-run mode, would do)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    pub copied: Vec<PayloadCopy>,
    pub registry_file: PathBuf,
    /// Number of `layoutList` nodes that received the descriptor
    pub layout_lists_updated: usize,
    pub cache_removed: Vec<PathBuf>,
    pub dry_run: bool,
}

/// Result of an installation that did not hit an unexpected error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    Installed(InstallReport),
    /// Validation failed; the filesystem was not touched
    Obstructed(ValidationReport),
}

/// Installer instance
#[derive(Debug)]
pub struct Installer<P: AccessProbe = SystemProbe> {
    probe: P,
    dry_run: bool,
    stage: InstallStage,
}

impl Installer<SystemProbe> {
    /// Create an installer that queries the real filesystem
    pub fn new() -> Self {
        Self::with_probe(SystemProbe)
    }
}

impl Default for Installer<SystemProbe> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: AccessProbe> Installer<P> {
    /// Create an installer with a custom access probe
    pub fn with_probe(probe: P) -> Self {
        Self {
            probe,
            dry_run: false,
            stage: InstallStage::Validating,
        }
    }

    /// Validate and report, but never touch the filesystem
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn stage(&self) -> InstallStage {
        self.stage
    }

    fn transition(&mut self, to: InstallStage) -> Result<()> {
        if !self.stage.can_transition_to(to) {
            return Err(InstallerError::InstallTransition {
                from: self.stage,
                to,
            });
        }
        tracing::debug!("Install stage {:?} -> {:?}", self.stage, to);
        self.stage = to;
        Ok(())
    }

    /// Check every precondition of `request` without touching anything
    pub fn validate(&self, request: &InstallRequest) -> ValidationReport {
        sanity::verify_request(&self.probe, request)
    }

    /// Install the layout described by `request`.
    ///
    /// Returns `Obstructed` with every failed precondition if validation
    /// fails. Errors are reserved for failures after mutation has started
    /// (malformed registry, I/O errors).
    pub fn install(&mut self, request: &InstallRequest) -> Result<InstallOutcome> {
        self.stage = InstallStage::Validating;

        let report = self.validate(request);
        if !report.is_ok() {
            self.transition(InstallStage::Aborted)?;
            return Ok(InstallOutcome::Obstructed(report));
        }

        self.transition(InstallStage::Mutating)?;

        let copied = request.payloads();
        let registry_file = request.registry_file();
        let name = request.symbols_target_basename();

        let report = if self.dry_run {
            for payload in &copied {
                tracing::info!(
                    "[dry-run] Would copy {}: {} -> {}",
                    payload.kind,
                    payload.source.display(),
                    payload.destination.display()
                );
            }
            let layout_lists = RegistryDocument::open(&registry_file)?.layout_list_count();
            tracing::info!(
                "[dry-run] Would add '{}' to {} layout list(s) in {}",
                name,
                layout_lists,
                registry_file.display()
            );
            let cache_removed = cache::list_cache_artifacts(request.cache_directory())?;
            InstallReport {
                copied,
                registry_file,
                layout_lists_updated: layout_lists,
                cache_removed,
                dry_run: true,
            }
        } else {
            for payload in &copied {
                copy_payload(payload)?;
            }
            let layout_lists = register_layout(&registry_file, request)?;
            let cache_removed = cache::purge_cache(request.cache_directory())?;
            InstallReport {
                copied,
                registry_file,
                layout_lists_updated: layout_lists,
                cache_removed,
                dry_run: false,
            }
        };

        self.transition(InstallStage::Done)?;
        tracing::info!("Installed layout '{}'", name);
        Ok(InstallOutcome::Installed(report))
    }
}

/// Install `request` with the real filesystem probe
pub fn install(request: &InstallRequest) -> Result<InstallOutcome> {
    Installer::new().install(request)
}

/// Purge the keymap cache without installing anything.
///
/// No other precondition is checked. In dry-run mode the artifacts are
/// listed but kept.
pub fn purge_cache_only(cache_dir: &Path, dry_run: bool) -> Result<Vec<PathBuf>> {
    if dry_run {
        let artifacts = cache::list_cache_artifacts(cache_dir)?;
        for path in &artifacts {
            tracing::info!("[dry-run] Would delete cache: {}", path.display());
        }
        return Ok(artifacts);
    }
    cache::purge_cache(cache_dir)
}

fn copy_payload(payload: &PayloadCopy) -> Result<()> {
    tracing::info!(
        "Copying {}: {} -> {}",
        payload.kind,
        payload.source.display(),
        payload.destination.display()
    );
    fs::copy(&payload.source, &payload.destination)
        .map_err(|e| InstallerError::io(&payload.destination, e))?;
    Ok(())
}

fn register_layout(registry_file: &Path, request: &InstallRequest) -> Result<usize> {
    tracing::info!("Updating XML file: {}", registry_file.display());

    let mut document = RegistryDocument::open(registry_file)?;
    let updated = document.append_layout(request.symbols_target_basename(), request.layout())?;
    document.save()?;

    Ok(updated)
}
