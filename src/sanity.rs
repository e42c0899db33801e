//! Pre-flight checks for an installation
//!
//! Every precondition is checked before anything is touched, and every
//! failure is collected so the operator sees the complete list in one pass:
//! - Payload sources exist
//! - Payload destination directories exist and are writable
//! - The registry document exists and is writable
//! - The cache directory is writable

use std::fmt;
use std::path::{Path, PathBuf};

use nix::unistd::{AccessFlags, access};

use crate::config::{InstallRequest, PayloadCopy};
use crate::types::PayloadKind;

/// Filesystem existence and permission queries.
///
/// Production code uses [`SystemProbe`]; tests substitute their own to
/// simulate read-only locations regardless of the user they run as.
pub trait AccessProbe {
    fn exists(&self, path: &Path) -> bool;
    fn is_writable(&self, path: &Path) -> bool;
}

/// Probe backed by `access(2)`
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProbe;

impl AccessProbe for SystemProbe {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_writable(&self, path: &Path) -> bool {
        access(path, AccessFlags::W_OK).is_ok()
    }
}

/// What a failed precondition is about
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObstructionKind {
    MissingSource(PayloadKind),
    MissingDirectory(PayloadKind),
    UnwritableDirectory(PayloadKind),
    MissingRegistry,
    UnwritableRegistry,
    UnwritableCache,
}

/// One failed precondition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Obstruction {
    pub kind: ObstructionKind,
    pub path: PathBuf,
}

impl fmt::Display for Obstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = self.path.display();
        match &self.kind {
            ObstructionKind::MissingSource(what) => {
                write!(f, "Cannot find the {} file {}", what, path)
            }
            ObstructionKind::MissingDirectory(what) => {
                write!(f, "Cannot find {} directory {}", what, path)
            }
            ObstructionKind::UnwritableDirectory(what) => {
                write!(f, "Cannot write the {} directory {}", what, path)
            }
            ObstructionKind::MissingRegistry => write!(f, "Cannot find registry file {}", path),
            ObstructionKind::UnwritableRegistry => {
                write!(f, "Cannot write to registry file {}", path)
            }
            ObstructionKind::UnwritableCache => {
                write!(f, "Cannot delete cache files: no write permission to {}", path)
            }
        }
    }
}

/// Result of pre-flight verification
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    obstructions: Vec<Obstruction>,
}

impl ValidationReport {
    /// Returns true if all checks passed
    pub fn is_ok(&self) -> bool {
        self.obstructions.is_empty()
    }

    pub fn push(&mut self, kind: ObstructionKind, path: impl Into<PathBuf>) {
        self.obstructions.push(Obstruction {
            kind,
            path: path.into(),
        });
    }

    pub fn extend(&mut self, other: ValidationReport) {
        self.obstructions.extend(other.obstructions);
    }

    pub fn obstructions(&self) -> &[Obstruction] {
        &self.obstructions
    }

    /// Human-readable messages, one per obstruction, in check order
    pub fn messages(&self) -> Vec<String> {
        self.obstructions.iter().map(ToString::to_string).collect()
    }
}

/// Check that `payload` could be copied: source present, target dir present and writable.
pub fn check_can_copy(probe: &dyn AccessProbe, payload: &PayloadCopy) -> ValidationReport {
    let mut report = ValidationReport::default();

    if !probe.exists(&payload.source) {
        report.push(ObstructionKind::MissingSource(payload.kind), &payload.source);
    }

    let target_dir = payload
        .destination
        .parent()
        .unwrap_or(Path::new("/"))
        .to_path_buf();
    if !probe.exists(&target_dir) {
        report.push(ObstructionKind::MissingDirectory(payload.kind), &target_dir);
    }
    if !probe.is_writable(&target_dir) {
        report.push(ObstructionKind::UnwritableDirectory(payload.kind), &target_dir);
    }

    report
}

/// Check the registry document exists and can be rewritten.
pub fn check_registry(probe: &dyn AccessProbe, registry_file: &Path) -> ValidationReport {
    let mut report = ValidationReport::default();

    if !probe.exists(registry_file) {
        report.push(ObstructionKind::MissingRegistry, registry_file);
    }
    if !probe.is_writable(registry_file) {
        report.push(ObstructionKind::UnwritableRegistry, registry_file);
    }

    report
}

/// Check cache entries could be deleted from `cache_dir`.
pub fn check_cache(probe: &dyn AccessProbe, cache_dir: &Path) -> ValidationReport {
    let mut report = ValidationReport::default();

    if !probe.is_writable(cache_dir) {
        report.push(ObstructionKind::UnwritableCache, cache_dir);
    }

    report
}

/// Perform all checks for a full installation and return the aggregated result
pub fn verify_request(probe: &dyn AccessProbe, request: &InstallRequest) -> ValidationReport {
    tracing::debug!("Running pre-flight checks...");

    let mut report = ValidationReport::default();

    for payload in request.payloads() {
        report.extend(check_can_copy(probe, &payload));
    }
    report.extend(check_registry(probe, &request.registry_file()));
    report.extend(check_cache(probe, request.cache_directory()));

    if report.is_ok() {
        tracing::info!("Pre-flight checks passed");
    } else {
        tracing::warn!("Pre-flight checks found {} problem(s)", report.obstructions().len());
    }

    report
}
