//! Installation request: the fully resolved set of paths and names for one run.
//!
//! Built from the defaults below plus caller overrides, and validated when it
//! is constructed so that the installer never sees a half-formed request.

use std::path::{Component, Path, PathBuf};

use crate::config_file::InstallOverrides;
use crate::error::{InstallerError, Result};
use crate::layout::{AuxiliaryPayload, LayoutDescriptor, US_SPLIT_V3_AUXILIARY};
use crate::types::PayloadKind;

/// XKB configuration root on most distributions
pub const DEFAULT_TARGET_DIRECTORY: &str = "/usr/share/X11/xkb";

/// Symbols subdirectory of the XKB root
pub const DEFAULT_SYMBOLS_DIRECTORY: &str = "symbols";

/// Where xkbcomp keeps compiled keymaps
pub const DEFAULT_CACHE_DIRECTORY: &str = "/var/lib/xkb";

/// One file to copy during installation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadCopy {
    pub kind: PayloadKind,
    pub source: PathBuf,
    pub destination: PathBuf,
}

/// Everything one `install` invocation needs, resolved and validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallRequest {
    target_directory: PathBuf,
    registry_path: PathBuf,
    symbols_directory: PathBuf,
    symbols_target_basename: String,
    symbols_source: PathBuf,
    auxiliary: Vec<PayloadCopy>,
    cache_directory: PathBuf,
    layout: LayoutDescriptor,
}

impl InstallRequest {
    /// Request for the `us_split_v3` layout and its auxiliary payloads.
    ///
    /// `installer_dir` is where the default symbols source is looked up.
    pub fn new(overrides: InstallOverrides, installer_dir: &Path) -> Result<Self> {
        Self::for_layout(
            overrides,
            installer_dir,
            LayoutDescriptor::us_split_v3(),
            US_SPLIT_V3_AUXILIARY,
        )
    }

    /// Request for an arbitrary layout variant.
    pub fn for_layout(
        overrides: InstallOverrides,
        installer_dir: &Path,
        layout: LayoutDescriptor,
        auxiliary: &[AuxiliaryPayload],
    ) -> Result<Self> {
        layout.validate().map_err(InstallerError::config)?;

        let target_directory = overrides
            .target_directory
            .unwrap_or_else(|| PathBuf::from(DEFAULT_TARGET_DIRECTORY));

        let registry_path = overrides.xml_file.unwrap_or_else(|| {
            PathBuf::from(overrides.registry.unwrap_or_default().relative_path())
        });
        ensure_relative("registry document path", &registry_path)?;

        let symbols_directory = overrides
            .symbols_directory
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SYMBOLS_DIRECTORY));
        ensure_relative("symbols directory", &symbols_directory)?;

        let symbols_target_basename = overrides
            .symbols_target_basename
            .unwrap_or_else(|| layout.internal_name.clone());
        validate_basename(&symbols_target_basename)?;

        let symbols_source = overrides
            .symbols_source
            .unwrap_or_else(|| installer_dir.join(&layout.internal_name));

        let source_dir = symbols_source.parent().unwrap_or(Path::new("")).to_path_buf();
        let auxiliary = auxiliary
            .iter()
            .map(|aux| PayloadCopy {
                kind: aux.kind,
                source: source_dir.join(aux.source_name),
                destination: target_directory.join(aux.destination),
            })
            .collect();

        let cache_directory = overrides
            .cache_directory
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_DIRECTORY));

        Ok(Self {
            target_directory,
            registry_path,
            symbols_directory,
            symbols_target_basename,
            symbols_source,
            auxiliary,
            cache_directory,
            layout,
        })
    }

    pub fn target_directory(&self) -> &Path {
        &self.target_directory
    }

    /// Registry path as given, relative to the XKB root
    pub fn registry_path(&self) -> &Path {
        &self.registry_path
    }

    /// Absolute location of the registry document
    pub fn registry_file(&self) -> PathBuf {
        self.target_directory.join(&self.registry_path)
    }

    pub fn symbols_target_basename(&self) -> &str {
        &self.symbols_target_basename
    }

    pub fn cache_directory(&self) -> &Path {
        &self.cache_directory
    }

    pub fn layout(&self) -> &LayoutDescriptor {
        &self.layout
    }

    /// The primary symbols copy
    pub fn symbols_payload(&self) -> PayloadCopy {
        PayloadCopy {
            kind: PayloadKind::Symbols,
            source: self.symbols_source.clone(),
            destination: self
                .target_directory
                .join(&self.symbols_directory)
                .join(&self.symbols_target_basename),
        }
    }

    /// All copies in installation order: symbols first, then auxiliaries.
    pub fn payloads(&self) -> Vec<PayloadCopy> {
        std::iter::once(self.symbols_payload())
            .chain(self.auxiliary.iter().cloned())
            .collect()
    }
}

/// Directory holding the running installer binary.
///
/// Falls back to the current directory when the executable path is unknown.
pub fn installer_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

fn ensure_relative(what: &str, path: &Path) -> Result<()> {
    if path.as_os_str().is_empty() {
        return Err(InstallerError::config(format!("{} must not be empty", what)));
    }
    if path.is_absolute() {
        return Err(InstallerError::config(format!(
            "{} {} must be relative to the target directory",
            what,
            path.display()
        )));
    }
    Ok(())
}

fn validate_basename(name: &str) -> Result<()> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(InstallerError::config(format!(
            "symbols target basename '{}' must be a plain file name",
            name
        ))),
    }
}
