//! us_split_v3 layout installer library
//!
//! Copies the layout payloads into an XKB tree, registers the layout in the
//! rules registry and purges the compiled keymap cache.

pub mod cache;
pub mod cli;
pub mod config;
pub mod config_file;
pub mod error;
pub mod installer;
pub mod layout;
pub mod registry;
pub mod sanity;
pub mod signals;
pub mod types;

// Re-export main types for convenience
pub use config::{InstallRequest, PayloadCopy};
pub use config_file::InstallOverrides;
pub use error::{InstallerError, Result};
pub use installer::{
    InstallOutcome, InstallReport, InstallStage, Installer, install, purge_cache_only,
};
pub use layout::{AuxiliaryPayload, LayoutDescriptor};
pub use registry::RegistryDocument;
pub use sanity::{AccessProbe, Obstruction, ObstructionKind, SystemProbe, ValidationReport};
pub use types::{ExitStatus, PayloadKind, RegistryFile};
