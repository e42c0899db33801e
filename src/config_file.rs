//! Overrides file handling for saving and loading installer settings.
//!
//! Every field is optional; an absent field falls through to the next layer
//! (built-in default < overrides file < command line).

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::types::RegistryFile;

/// Caller-supplied overrides of the installation defaults
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InstallOverrides {
    /// XKB root directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_directory: Option<PathBuf>,
    /// Registry document, relative to the XKB root
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xml_file: Option<PathBuf>,
    /// Registry naming convention, used when `xml_file` is not set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registry: Option<RegistryFile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbols_directory: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbols_target_basename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbols_source: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_directory: Option<PathBuf>,
}

impl InstallOverrides {
    /// Save overrides to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json =
            serde_json::to_string_pretty(self).context("Failed to serialize overrides to JSON")?;

        fs::write(&path, json)
            .with_context(|| format!("Failed to write overrides to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Load overrides from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read overrides from {:?}", path.as_ref()))?;

        let overrides: Self =
            serde_json::from_str(&content).context("Failed to parse overrides JSON")?;

        Ok(overrides)
    }

    /// Layer `higher` on top of `self`; fields set in `higher` win.
    ///
    /// `xml_file` and `registry` name the same thing, so a layer that sets
    /// either one replaces both.
    pub fn merged_with(self, higher: InstallOverrides) -> Self {
        let (xml_file, registry) = if higher.xml_file.is_some() || higher.registry.is_some() {
            (higher.xml_file, higher.registry)
        } else {
            (self.xml_file, self.registry)
        };

        Self {
            target_directory: higher.target_directory.or(self.target_directory),
            xml_file,
            registry,
            symbols_directory: higher.symbols_directory.or(self.symbols_directory),
            symbols_target_basename: higher
                .symbols_target_basename
                .or(self.symbols_target_basename),
            symbols_source: higher.symbols_source.or(self.symbols_source),
            cache_directory: higher.cache_directory.or(self.cache_directory),
        }
    }
}
