//! Type-safe enums for the layout installer
//!
//! Registry flavours, payload kinds and process exit statuses are closed sets,
//! so they are enums rather than strings.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Registry document naming conventions used by the different XKB rule sets.
///
/// Most desktops read `rules/evdev.xml`; older or differently packaged
/// systems use one of the alternates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter, clap::ValueEnum)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RegistryFile {
    #[default]
    Evdev,
    Base,
    Xorg,
    Xfree86,
}

impl RegistryFile {
    /// Path of the registry document relative to the XKB root
    pub const fn relative_path(self) -> &'static str {
        match self {
            Self::Evdev => "rules/evdev.xml",
            Self::Base => "rules/base.xml",
            Self::Xorg => "rules/xorg.xml",
            Self::Xfree86 => "rules/xfree86.xml",
        }
    }
}

/// Kind of payload file being installed. Used in obstruction and progress messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PayloadKind {
    Symbols,
    Types,
    Compat,
}

/// Outward process status of an installer invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitStatus {
    Success = 0,
    /// One or more preconditions failed; nothing was changed
    ValidationFailed = 1,
    /// Malformed registry, I/O failure mid-install, interrupt
    UnexpectedError = 2,
}

impl ExitStatus {
    pub const fn code(self) -> i32 {
        self as i32
    }
}
