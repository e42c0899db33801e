use clap::{ArgAction, Parser};
use std::path::PathBuf;

use crate::config_file::InstallOverrides;
use crate::types::RegistryFile;

/// Install the us_split_v3 XKB keyboard layout
#[derive(Parser, Debug)]
#[command(name = "us-split-install")]
#[command(about = "Copy the us_split_v3 layout into the XKB tree and register it")]
#[command(version)]
pub struct Cli {
    /// Use DIRNAME as the xkb dir [default: /usr/share/X11/xkb]
    #[arg(short = 'd', long = "target-directory", value_name = "DIRNAME")]
    pub target_directory: Option<PathBuf>,

    /// Install layout metadata into FILE, relative to the xkb dir [default: rules/evdev.xml]
    #[arg(short = 'x', long = "xml-file", value_name = "FILE", conflicts_with = "registry")]
    pub xml_file: Option<PathBuf>,

    /// Pick the registry file by rule set name instead of by path
    #[arg(short = 'r', long, value_enum)]
    pub registry: Option<RegistryFile>,

    /// Use DIRNAME as the symbols target dir [default: symbols]
    #[arg(short = 's', long = "symbols-directory", value_name = "DIRNAME")]
    pub symbols_directory: Option<PathBuf>,

    /// Install layout as FILE [default: us_split_v3]
    #[arg(short = 'n', long = "symbols-target-basename", value_name = "FILE")]
    pub symbols_target_basename: Option<String>,

    /// Install layout from FILE [default: next to this program]
    #[arg(short = 'f', long = "symbols-source", value_name = "FILE")]
    pub symbols_source: Option<PathBuf>,

    /// Directory holding compiled keymaps (*.xkm) [default: /var/lib/xkb]
    #[arg(long = "cache-directory", value_name = "DIRNAME")]
    pub cache_directory: Option<PathBuf>,

    /// Read option defaults from a JSON file; command-line options win
    #[arg(short = 'c', long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Write the effective options to a JSON file and exit
    #[arg(long, value_name = "FILE")]
    pub save_config: Option<PathBuf>,

    /// Do not run installation, only delete the compiled keymap cache
    #[arg(short = 'C', long = "only-delete-cache")]
    pub only_delete_cache: bool,

    /// Check everything and show what would be done without changing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    pub fn parse_args() -> Self {
        <Self as clap::Parser>::parse()
    }

    /// Overrides given on the command line
    pub fn overrides(&self) -> InstallOverrides {
        InstallOverrides {
            target_directory: self.target_directory.clone(),
            xml_file: self.xml_file.clone(),
            registry: self.registry,
            symbols_directory: self.symbols_directory.clone(),
            symbols_target_basename: self.symbols_target_basename.clone(),
            symbols_source: self.symbols_source.clone(),
            cache_directory: self.cache_directory.clone(),
        }
    }

    /// Default log filter for the requested verbosity
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}
