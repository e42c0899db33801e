//! us_split_v3 installer - Main entry point

use anyhow::Context;
use std::process::ExitCode;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use us_split_installer::cli::Cli;
use us_split_installer::config::{self, DEFAULT_CACHE_DIRECTORY};
use us_split_installer::{
    ExitStatus, InstallOutcome, InstallOverrides, InstallRequest, Installer, purge_cache_only,
    signals,
};

/// Initialize the logger; RUST_LOG overrides the verbosity flags
fn init_logger(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse_args();
    init_logger(cli.log_level());
    debug!("CLI arguments parsed: {:?}", cli);

    if let Err(e) = signals::init_signal_handlers() {
        tracing::warn!("Failed to initialize signal handlers: {}", e);
    }

    let status = match run(&cli) {
        Ok(status) => status,
        Err(e) => {
            debug!("Unexpected error: {:?}", e);
            eprintln!("✗ {:#}", e);
            ExitStatus::UnexpectedError
        }
    };

    ExitCode::from(status.code() as u8)
}

fn run(cli: &Cli) -> anyhow::Result<ExitStatus> {
    let file_overrides = match &cli.config {
        Some(path) => {
            info!("Loading overrides from {:?}", path);
            InstallOverrides::load_from_file(path)?
        }
        None => InstallOverrides::default(),
    };
    let overrides = file_overrides.merged_with(cli.overrides());

    if let Some(save_path) = &cli.save_config {
        overrides.save_to_file(save_path)?;
        println!("✓ Options saved to {}", save_path.display());
        return Ok(ExitStatus::Success);
    }

    if cli.only_delete_cache {
        let cache_dir = overrides
            .cache_directory
            .unwrap_or_else(|| DEFAULT_CACHE_DIRECTORY.into());
        return run_cache_purge(&cache_dir, cli.dry_run);
    }

    let request = InstallRequest::new(overrides, &config::installer_dir())
        .context("Invalid installation options")?;
    run_install(&request, cli.dry_run)
}

fn run_cache_purge(cache_dir: &std::path::Path, dry_run: bool) -> anyhow::Result<ExitStatus> {
    let removed = purge_cache_only(cache_dir, dry_run)?;
    let verb = if dry_run { "Would delete" } else { "Deleting" };
    for path in &removed {
        println!("{} cache: `{}'", verb, path.display());
    }
    if removed.is_empty() {
        println!("No cache files in {}", cache_dir.display());
    }
    Ok(ExitStatus::Success)
}

fn run_install(request: &InstallRequest, dry_run: bool) -> anyhow::Result<ExitStatus> {
    let mut installer = Installer::new().dry_run(dry_run);

    match installer.install(request)? {
        InstallOutcome::Obstructed(report) => {
            eprintln!("The installer cannot continue because it encountered the following problems:");
            for message in report.messages() {
                eprintln!("  • {}", message);
            }
            Ok(ExitStatus::ValidationFailed)
        }
        InstallOutcome::Installed(report) => {
            let prefix = if report.dry_run { "[dry-run] " } else { "" };
            for payload in &report.copied {
                println!(
                    "{}Copying {}: `{}' -> `{}'",
                    prefix,
                    payload.kind,
                    payload.source.display(),
                    payload.destination.display()
                );
            }
            println!(
                "{}Updating XML file: `{}' ({} layout list(s))",
                prefix,
                report.registry_file.display(),
                report.layout_lists_updated
            );
            for path in &report.cache_removed {
                println!("{}Deleting cache: `{}'", prefix, path.display());
            }
            if report.dry_run {
                println!("✓ Dry run complete, nothing was changed");
            } else {
                println!("✓ Layout '{}' installed", request.symbols_target_basename());
            }
            Ok(ExitStatus::Success)
        }
    }
}
