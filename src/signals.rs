//! Interrupt handling
//!
//! An interrupt aborts the installer on the spot. Steps that already
//! completed stay in place; the process exits with the unexpected-error
//! status so callers can tell it apart from a validation failure.

use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGTERM};
use signal_hook::iterator::Signals;
use std::thread;

use crate::types::ExitStatus;

/// Name of a handled signal, for logging
pub fn signal_name(sig: i32) -> &'static str {
    match sig {
        SIGINT => "SIGINT",
        SIGTERM => "SIGTERM",
        SIGHUP => "SIGHUP",
        _ => "UNKNOWN",
    }
}

/// Install handlers for SIGINT (Ctrl+C), SIGTERM and SIGHUP.
/// Call this once at program start.
pub fn init_signal_handlers() -> Result<(), std::io::Error> {
    let mut signals = Signals::new([SIGINT, SIGTERM, SIGHUP])?;

    thread::spawn(move || {
        if let Some(sig) = signals.forever().next() {
            tracing::warn!("Received {}, aborting installation", signal_name(sig));
            eprintln!("Interrupted; steps already completed were not rolled back");
            std::process::exit(ExitStatus::UnexpectedError.code());
        }
    });

    Ok(())
}
