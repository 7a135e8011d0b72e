//! Logging setup.
//!
//! Console output goes to stderr so stdout stays clean for JSON. The console
//! only shows warnings by default because progress is already reported
//! through status lines; `-v` raises it. The optional log file records
//! events at the configured level. `RUST_LOG` overrides both.

use crate::config::LogLevel;
use std::fs::OpenOptions;
use std::io;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Filter directive for the console.
pub fn console_directive(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Filter directive for the log file: the configured level, raised by `-v`.
pub fn file_directive(level: LogLevel, verbose: u8) -> &'static str {
    match verbose {
        0 => level.as_filter(),
        1 => LogLevel::Debug.as_filter(),
        _ => "trace",
    }
}

fn filter_or(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// Install the global subscriber.
///
/// Fails if the log file cannot be opened or a subscriber is already set.
pub fn init_logging(level: LogLevel, verbose: u8, log_file: Option<&Path>) -> io::Result<()> {
    let console = fmt::layer()
        .compact()
        .with_target(false)
        .with_writer(io::stderr)
        .with_filter(filter_or(console_directive(verbose)));

    let file = match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file))
                    .with_filter(filter_or(file_directive(level, verbose))),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(console)
        .with(file)
        .try_init()
        .map_err(io::Error::other)
}
