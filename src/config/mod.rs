//! Configuration management for domscan.
//!
//! Provides the run configuration value and XDG-compliant configuration
//! storage.

mod settings;

pub use settings::{LogLevel, Paths, ScanConfiguration, CONFIG_FILE_NAME};
