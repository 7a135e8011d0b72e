//! CLI subcommand definitions and handlers.
//!
//! Implements a git-like subcommand architecture:
//! - `domscan scan <domains>...` - Run the reconnaissance pipeline
//! - `domscan config show|init|path` - Inspect or create the configuration

mod config;
mod scan;

pub use config::{ConfigAction, ConfigCommand};
pub use scan::ScanCommand;

use crate::config::{Paths, ScanConfiguration, CONFIG_FILE_NAME};
use crate::error::{CliResult, ConfigError};
use clap::{ArgAction, Parser, Subcommand};
use std::path::{Path, PathBuf};

/// domscan - domain reconnaissance.
///
/// Resolves each domain, probes a set of TCP ports with SYN packets, fetches
/// the HTTP status, captures a screenshot and writes a report.
#[derive(Parser, Debug)]
#[command(name = "domscan")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Domain reconnaissance: DNS, ports, HTTP and screenshots", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Suppress status lines
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to configuration file (JSON or key=value)
    #[arg(long, global = true, value_name = "PATH", env = "DOMSCAN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory for reports, screenshots and the results file
    #[arg(long, global = true, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Also write log events to this file
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scan one or more domains
    #[command(alias = "s")]
    Scan(ScanCommand),

    /// Show or create the configuration file
    #[command(alias = "c")]
    Config(ConfigCommand),
}

impl Cli {
    /// Configuration file in effect: `--config`, else the per-user file,
    /// else `config.json` in the working directory.
    pub fn config_path(&self) -> PathBuf {
        match &self.config {
            Some(path) => path.clone(),
            None => Paths::new()
                .map(|paths| paths.config_file())
                .unwrap_or_else(|_| PathBuf::from(CONFIG_FILE_NAME)),
        }
    }

    /// Load the configuration and apply global overrides.
    ///
    /// A configuration file that fails to load is returned with the
    /// defaults; see [`ScanConfiguration::load_or_default`].
    pub fn load_configuration(&self, path: &Path) -> (ScanConfiguration, Option<ConfigError>) {
        let (mut config, error) = ScanConfiguration::load_or_default(path);
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        (config, error)
    }
}

/// Dispatch the parsed command line.
pub async fn run(cli: Cli, config: ScanConfiguration, config_path: &Path) -> CliResult<()> {
    match &cli.command {
        Commands::Scan(cmd) => cmd.execute(config, cli.quiet).await,
        Commands::Config(cmd) => cmd.execute(&config, config_path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_scan_command() {
        let cli = Cli::try_parse_from([
            "domscan",
            "-vv",
            "scan",
            "example.com,example.org",
            "--ports",
            "80,443",
            "--report",
            "pdf",
            "--skip-unresolved",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Scan(cmd) => {
                assert_eq!(cmd.domains, vec!["example.com,example.org"]);
                assert_eq!(cmd.ports.as_deref(), Some("80,443"));
                assert_eq!(cmd.report, Some(crate::report::ReportFormat::Pdf));
                assert!(cmd.skip_unresolved);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_explicit_config_path_wins() {
        let cli = Cli::try_parse_from(["domscan", "--config", "/tmp/x.json", "config", "path"]).unwrap();
        assert_eq!(cli.config_path(), PathBuf::from("/tmp/x.json"));
    }

    #[test]
    fn test_output_dir_override() {
        let dir = tempfile::tempdir().unwrap();
        let cli = Cli::try_parse_from(["domscan", "--output-dir", "elsewhere", "config", "show"]).unwrap();

        let (config, error) = cli.load_configuration(&dir.path().join("missing.json"));
        assert_eq!(config.output_dir, PathBuf::from("elsewhere"));
        assert!(error.is_none());
    }
}
