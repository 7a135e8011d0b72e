//! Config subcommand implementation.

use crate::config::ScanConfiguration;
use crate::error::{CliError, CliResult, ConfigError};
use crate::output;
use clap::{Parser, Subcommand};
use std::path::Path;

/// Show or create the configuration file.
#[derive(Parser, Debug)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the configuration in effect as JSON
    Show,

    /// Write the default configuration to the configuration path
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the configuration file path
    Path,
}

impl ConfigCommand {
    pub fn execute(&self, config: &ScanConfiguration, path: &Path) -> CliResult<()> {
        match self.action {
            ConfigAction::Show => {
                let json = serde_json::to_string_pretty(config).map_err(ConfigError::from)?;
                println!("{}", json);
            }
            ConfigAction::Init { force } => {
                if path.exists() && !force {
                    return Err(CliError::Other(format!(
                        "{} already exists (use --force to overwrite)",
                        path.display()
                    )));
                }
                ScanConfiguration::default().save(path)?;
                output::print_success(&format!("Configuration written to {}", path.display()));
            }
            ConfigAction::Path => println!("{}", path.display()),
        }

        Ok(())
    }
}
