use anyhow::Context;
use clap::Parser;
use domscan::cli::{self, Cli};
use domscan::{logging, output};
use tracing::warn;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config_path();
    let (config, load_error) = cli.load_configuration(&config_path);

    logging::init_logging(config.log_level, cli.verbose, cli.log_file.as_deref())
        .context("failed to initialise logging")?;

    if let Some(e) = load_error {
        warn!(path = %config_path.display(), error = %e, "could not load configuration, using defaults");
    }

    if let Err(e) = cli::run(cli, config, &config_path).await {
        output::print_error(&e.to_string());
        std::process::exit(1);
    }
    Ok(())
}
