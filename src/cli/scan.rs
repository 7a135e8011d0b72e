//! Scan subcommand implementation.
//!
//! Handles the `domscan scan <domains>...` command.

use crate::config::ScanConfiguration;
use crate::error::{CliError, CliResult};
use crate::http::HttpProber;
use crate::output;
use crate::pipeline::{Pipeline, PipelineSettings, StatusEvent, StatusSender, UnresolvedPolicy};
use crate::render::{ChromeRenderer, Device};
use crate::report::{FileReportGenerator, ReportFormat};
use crate::resolver::DomainResolver;
use crate::scanner::{PortProber, SynProber};
use crate::storage::CsvStore;
use crate::types::{parse_domain_list, Domain, PortSpec};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Scan one or more domains.
#[derive(Parser, Debug)]
pub struct ScanCommand {
    /// Domains to scan, comma or space separated
    ///
    /// Examples:
    ///   example.com
    ///   example.com,example.org
    ///   https://example.com/login
    #[arg(value_name = "DOMAINS")]
    pub domains: Vec<String>,

    /// Read domains from a file, one per line
    #[arg(short = 'f', long = "file", value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// Ports to probe (e.g., "80", "80,443", "8000-8010"); overrides the configuration
    #[arg(short, long)]
    pub ports: Option<String>,

    /// Report format (text or pdf)
    #[arg(short, long, value_name = "FORMAT")]
    pub report: Option<ReportFormat>,

    /// HTTP timeout in seconds
    #[arg(short = 't', long, value_name = "SECS")]
    pub timeout: Option<f64>,

    /// Skip screenshot capture
    #[arg(long)]
    pub no_screenshots: bool,

    /// Render in a visible browser window instead of headless
    #[arg(long)]
    pub full_browser: bool,

    /// Device to emulate for screenshots (android or apple)
    #[arg(long, value_name = "DEVICE")]
    pub device: Option<Device>,

    /// Number of domains processed at once
    #[arg(short = 'c', long)]
    pub concurrency: Option<usize>,

    /// Leave unresolvable domains out of the results
    #[arg(long)]
    pub skip_unresolved: bool,

    /// Network interface to send SYN probes from
    #[arg(short = 'i', long)]
    pub interface: Option<String>,

    /// Print the records as JSON instead of a table
    #[arg(long)]
    pub json: bool,

    /// Don't append to the results file
    #[arg(long)]
    pub no_save: bool,
}

impl ScanCommand {
    /// Execute the scan command.
    pub async fn execute(&self, config: ScanConfiguration, quiet: bool) -> CliResult<()> {
        let config = self.apply_overrides(config)?;
        let domains = self.collect_domains()?;

        let prober = match &self.interface {
            Some(iface) => SynProber::new(config.probe_timeout()).with_interface(iface),
            None => SynProber::new(config.probe_timeout()),
        };

        if prober.requires_privileges() && !is_root() {
            output::print_warning("SYN probing requires root/sudo privileges for raw socket access.");
            output::print_warning("Port results will be empty without them.");
        }

        if !quiet && !self.json {
            output::print_run_header(domains.len(), &config.ports, config.report_type.extension());
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let progress = spawn_progress(rx, domains.len(), quiet);

        let mut pipeline = Pipeline::new(
            Arc::new(DomainResolver::new(config.http_timeout())),
            Arc::new(prober),
            Arc::new(HttpProber::new(config.http_timeout(), config.retry_attempts)?),
            PipelineSettings::from(&config),
        )
        .with_reporter(Arc::new(FileReportGenerator::new(&config.output_dir)))
        .with_status(StatusSender::new(tx));

        if config.screenshots {
            pipeline = pipeline.with_renderer(Arc::new(ChromeRenderer::new(
                config.browser.clone(),
                config.output_dir.join("screenshots"),
                config.render_timeout(),
            )));
        }
        if !self.no_save {
            pipeline = pipeline.with_store(Arc::new(CsvStore::new(&config.output_dir)));
        }

        let cancel = CancellationToken::new();
        spawn_interrupt_handler(cancel.clone());

        let result = pipeline.run(&domains, &cancel).await;
        // Closing the channel lets the progress task finish.
        drop(pipeline);
        let _ = progress.await;

        let summary = result?;
        info!(run_id = %summary.run_id, records = summary.records.len(), "scan finished");

        if self.json {
            output::print_json(&summary.records)?;
        } else {
            output::print_records(&summary)?;
        }

        Ok(())
    }

    fn apply_overrides(&self, mut config: ScanConfiguration) -> CliResult<ScanConfiguration> {
        if let Some(ports) = &self.ports {
            config.ports = ports.parse::<PortSpec>()?.to_ports();
        }
        if let Some(report) = self.report {
            config.report_type = report;
        }
        if let Some(timeout) = self.timeout {
            config.timeout_seconds = timeout;
        }
        if let Some(device) = self.device {
            config.device = device;
        }
        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency;
        }
        if self.no_screenshots {
            config.screenshots = false;
        }
        if self.full_browser {
            config.headless = false;
        }
        if self.skip_unresolved {
            config.unresolved = UnresolvedPolicy::Skip;
        }

        config.validate()?;
        Ok(config)
    }

    fn collect_domains(&self) -> CliResult<Vec<Domain>> {
        let mut domains: Vec<Domain> = self
            .domains
            .iter()
            .flat_map(|arg| parse_domain_list(arg))
            .collect();

        if let Some(path) = &self.file {
            let content = fs::read_to_string(path).map_err(|e| CliError::DomainFile {
                path: path.clone(),
                reason: e.to_string(),
            })?;
            domains.extend(parse_domain_list(&content));
        }

        Ok(domains)
    }
}

/// Drain status events into a progress bar.
fn spawn_progress(
    mut rx: mpsc::UnboundedReceiver<StatusEvent>,
    total: usize,
    quiet: bool,
) -> JoinHandle<()> {
    let pb = if quiet {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new(total as u64);
        pb.set_style(
            ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.enable_steady_tick(Duration::from_millis(120));
        pb
    };

    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            if let StatusEvent::ScanStarting { domain, .. } = &event {
                pb.set_message(domain.to_string());
            }

            if !quiet {
                let line = output::status_line(&event);
                if pb.is_hidden() {
                    eprintln!("{}", line);
                } else {
                    pb.println(line);
                }
            }

            if matches!(
                event,
                StatusEvent::DomainComplete { .. } | StatusEvent::ResolutionFailed { .. }
            ) {
                pb.inc(1);
            }
        }
        pb.finish_and_clear();
    })
}

/// Cancel the run on Ctrl-C.
fn spawn_interrupt_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            output::print_warning("Interrupted, finishing the current step...");
            cancel.cancel();
        }
    });
}

/// Check if running with root/admin privileges.
fn is_root() -> bool {
    #[cfg(unix)]
    {
        unsafe { libc::geteuid() == 0 }
    }
    #[cfg(not(unix))]
    {
        false
    }
}
