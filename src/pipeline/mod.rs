//! Reconnaissance pipeline.
//!
//! Drives every domain through resolve, port scan, HTTP probe and render, in
//! that order. A failing stage leaves its field of the record at the sentinel
//! and the domain moves on; only a resolution failure skips the remaining
//! stages. Once every domain is done the records go to the report generator
//! and the result store, both best-effort.

pub mod status;

pub use status::{StatusEvent, StatusSender};

use crate::config::ScanConfiguration;
use crate::error::PipelineError;
use crate::http::HttpProbe;
use crate::render::{Device, Renderer};
use crate::report::{ReportFormat, ReportGenerator};
use crate::resolver::Resolve;
use crate::scanner::{pause, PortProber};
use crate::storage::ResultStore;
use crate::types::{Domain, HttpProbeResult, RunId, ScanRecord};
use chrono::Utc;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, warn, Instrument};

/// What happens to a domain that cannot be resolved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum UnresolvedPolicy {
    /// Emit a record with every field at its sentinel, so the output has one
    /// record per input domain.
    #[default]
    Record,
    /// Leave the domain out of the output.
    Skip,
}

impl fmt::Display for UnresolvedPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Record => f.write_str("record"),
            Self::Skip => f.write_str("skip"),
        }
    }
}

impl FromStr for UnresolvedPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "record" => Ok(Self::Record),
            "skip" => Ok(Self::Skip),
            other => Err(format!("unknown policy {:?} (expected record or skip)", other)),
        }
    }
}

impl TryFrom<String> for UnresolvedPolicy {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Knobs that shape a run.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    pub ports: Vec<u16>,
    pub port_delay: Duration,
    pub domain_delay: Duration,
    pub headless: bool,
    pub device: Device,
    pub concurrency: usize,
    pub unresolved: UnresolvedPolicy,
    pub report_format: ReportFormat,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from(&ScanConfiguration::default())
    }
}

impl From<&ScanConfiguration> for PipelineSettings {
    fn from(config: &ScanConfiguration) -> Self {
        Self {
            ports: config.ports.clone(),
            port_delay: config.port_delay(),
            domain_delay: config.domain_delay(),
            headless: config.headless,
            device: config.device,
            concurrency: config.concurrency.max(1),
            unresolved: config.unresolved,
            report_format: config.report_type,
        }
    }
}

/// Outcome of a run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: RunId,
    /// Records in input order.
    pub records: Vec<ScanRecord>,
    pub report_path: Option<PathBuf>,
    pub store_path: Option<PathBuf>,
    pub cancelled: bool,
}

/// The per-domain reconnaissance pipeline.
pub struct Pipeline {
    resolver: Arc<dyn Resolve>,
    prober: Arc<dyn PortProber>,
    http: Arc<dyn HttpProbe>,
    renderer: Option<Arc<dyn Renderer>>,
    reporter: Option<Arc<dyn ReportGenerator>>,
    store: Option<Arc<dyn ResultStore>>,
    settings: PipelineSettings,
    status: StatusSender,
}

impl Pipeline {
    pub fn new(
        resolver: Arc<dyn Resolve>,
        prober: Arc<dyn PortProber>,
        http: Arc<dyn HttpProbe>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            resolver,
            prober,
            http,
            renderer: None,
            reporter: None,
            store: None,
            settings,
            status: StatusSender::disabled(),
        }
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn Renderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn ReportGenerator>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    pub fn with_store(mut self, store: Arc<dyn ResultStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_status(mut self, status: StatusSender) -> Self {
        self.status = status;
        self
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Run every domain through the pipeline.
    ///
    /// With `concurrency` 1 domains are processed strictly one after another
    /// with the domain delay in between; with more, each worker paces itself.
    /// Either way the returned records follow input order. Cancellation stops
    /// new domains from starting; records finished so far are still reported
    /// and stored.
    pub async fn run(
        &self,
        domains: &[Domain],
        cancel: &CancellationToken,
    ) -> Result<RunSummary, PipelineError> {
        if domains.is_empty() {
            return Err(PipelineError::NoDomains);
        }

        let run_id = RunId::new();
        let span = info_span!("run", run_id = %run_id.short());

        self.run_inner(run_id, domains, cancel).instrument(span).await
    }

    async fn run_inner(
        &self,
        run_id: RunId,
        domains: &[Domain],
        cancel: &CancellationToken,
    ) -> Result<RunSummary, PipelineError> {
        let total = domains.len();
        info!(domains = total, concurrency = self.settings.concurrency, "run started");
        self.status.emit(StatusEvent::RunStarted {
            run_id,
            domains: total,
        });

        let mut outcomes: Vec<(usize, DomainOutcome)> = stream::iter(domains.iter().enumerate())
            .map(|(index, domain)| async move {
                if cancel.is_cancelled() {
                    return (index, DomainOutcome::NotStarted);
                }

                let outcome = self.scan_domain(index, total, domain, cancel).await;

                if index + 1 < total {
                    pause(self.settings.domain_delay, cancel).await;
                }
                (index, outcome)
            })
            .buffer_unordered(self.settings.concurrency.max(1))
            .collect()
            .await;

        outcomes.sort_by_key(|(index, _)| *index);

        let started = outcomes
            .iter()
            .filter(|(_, outcome)| !matches!(outcome, DomainOutcome::NotStarted))
            .count();
        let records: Vec<ScanRecord> = outcomes
            .into_iter()
            .filter_map(|(_, outcome)| match outcome {
                DomainOutcome::Recorded(record) => Some(*record),
                DomainOutcome::Skipped | DomainOutcome::NotStarted => None,
            })
            .collect();

        let cancelled = cancel.is_cancelled();
        if cancelled {
            warn!(started, total, "run cancelled");
            self.status.emit(StatusEvent::Cancelled {
                completed: started,
                total,
            });
        }

        let report_path = self.write_report(&records, &run_id);
        let store_path = self.store_results(&records);

        info!(records = records.len(), "run finished");
        self.status.emit(StatusEvent::RunFinished {
            records: records.len(),
        });

        Ok(RunSummary {
            run_id,
            records,
            report_path,
            store_path,
            cancelled,
        })
    }

    async fn scan_domain(
        &self,
        index: usize,
        total: usize,
        domain: &Domain,
        cancel: &CancellationToken,
    ) -> DomainOutcome {
        let span = info_span!("domain", domain = %domain, n = index + 1);

        async {
            self.status.emit(StatusEvent::ScanStarting {
                domain: domain.clone(),
                index,
                total,
            });
            let mut record = ScanRecord::new(domain.clone(), Utc::now());

            let ip = match self.resolver.resolve(domain).await {
                Ok(ip) => ip,
                Err(e) => {
                    warn!(error = %e, policy = %self.settings.unresolved, "resolution failed");
                    self.status.emit(StatusEvent::ResolutionFailed {
                        domain: domain.clone(),
                        error: e.to_string(),
                    });
                    return match self.settings.unresolved {
                        UnresolvedPolicy::Record => DomainOutcome::Recorded(Box::new(record)),
                        UnresolvedPolicy::Skip => DomainOutcome::Skipped,
                    };
                }
            };

            record.ip_address = Some(ip);
            self.status.emit(StatusEvent::Resolved {
                domain: domain.clone(),
                ip,
            });

            match self
                .prober
                .scan(ip, &self.settings.ports, self.settings.port_delay, cancel)
                .await
            {
                Ok(ports) => {
                    info!(probed = ports.len(), open = ?ports.open_ports(), "port scan complete");
                    self.status.emit(StatusEvent::PortsScanned {
                        domain: domain.clone(),
                        open: ports.open_ports(),
                        probed: ports.len(),
                    });
                    record.port_status = ports;
                }
                Err(e) => {
                    warn!(error = %e, "port scan failed");
                    self.status.emit(StatusEvent::PortScanFailed {
                        domain: domain.clone(),
                        error: e.to_string(),
                    });
                }
            }

            if cancel.is_cancelled() {
                return DomainOutcome::Recorded(Box::new(record));
            }

            record.http_result = match self.http.probe(domain).await {
                Ok(result) if !result.is_failed() => {
                    self.status.emit(StatusEvent::HttpProbed {
                        domain: domain.clone(),
                        status: format!("{} ({})", result.code_label(), result.description),
                    });
                    result
                }
                Ok(_) => {
                    warn!("HTTP probe returned no status");
                    self.status.emit(StatusEvent::HttpProbeFailed {
                        domain: domain.clone(),
                        error: "no response".to_string(),
                    });
                    HttpProbeResult::failed()
                }
                Err(e) => {
                    warn!(error = %e, "HTTP probe failed");
                    self.status.emit(StatusEvent::HttpProbeFailed {
                        domain: domain.clone(),
                        error: e.to_string(),
                    });
                    HttpProbeResult::failed()
                }
            };

            if cancel.is_cancelled() {
                return DomainOutcome::Recorded(Box::new(record));
            }

            match &self.renderer {
                Some(renderer) => {
                    let url = record
                        .http_result
                        .final_url
                        .clone()
                        .unwrap_or_else(|| domain.url());

                    match renderer
                        .capture(domain, &url, self.settings.headless, self.settings.device)
                        .await
                    {
                        Ok(output) => {
                            self.status.emit(StatusEvent::ScreenshotCaptured {
                                domain: domain.clone(),
                                path: output.screenshot_path.clone(),
                            });
                            record.screenshot_path = Some(output.screenshot_path);
                            record.redirected_url = Some(output.final_url);
                        }
                        Err(e) => {
                            warn!(error = %e, %url, "screenshot failed");
                            self.status.emit(StatusEvent::ScreenshotFailed {
                                domain: domain.clone(),
                                error: e.to_string(),
                            });
                        }
                    }
                }
                None => record.redirected_url = record.http_result.final_url.clone(),
            }

            self.status.emit(StatusEvent::DomainComplete {
                domain: domain.clone(),
            });
            DomainOutcome::Recorded(Box::new(record))
        }
        .instrument(span)
        .await
    }

    fn write_report(&self, records: &[ScanRecord], run_id: &RunId) -> Option<PathBuf> {
        let reporter = self.reporter.as_ref()?;

        if records.is_empty() {
            self.status.emit(StatusEvent::NothingToReport);
            return None;
        }

        match reporter.generate(records, self.settings.report_format, run_id) {
            Ok(path) => {
                self.status.emit(StatusEvent::ReportWritten { path: path.clone() });
                Some(path)
            }
            Err(e) => {
                warn!(error = %e, "report generation failed");
                self.status.emit(StatusEvent::ReportFailed {
                    error: e.to_string(),
                });
                None
            }
        }
    }

    fn store_results(&self, records: &[ScanRecord]) -> Option<PathBuf> {
        let store = self.store.as_ref()?;

        if records.is_empty() {
            return None;
        }

        match store.append(records) {
            Ok(path) => {
                self.status.emit(StatusEvent::ResultsStored { path: path.clone() });
                Some(path)
            }
            Err(e) => {
                warn!(error = %e, "storing results failed");
                self.status.emit(StatusEvent::StoreFailed {
                    error: e.to_string(),
                });
                None
            }
        }
    }
}

enum DomainOutcome {
    Recorded(Box<ScanRecord>),
    Skipped,
    NotStarted,
}
