//! Progress events emitted while a run is in flight.

use crate::types::{Domain, RunId};
use std::fmt;
use std::net::IpAddr;
use std::path::PathBuf;
use tokio::sync::mpsc::UnboundedSender;

/// One human-readable step of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusEvent {
    RunStarted { run_id: RunId, domains: usize },
    ScanStarting { domain: Domain, index: usize, total: usize },
    Resolved { domain: Domain, ip: IpAddr },
    ResolutionFailed { domain: Domain, error: String },
    PortsScanned { domain: Domain, open: Vec<u16>, probed: usize },
    PortScanFailed { domain: Domain, error: String },
    HttpProbed { domain: Domain, status: String },
    HttpProbeFailed { domain: Domain, error: String },
    ScreenshotCaptured { domain: Domain, path: PathBuf },
    ScreenshotFailed { domain: Domain, error: String },
    DomainComplete { domain: Domain },
    Cancelled { completed: usize, total: usize },
    ReportWritten { path: PathBuf },
    ReportFailed { error: String },
    NothingToReport,
    ResultsStored { path: PathBuf },
    StoreFailed { error: String },
    RunFinished { records: usize },
}

impl StatusEvent {
    /// Whether this event reports a degraded stage.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Self::ResolutionFailed { .. }
                | Self::PortScanFailed { .. }
                | Self::HttpProbeFailed { .. }
                | Self::ScreenshotFailed { .. }
                | Self::ReportFailed { .. }
                | Self::StoreFailed { .. }
        )
    }
}

impl fmt::Display for StatusEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RunStarted { run_id, domains } => {
                write!(f, "Run {} started for {} domain(s)", run_id.short(), domains)
            }
            Self::ScanStarting { domain, index, total } => {
                write!(f, "[{}/{}] Starting scan for {}...", index + 1, total, domain)
            }
            Self::Resolved { domain, ip } => write!(f, "Resolved IP for {}: {}", domain, ip),
            Self::ResolutionFailed { domain, error } => {
                write!(f, "Failed to resolve IP for {}: {}", domain, error)
            }
            Self::PortsScanned { domain, open, probed } => {
                if open.is_empty() {
                    write!(f, "Port scan results for {}: no open ports ({} probed)", domain, probed)
                } else {
                    let open: Vec<String> = open.iter().map(u16::to_string).collect();
                    write!(
                        f,
                        "Port scan results for {}: open {} ({} probed)",
                        domain,
                        open.join(", "),
                        probed
                    )
                }
            }
            Self::PortScanFailed { domain, error } => {
                write!(f, "Port scan failed for {}: {}", domain, error)
            }
            Self::HttpProbed { domain, status } => {
                write!(f, "HTTP status code for {}: {}", domain, status)
            }
            Self::HttpProbeFailed { domain, error } => {
                write!(f, "HTTP probe failed for {}: {}", domain, error)
            }
            Self::ScreenshotCaptured { domain, path } => {
                write!(f, "Screenshot for {} saved to {}", domain, path.display())
            }
            Self::ScreenshotFailed { domain, error } => {
                write!(f, "Screenshot failed for {}: {}", domain, error)
            }
            Self::DomainComplete { domain } => write!(f, "Finished {}", domain),
            Self::Cancelled { completed, total } => {
                write!(f, "Scan cancelled after {} of {} domain(s)", completed, total)
            }
            Self::ReportWritten { path } => {
                write!(f, "Report generated successfully: {}", path.display())
            }
            Self::ReportFailed { error } => write!(f, "Report generation failed: {}", error),
            Self::NothingToReport => write!(f, "No valid results to report."),
            Self::ResultsStored { path } => write!(f, "Results saved to {}", path.display()),
            Self::StoreFailed { error } => write!(f, "Saving results failed: {}", error),
            Self::RunFinished { records } => write!(f, "Scan complete: {} record(s)", records),
        }
    }
}

/// Optional sink for status events.
///
/// A run without a listener, or whose listener went away, still completes.
#[derive(Debug, Clone, Default)]
pub struct StatusSender(Option<UnboundedSender<StatusEvent>>);

impl StatusSender {
    pub fn new(tx: UnboundedSender<StatusEvent>) -> Self {
        Self(Some(tx))
    }

    pub fn disabled() -> Self {
        Self(None)
    }

    pub fn emit(&self, event: StatusEvent) {
        if let Some(tx) = &self.0 {
            let _ = tx.send(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[test]
    fn test_messages() {
        let domain = Domain::new("example.com");

        let starting = StatusEvent::ScanStarting {
            domain: domain.clone(),
            index: 0,
            total: 2,
        };
        assert_eq!(starting.to_string(), "[1/2] Starting scan for example.com...");

        let scanned = StatusEvent::PortsScanned {
            domain,
            open: vec![80, 443],
            probed: 4,
        };
        assert_eq!(
            scanned.to_string(),
            "Port scan results for example.com: open 80, 443 (4 probed)"
        );
    }

    #[test]
    fn test_failure_classification() {
        assert!(StatusEvent::ReportFailed { error: "disk full".into() }.is_failure());
        assert!(!StatusEvent::NothingToReport.is_failure());
    }

    #[tokio::test]
    async fn test_sender_survives_dropped_receiver() {
        let (tx, rx) = mpsc::unbounded_channel();
        let sender = StatusSender::new(tx);
        drop(rx);

        sender.emit(StatusEvent::NothingToReport);
        StatusSender::disabled().emit(StatusEvent::NothingToReport);
    }

    #[tokio::test]
    async fn test_sender_delivers_in_order() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sender = StatusSender::new(tx);

        sender.emit(StatusEvent::NothingToReport);
        sender.emit(StatusEvent::RunFinished { records: 1 });

        tokio_test::assert_ready_eq!(
            tokio_test::task::spawn(rx.recv()).poll(),
            Some(StatusEvent::NothingToReport)
        );
        assert_eq!(rx.recv().await, Some(StatusEvent::RunFinished { records: 1 }));
    }
}
