//! # domscan - Domain Reconnaissance
//!
//! domscan takes a list of domains and, for each one, resolves it, probes a
//! set of TCP ports with half-open SYN probes, fetches the HTTP status after
//! redirects and captures a screenshot of the rendered page. The per-domain
//! records are written to a text or PDF report and appended to a CSV file.
//!
//! ## Features
//!
//! - **Two-step Resolution**: Platform resolver first, then a direct `A` query
//! - **Paced SYN Probing**: One port at a time with a fixed pause in between
//! - **HTTP Status**: HEAD with GET fallback, redirects followed
//! - **Screenshots**: Headless Chromium with Android or iPhone emulation
//! - **Partial-failure Tolerance**: A failing stage never drops the domain
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use domscan::pipeline::{Pipeline, PipelineSettings};
//! use domscan::resolver::DomainResolver;
//! use domscan::scanner::SynProber;
//! use domscan::http::HttpProber;
//! use domscan::types::Domain;
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let pipeline = Pipeline::new(
//!         Arc::new(DomainResolver::default()),
//!         Arc::new(SynProber::default()),
//!         Arc::new(HttpProber::new(Duration::from_secs(5), 3)?),
//!         PipelineSettings::default(),
//!     );
//!
//!     let summary = pipeline
//!         .run(&[Domain::new("example.com")], &CancellationToken::new())
//!         .await?;
//!     println!("{:?}", summary.records);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`types`] - Domains, port specs, run IDs and result records
//! - [`resolver`] - Domain to IP resolution with ordered fallback
//! - [`scanner`] - SYN prober and the paced sequential scan driver
//! - [`http`] - HTTP status prober
//! - [`render`] - Screenshot capture
//! - [`pipeline`] - Per-domain orchestration and status events
//! - [`report`] - Text and PDF reports
//! - [`storage`] - Append-only CSV result store
//! - [`config`] - Run configuration
//! - [`error`] - Error types
//! - [`output`] - Terminal formatting

pub mod cli;
pub mod config;
pub mod error;
pub mod http;
pub mod logging;
pub mod output;
pub mod pipeline;
pub mod render;
pub mod report;
pub mod resolver;
pub mod scanner;
pub mod storage;
pub mod types;

// Re-export commonly used types
pub use config::ScanConfiguration;
pub use error::{CliError, PipelineError};
pub use pipeline::{Pipeline, PipelineSettings, RunSummary, StatusEvent};
pub use scanner::{PortProber, PortState, PortStatusMap};
pub use types::{Domain, HttpProbeResult, PortSpec, RunId, ScanRecord};
