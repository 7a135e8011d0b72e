//! Error types for domscan.
//!
//! Uses `thiserror` for ergonomic error definitions. Every pipeline stage has
//! its own error type so the orchestrator can degrade each one independently.

use std::path::PathBuf;
use thiserror::Error;

/// Failure to turn a domain into an IP address.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    #[error("domain does not exist: {0}")]
    NxDomain(String),

    #[error("timed out resolving {0}")]
    Timeout(String),

    #[error("no nameservers available for {0}")]
    NoNameservers(String),

    #[error("invalid domain: {0:?}")]
    InvalidDomain(String),

    #[error("resolution failed for {domain}: {reason}")]
    Other { domain: String, reason: String },
}

/// Port scan failures. Individual probe timeouts are not errors; these are
/// the conditions that prevent a scan from running at all.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Raw socket error: {0}")]
    RawSocketError(String),

    #[error("Invalid packet: {0}")]
    InvalidPacket(String),

    #[error("Unsupported target {0}: SYN probing only supports IPv4")]
    UnsupportedAddress(std::net::IpAddr),

    #[error("No source address available: {0}")]
    NoSourceAddress(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// HTTP probe failures at the transport level.
#[derive(Error, Debug)]
pub enum HttpProbeError {
    #[error("invalid URL {0:?}")]
    InvalidUrl(String),

    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("could not connect to {url}: {reason}")]
    Connect { url: String, reason: String },

    #[error("request to {url} failed: {reason}")]
    Request { url: String, reason: String },

    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

/// Screenshot capture failures.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("failed to launch browser {binary}: {reason}")]
    Launch { binary: String, reason: String },

    #[error("browser exited with {status}: {stderr}")]
    BrowserFailed { status: String, stderr: String },

    #[error("render timed out after {0}s")]
    Timeout(u64),

    #[error("browser produced no screenshot at {0}")]
    MissingOutput(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Report generation failures.
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("no records to report")]
    Empty,

    #[error("failed to write report {path}: {reason}")]
    WriteFailed { path: PathBuf, reason: String },
}

/// Persistent result store failures.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("failed to create output directory: {0}")]
    DirectoryError(String),

    #[error("failed to save results: {0}")]
    SaveFailed(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not determine configuration directory")]
    DirectoryNotFound,

    #[error("failed to read {path}: {reason}")]
    ReadFailed { path: PathBuf, reason: String },

    #[error("failed to write {path}: {reason}")]
    WriteFailed { path: PathBuf, reason: String },

    #[error("invalid configuration format: {0}")]
    InvalidFormat(String),

    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: String, value: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Pipeline-level fatal errors. Stage failures never surface here.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("no domains to scan")]
    NoDomains,
}

/// Errors surfaced by the command-line front end.
#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error(transparent)]
    Port(#[from] crate::types::PortError),

    #[error(transparent)]
    Http(#[from] HttpProbeError),

    #[error("failed to read domain list {path}: {reason}")]
    DomainFile { path: PathBuf, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

pub type ResolutionResult<T> = Result<T, ResolutionError>;
pub type ProbeResult<T> = Result<T, ProbeError>;
pub type HttpResult<T> = Result<T, HttpProbeError>;
pub type RenderResult<T> = Result<T, RenderError>;
pub type ReportResult<T> = Result<T, ReportError>;
pub type StoreResult<T> = Result<T, StoreError>;
pub type ConfigResult<T> = Result<T, ConfigError>;
pub type CliResult<T> = Result<T, CliError>;
