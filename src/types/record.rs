//! Per-domain result records.

use crate::http::describe_status;
use crate::scanner::PortStatusMap;
use crate::types::Domain;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

/// Placeholder written wherever a stage produced nothing.
pub const NOT_AVAILABLE: &str = "N/A";

/// Outcome of the HTTP stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpProbeResult {
    /// `None` means the probe failed outright.
    pub status_code: Option<u16>,
    pub description: String,
    pub final_url: Option<String>,
}

impl HttpProbeResult {
    /// Result for a response with `code`, described from the status table.
    pub fn from_status(code: u16, final_url: Option<String>) -> Self {
        Self {
            status_code: Some(code),
            description: describe_status(code).to_string(),
            final_url,
        }
    }

    /// Sentinel for a probe that never got a response.
    pub fn failed() -> Self {
        Self {
            status_code: None,
            description: NOT_AVAILABLE.to_string(),
            final_url: None,
        }
    }

    pub fn is_failed(&self) -> bool {
        self.status_code.is_none()
    }

    /// Status code as text, `N/A` when absent.
    pub fn code_label(&self) -> String {
        self.status_code
            .map(|code| code.to_string())
            .unwrap_or_else(|| NOT_AVAILABLE.to_string())
    }
}

impl Default for HttpProbeResult {
    fn default() -> Self {
        Self::failed()
    }
}

/// Everything learned about one domain in one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanRecord {
    pub domain: Domain,
    pub ip_address: Option<IpAddr>,
    pub port_status: PortStatusMap,
    pub http_result: HttpProbeResult,
    pub screenshot_path: Option<PathBuf>,
    pub redirected_url: Option<String>,
    pub scan_timestamp: DateTime<Utc>,
}

impl ScanRecord {
    /// Empty record for `domain`; every stage field starts at its sentinel.
    pub fn new(domain: Domain, scan_timestamp: DateTime<Utc>) -> Self {
        Self {
            domain,
            ip_address: None,
            port_status: PortStatusMap::new(),
            http_result: HttpProbeResult::failed(),
            screenshot_path: None,
            redirected_url: None,
            scan_timestamp,
        }
    }

    pub fn ip_label(&self) -> String {
        self.ip_address
            .map(|ip| ip.to_string())
            .unwrap_or_else(|| NOT_AVAILABLE.to_string())
    }

    pub fn screenshot_label(&self) -> String {
        self.screenshot_path
            .as_ref()
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| NOT_AVAILABLE.to_string())
    }

    pub fn redirected_label(&self) -> &str {
        self.redirected_url.as_deref().unwrap_or(NOT_AVAILABLE)
    }
}
