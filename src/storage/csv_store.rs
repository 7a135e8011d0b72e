//! CSV-based scan result storage.
//!
//! Every run appends one row per domain to the same file. The header row is
//! written only when the file is created, so the file stays a single valid
//! CSV table across runs.

use super::ResultStore;
use crate::error::{StoreError, StoreResult};
use crate::types::{ScanRecord, NOT_AVAILABLE};
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::info;

/// File name of the store inside the output directory.
pub const RESULTS_FILE_NAME: &str = "scan_results.csv";

const SCAN_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One row of the results file.
#[derive(Debug, Serialize)]
struct ResultRow<'a> {
    #[serde(rename = "Domain Name")]
    domain: &'a str,
    #[serde(rename = "Scan Date")]
    scan_date: String,
    #[serde(rename = "Port Status")]
    port_status: String,
    #[serde(rename = "HTTP Status Code")]
    status_code: String,
    #[serde(rename = "HTTP Status Description")]
    status_description: &'a str,
    #[serde(rename = "Additional Info")]
    additional_info: String,
    #[serde(rename = "Type of Phishing")]
    classification: &'a str,
}

impl<'a> From<&'a ScanRecord> for ResultRow<'a> {
    fn from(record: &'a ScanRecord) -> Self {
        Self {
            domain: record.domain.as_str(),
            scan_date: record.scan_timestamp.format(SCAN_DATE_FORMAT).to_string(),
            port_status: record.port_status.to_compact_string(),
            status_code: record.http_result.code_label(),
            status_description: &record.http_result.description,
            additional_info: record.screenshot_label(),
            classification: NOT_AVAILABLE,
        }
    }
}

/// Append-only CSV result store.
#[derive(Debug, Clone)]
pub struct CsvStore {
    path: PathBuf,
}

impl CsvStore {
    /// Store at `<output_dir>/scan_results.csv`.
    pub fn new(output_dir: impl AsRef<Path>) -> Self {
        Self::with_path(output_dir.as_ref().join(RESULTS_FILE_NAME))
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ResultStore for CsvStore {
    fn append(&self, records: &[ScanRecord]) -> StoreResult<PathBuf> {
        if records.is_empty() {
            return Ok(self.path.clone());
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| StoreError::DirectoryError(e.to_string()))?;
        }

        let write_header = !self.path.exists();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(write_header)
            .from_writer(file);

        for record in records {
            writer.serialize(ResultRow::from(record))?;
        }
        writer
            .flush()
            .map_err(|e| StoreError::SaveFailed(e.to_string()))?;

        info!(path = %self.path.display(), rows = records.len(), "results appended");
        Ok(self.path.clone())
    }
}
