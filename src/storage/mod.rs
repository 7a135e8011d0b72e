//! Scan result persistence.
//!
//! Results accumulate across runs in a single append-only CSV file.

mod csv_store;

pub use csv_store::{CsvStore, RESULTS_FILE_NAME};

use crate::error::StoreResult;
use crate::types::ScanRecord;
use std::path::PathBuf;

/// Anything that can persist a run's records.
pub trait ResultStore: Send + Sync {
    /// Append `records` and return where they were written.
    fn append(&self, records: &[ScanRecord]) -> StoreResult<PathBuf>;
}
