//! Report generation.
//!
//! Both formats render the same line-oriented content: a section per domain
//! followed by a summary. The text form writes the lines as-is; the PDF form
//! paginates them and colors the port lines.

pub mod pdf;
pub mod text;

use crate::error::{ReportError, ReportResult};
use crate::types::{RunId, ScanRecord};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::info;

pub use pdf::render_pdf;
pub use text::{render_text, report_lines};

/// Timestamp layout used in report file names.
pub const REPORT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Report output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum ReportFormat {
    #[default]
    Text,
    Pdf,
}

impl ReportFormat {
    /// File extension of a report in this format.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Pdf => "pdf",
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            // Older configuration files carry "json", which never had a
            // report writer of its own.
            "text" | "txt" | "json" => Ok(Self::Text),
            "pdf" => Ok(Self::Pdf),
            other => Err(format!("unsupported report type {:?} (expected text or pdf)", other)),
        }
    }
}

impl TryFrom<String> for ReportFormat {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// How a report line is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineStyle {
    Title,
    Heading,
    Body,
    PortOpen,
    PortClosed,
}

/// One line of report content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportLine {
    pub text: String,
    pub style: LineStyle,
}

impl ReportLine {
    pub fn new(text: impl Into<String>, style: LineStyle) -> Self {
        Self {
            text: text.into(),
            style,
        }
    }

    pub fn body(text: impl Into<String>) -> Self {
        Self::new(text, LineStyle::Body)
    }

    pub fn blank() -> Self {
        Self::body("")
    }
}

/// Anything that turns a run's records into a report file.
pub trait ReportGenerator: Send + Sync {
    fn generate(
        &self,
        records: &[ScanRecord],
        format: ReportFormat,
        run_id: &RunId,
    ) -> ReportResult<PathBuf>;
}

/// Report file name for run `run_id` generated at `generated_at`.
///
/// The run ID keeps two runs finishing in the same second apart.
pub fn report_file_name(
    format: ReportFormat,
    generated_at: DateTime<Utc>,
    run_id: &RunId,
) -> String {
    format!(
        "scan_report_{}_{}.{}",
        generated_at.format(REPORT_TIMESTAMP_FORMAT),
        run_id.short(),
        format.extension()
    )
}

/// Writes reports into a directory.
#[derive(Debug, Clone)]
pub struct FileReportGenerator {
    output_dir: PathBuf,
}

impl FileReportGenerator {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Generate with an explicit timestamp.
    pub fn generate_at(
        &self,
        records: &[ScanRecord],
        format: ReportFormat,
        run_id: &RunId,
        generated_at: DateTime<Utc>,
    ) -> ReportResult<PathBuf> {
        if records.is_empty() {
            return Err(ReportError::Empty);
        }

        let path = self.output_dir.join(report_file_name(format, generated_at, run_id));
        let write_failed = |e: std::io::Error| ReportError::WriteFailed {
            path: path.clone(),
            reason: e.to_string(),
        };

        fs::create_dir_all(&self.output_dir).map_err(write_failed)?;

        let lines = report_lines(records, generated_at);
        match format {
            ReportFormat::Text => fs::write(&path, text::lines_to_text(&lines)),
            ReportFormat::Pdf => fs::write(&path, render_pdf(&lines)),
        }
        .map_err(write_failed)?;

        info!(path = %path.display(), %format, records = records.len(), "report written");
        Ok(path)
    }
}

impl ReportGenerator for FileReportGenerator {
    fn generate(
        &self,
        records: &[ScanRecord],
        format: ReportFormat,
        run_id: &RunId,
    ) -> ReportResult<PathBuf> {
        self.generate_at(records, format, run_id, Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Domain;
    use chrono::TimeZone;
    use tempfile::tempdir;

    fn generated_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 5).unwrap()
    }

    fn records() -> Vec<ScanRecord> {
        vec![ScanRecord::new(Domain::new("example.com"), generated_at())]
    }

    #[test]
    fn test_report_format_parsing() {
        assert_eq!("TEXT".parse::<ReportFormat>().unwrap(), ReportFormat::Text);
        assert_eq!("json".parse::<ReportFormat>().unwrap(), ReportFormat::Text);
        assert_eq!("pdf".parse::<ReportFormat>().unwrap(), ReportFormat::Pdf);
        assert!("docx".parse::<ReportFormat>().is_err());
    }

    #[test]
    fn test_report_file_name() {
        let run_id = RunId::new();
        assert_eq!(
            report_file_name(ReportFormat::Text, generated_at(), &run_id),
            format!("scan_report_2024-05-01_12-30-05_{}.text", run_id.short())
        );
        assert_eq!(
            report_file_name(ReportFormat::Pdf, generated_at(), &run_id),
            format!("scan_report_2024-05-01_12-30-05_{}.pdf", run_id.short())
        );
    }

    #[test]
    fn test_runs_in_the_same_second_keep_separate_reports() {
        let dir = tempdir().unwrap();
        let generator = FileReportGenerator::new(dir.path());

        let first = generator
            .generate_at(&records(), ReportFormat::Text, &RunId::new(), generated_at())
            .unwrap();
        let second = generator
            .generate_at(&records(), ReportFormat::Text, &RunId::new(), generated_at())
            .unwrap();

        assert_ne!(first, second);
        assert!(first.exists());
        assert!(second.exists());
        assert_eq!(
            fs::read_to_string(&first).unwrap(),
            fs::read_to_string(&second).unwrap()
        );
    }

    #[test]
    fn test_generate_text_report() {
        let dir = tempdir().unwrap();
        let generator = FileReportGenerator::new(dir.path().join("out"));

        let run_id = RunId::new();
        let path = generator
            .generate_at(&records(), ReportFormat::Text, &run_id, generated_at())
            .unwrap();

        assert_eq!(
            path.file_name().unwrap().to_string_lossy(),
            format!("scan_report_2024-05-01_12-30-05_{}.text", run_id.short())
        );
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("Scan Report\n"));
        assert!(content.contains("Domain: example.com"));
    }

    #[test]
    fn test_generate_pdf_report() {
        let dir = tempdir().unwrap();
        let generator = FileReportGenerator::new(dir.path());

        let path = generator
            .generate_at(&records(), ReportFormat::Pdf, &RunId::new(), generated_at())
            .unwrap();

        let bytes = fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"%PDF-1.4"));
    }

    #[test]
    fn test_generation_is_repeatable() {
        let dir = tempdir().unwrap();
        let generator = FileReportGenerator::new(dir.path());
        let run_id = RunId::new();

        let first = generator
            .generate_at(&records(), ReportFormat::Pdf, &run_id, generated_at())
            .map(|p| fs::read(p).unwrap())
            .unwrap();
        let second = generator
            .generate_at(&records(), ReportFormat::Pdf, &run_id, generated_at())
            .map(|p| fs::read(p).unwrap())
            .unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_records_are_rejected() {
        let dir = tempdir().unwrap();
        let generator = FileReportGenerator::new(dir.path());

        let result = generator.generate(&[], ReportFormat::Text, &RunId::new());
        assert!(matches!(result, Err(ReportError::Empty)));
    }
}
