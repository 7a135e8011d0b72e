//! Scan configuration and paths.
//!
//! The configuration is read once per run and handed to the pipeline as a
//! plain value. Two on-disk forms are accepted: a JSON document and flat
//! `key=value` lines.

use crate::error::{ConfigError, ConfigResult};
use crate::http::DEFAULT_HTTP_TIMEOUT;
use crate::pipeline::UnresolvedPolicy;
use crate::render::{Device, DEFAULT_RENDER_TIMEOUT};
use crate::report::ReportFormat;
use crate::scanner::{DEFAULT_PROBE_DELAY, DEFAULT_PROBE_TIMEOUT};
use crate::types::PortSpec;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

/// File name of the configuration inside the config directory.
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Application directory paths following the XDG Base Directory layout.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Configuration directory (~/.config/domscan)
    pub config_dir: PathBuf,
}

impl Paths {
    pub fn new() -> ConfigResult<Self> {
        let project = ProjectDirs::from("com", "domscan", "domscan")
            .ok_or(ConfigError::DirectoryNotFound)?;

        Ok(Self {
            config_dir: project.config_dir().to_path_buf(),
        })
    }

    /// Get the path to the configuration file.
    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE_NAME)
    }
}

/// Verbosity of the log output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Directive understood by `tracing_subscriber::EnvFilter`.
    pub fn as_filter(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_filter())
    }
}

impl FromStr for LogLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" | "trace" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" | "critical" => Ok(Self::Error),
            _ => Err(ConfigError::InvalidValue {
                key: "log_level".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for LogLevel {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, ConfigError> {
        value.parse()
    }
}

/// Everything a run needs to know, resolved before the pipeline starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfiguration {
    /// Ports probed on every resolved domain, in order. Empty means all.
    pub ports: Vec<u16>,
    /// HTTP timeout in seconds.
    #[serde(rename = "timeout")]
    pub timeout_seconds: f64,
    /// HTTP attempts made on transport failure.
    pub retry_attempts: u32,
    #[serde(rename = "output_format")]
    pub report_type: ReportFormat,
    pub log_level: LogLevel,
    /// Pause after each port probe, in seconds.
    pub port_delay: f64,
    /// Wait for a reply to one SYN probe, in seconds.
    pub probe_timeout: f64,
    /// Pause after each domain, in seconds.
    pub domain_delay: f64,
    /// Upper bound on one screenshot, in seconds.
    pub render_timeout: u64,
    pub screenshots: bool,
    pub headless: bool,
    pub device: Device,
    /// Domains processed at once.
    pub concurrency: usize,
    pub unresolved: UnresolvedPolicy,
    pub output_dir: PathBuf,
    /// Chromium-compatible binary used for screenshots.
    pub browser: String,
}

impl Default for ScanConfiguration {
    fn default() -> Self {
        Self {
            ports: vec![80, 443, 22, 8080],
            timeout_seconds: DEFAULT_HTTP_TIMEOUT.as_secs_f64(),
            retry_attempts: 3,
            report_type: ReportFormat::Text,
            log_level: LogLevel::Info,
            port_delay: DEFAULT_PROBE_DELAY.as_secs_f64(),
            probe_timeout: DEFAULT_PROBE_TIMEOUT.as_secs_f64(),
            domain_delay: 5.0,
            render_timeout: DEFAULT_RENDER_TIMEOUT.as_secs(),
            screenshots: true,
            headless: true,
            device: Device::Android,
            concurrency: 1,
            unresolved: UnresolvedPolicy::Record,
            output_dir: PathBuf::from("scan_output"),
            browser: "chromium".to_string(),
        }
    }
}

impl ScanConfiguration {
    /// Load a configuration file, JSON or `key=value`.
    ///
    /// Keys that are absent keep their default value.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config = Self::parse(&content)?;
        info!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Load `path`, falling back to the defaults when the file is missing or
    /// unreadable.
    ///
    /// A file that exists but fails to load is returned alongside the
    /// defaults so the caller can report it once logging is set up.
    pub fn load_or_default(path: &Path) -> (Self, Option<ConfigError>) {
        if !path.exists() {
            return (Self::default(), None);
        }

        match Self::load(path) {
            Ok(config) => (config, None),
            Err(e) => (Self::default(), Some(e)),
        }
    }

    /// Parse configuration text, detecting the form from its first character.
    pub fn parse(content: &str) -> ConfigResult<Self> {
        let config = if content.trim_start().starts_with('{') {
            serde_json::from_str(content).map_err(|e| ConfigError::InvalidFormat(e.to_string()))?
        } else {
            Self::parse_flat(content)?
        };

        config.validate()?;
        Ok(config)
    }

    fn parse_flat(content: &str) -> ConfigResult<Self> {
        let mut config = Self::default();

        for (number, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let (key, value) = line.split_once('=').ok_or_else(|| {
                ConfigError::InvalidFormat(format!("line {}: expected key=value", number + 1))
            })?;

            config.set(key.trim(), value.trim())?;
        }

        Ok(config)
    }

    /// Set one key from its textual value.
    pub fn set(&mut self, key: &str, value: &str) -> ConfigResult<()> {
        let value = value.trim_matches(|c| c == '"' || c == '\'');
        let invalid = || ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        };

        match key {
            "ports" => {
                let list = value.trim_matches(|c| c == '[' || c == ']').trim();
                self.ports = if list.is_empty() {
                    Vec::new()
                } else {
                    list.parse::<PortSpec>().map_err(|_| invalid())?.to_ports()
                };
            }
            "timeout" => self.timeout_seconds = parse_seconds(value).ok_or_else(invalid)?,
            "retry_attempts" => self.retry_attempts = value.parse().map_err(|_| invalid())?,
            "output_format" => self.report_type = value.parse().map_err(|_| invalid())?,
            "log_level" => self.log_level = value.parse()?,
            "port_delay" => self.port_delay = parse_seconds(value).ok_or_else(invalid)?,
            "probe_timeout" => self.probe_timeout = parse_seconds(value).ok_or_else(invalid)?,
            "domain_delay" => self.domain_delay = parse_seconds(value).ok_or_else(invalid)?,
            "render_timeout" => self.render_timeout = value.parse().map_err(|_| invalid())?,
            "screenshots" => self.screenshots = parse_bool(value).ok_or_else(invalid)?,
            "headless" => self.headless = parse_bool(value).ok_or_else(invalid)?,
            "device" => self.device = value.parse().map_err(|_| invalid())?,
            "concurrency" => self.concurrency = value.parse().map_err(|_| invalid())?,
            "unresolved" => self.unresolved = value.parse().map_err(|_| invalid())?,
            "output_dir" => self.output_dir = PathBuf::from(value),
            "browser" => self.browser = value.to_string(),
            _ => warn!(key, "ignoring unknown configuration key"),
        }

        Ok(())
    }

    /// Reject values that cannot drive a run.
    pub fn validate(&self) -> ConfigResult<()> {
        let seconds = [
            ("timeout", self.timeout_seconds),
            ("port_delay", self.port_delay),
            ("probe_timeout", self.probe_timeout),
            ("domain_delay", self.domain_delay),
        ];

        for (key, value) in seconds {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    value: value.to_string(),
                });
            }
        }

        if self.concurrency == 0 {
            return Err(ConfigError::InvalidValue {
                key: "concurrency".to_string(),
                value: "0".to_string(),
            });
        }

        Ok(())
    }

    /// Write the configuration as pretty-printed JSON, creating parent
    /// directories as needed.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).map_err(|e| ConfigError::WriteFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        info!(path = %path.display(), "configuration saved");
        Ok(())
    }

    pub fn http_timeout(&self) -> Duration {
        seconds(self.timeout_seconds)
    }

    pub fn port_delay(&self) -> Duration {
        seconds(self.port_delay)
    }

    pub fn probe_timeout(&self) -> Duration {
        seconds(self.probe_timeout)
    }

    pub fn domain_delay(&self) -> Duration {
        seconds(self.domain_delay)
    }

    pub fn render_timeout(&self) -> Duration {
        Duration::from_secs(self.render_timeout)
    }
}

fn seconds(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(Duration::ZERO)
}

fn parse_seconds(value: &str) -> Option<f64> {
    value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{tempdir, NamedTempFile};

    #[test]
    fn test_default_configuration() {
        let config = ScanConfiguration::default();
        assert_eq!(config.ports, vec![80, 443, 22, 8080]);
        assert_eq!(config.timeout_seconds, 5.0);
        assert_eq!(config.retry_attempts, 3);
        assert_eq!(config.report_type, ReportFormat::Text);
        assert_eq!(config.log_level, LogLevel::Info);
        assert_eq!(config.port_delay(), Duration::from_millis(500));
        assert_eq!(config.domain_delay(), Duration::from_secs(5));
        assert_eq!(config.unresolved, UnresolvedPolicy::Record);
    }

    #[test]
    fn test_parse_json_with_missing_keys() {
        let config =
            ScanConfiguration::parse(r#"{"ports": [443], "timeout": 2.5, "log_level": "DEBUG"}"#)
                .unwrap();

        assert_eq!(config.ports, vec![443]);
        assert_eq!(config.http_timeout(), Duration::from_millis(2500));
        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.retry_attempts, 3);
    }

    #[test]
    fn test_legacy_json_output_format_reads_as_text() {
        let config = ScanConfiguration::parse(r#"{"output_format": "json"}"#).unwrap();
        assert_eq!(config.report_type, ReportFormat::Text);

        let config = ScanConfiguration::parse(r#"{"output_format": "PDF"}"#).unwrap();
        assert_eq!(config.report_type, ReportFormat::Pdf);
    }

    #[test]
    fn test_parse_flat_form() {
        let content = "\
# scan settings
ports=80,443,8000-8002
timeout = 3
retry_attempts=1
output_format=pdf
log_level=WARNING
unresolved=skip
headless=false
";
        let config = ScanConfiguration::parse(content).unwrap();

        assert_eq!(config.ports, vec![80, 443, 8000, 8001, 8002]);
        assert_eq!(config.timeout_seconds, 3.0);
        assert_eq!(config.retry_attempts, 1);
        assert_eq!(config.report_type, ReportFormat::Pdf);
        assert_eq!(config.log_level, LogLevel::Warn);
        assert_eq!(config.unresolved, UnresolvedPolicy::Skip);
        assert!(!config.headless);
    }

    #[test]
    fn test_flat_form_bracketed_ports() {
        let config = ScanConfiguration::parse("ports=[22, 80]").unwrap();
        assert_eq!(config.ports, vec![22, 80]);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(ScanConfiguration::parse("timeout=-1").is_err());
        assert!(ScanConfiguration::parse("ports=http").is_err());
        assert!(ScanConfiguration::parse("not a pair").is_err());
        assert!(ScanConfiguration::parse(r#"{"concurrency": 0}"#).is_err());
    }

    #[test]
    fn test_unknown_flat_keys_are_ignored() {
        let config = ScanConfiguration::parse("colour=blue\nretry_attempts=7").unwrap();
        assert_eq!(config.retry_attempts, 7);
    }

    #[test]
    fn test_missing_file_falls_back_to_default() {
        let dir = tempdir().unwrap();
        let (config, error) = ScanConfiguration::load_or_default(&dir.path().join("absent.json"));
        assert_eq!(config, ScanConfiguration::default());
        assert!(error.is_none());
    }

    #[test]
    fn test_unparseable_file_falls_back_to_default() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{{ this is not json").unwrap();

        let (config, error) = ScanConfiguration::load_or_default(file.path());
        assert_eq!(config, ScanConfiguration::default());
        assert!(matches!(error, Some(ConfigError::InvalidFormat(_))));
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE_NAME);

        let config = ScanConfiguration {
            timeout_seconds: 10.0,
            device: Device::Apple,
            ..Default::default()
        };
        config.save(&path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("\"timeout\": 10.0"));
        assert_eq!(ScanConfiguration::load(&path).unwrap(), config);
    }

    #[test]
    fn test_log_level_parsing() {
        assert_eq!("INFO".parse::<LogLevel>().unwrap(), LogLevel::Info);
        assert_eq!("error".parse::<LogLevel>().unwrap(), LogLevel::Error);
        assert!("loud".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_log_level_from_configuration_text() {
        let config = ScanConfiguration::parse(r#"{"log_level": "WARNING"}"#).unwrap();
        assert_eq!(config.log_level, LogLevel::Warn);

        assert_eq!(LogLevel::try_from("Error".to_string()).unwrap(), LogLevel::Error);
        assert!(matches!(
            LogLevel::try_from("loud".to_string()),
            Err(ConfigError::InvalidValue { .. })
        ));
    }
}
