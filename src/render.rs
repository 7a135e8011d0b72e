//! Page rendering and screenshot capture.
//!
//! The default renderer drives a Chromium-compatible browser through its
//! command-line screenshot mode. Each capture is a separate browser process,
//! killed if it outlives the render timeout.

use crate::error::{RenderError, RenderResult};
use crate::types::Domain;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::str::FromStr;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info};

/// Default upper bound on a single capture.
pub const DEFAULT_RENDER_TIMEOUT: Duration = Duration::from_secs(60);

/// Stderr kept in a `BrowserFailed` error.
const STDERR_TAIL: usize = 512;

/// Device the page is rendered as.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Device {
    #[default]
    Android,
    Apple,
}

impl Device {
    pub fn user_agent(self) -> &'static str {
        match self {
            Self::Android => {
                "Mozilla/5.0 (Linux; Android 13; SM-S918B) AppleWebKit/537.36 \
                 (KHTML, like Gecko) Chrome/110.0.5481.77 Mobile Safari/537.36"
            }
            Self::Apple => {
                "Mozilla/5.0 (iPhone; CPU iPhone OS 16_0 like Mac OS X) AppleWebKit/605.1.15 \
                 (KHTML, like Gecko) Version/16.0 Mobile/15E148 Safari/604.1"
            }
        }
    }

    /// Viewport in CSS pixels.
    pub fn window_size(self) -> (u32, u32) {
        match self {
            Self::Android => (412, 915),
            Self::Apple => (390, 844),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Android => "android",
            Self::Apple => "apple",
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Device {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "android" => Ok(Self::Android),
            "apple" | "iphone" | "ios" => Ok(Self::Apple),
            other => Err(format!("unknown device {:?} (expected android or apple)", other)),
        }
    }
}

impl TryFrom<String> for Device {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// What a successful capture produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOutput {
    pub screenshot_path: PathBuf,
    /// The URL handed to the browser. Screenshot mode does not report where
    /// redirects ended, so this is the requested URL, not the landing page.
    pub final_url: String,
}

/// Anything that can capture a rendered page.
///
/// `url` is what gets loaded; `domain` names the screenshot file, so two
/// domains redirecting to the same page still get separate files.
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn capture(
        &self,
        domain: &Domain,
        url: &str,
        headless: bool,
        device: Device,
    ) -> RenderResult<RenderOutput>;
}

/// Screenshot file name for `domain` rendered as `device`.
pub fn screenshot_file_name(domain: &Domain, device: Device) -> String {
    let bare = domain
        .as_str()
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_end_matches('/');
    format!("{}_{}.png", Domain::new(bare).sanitized(), device)
}

/// Renderer backed by a headless Chromium process.
#[derive(Debug, Clone)]
pub struct ChromeRenderer {
    binary: String,
    output_dir: PathBuf,
    timeout: Duration,
}

impl ChromeRenderer {
    /// Screenshots land in `output_dir`, which is created on first use.
    pub fn new(binary: impl Into<String>, output_dir: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            output_dir: output_dir.into(),
            timeout,
        }
    }

    fn browser_args(url: &str, headless: bool, device: Device, screenshot: &Path) -> Vec<String> {
        let (width, height) = device.window_size();
        let mut args = Vec::with_capacity(12);

        if headless {
            args.push("--headless=new".to_string());
        } else {
            args.push("--start-maximized".to_string());
        }

        args.extend([
            "--disable-gpu".to_string(),
            "--no-sandbox".to_string(),
            "--disable-extensions".to_string(),
            "--ignore-certificate-errors".to_string(),
            "--hide-scrollbars".to_string(),
            format!("--user-agent={}", device.user_agent()),
            format!("--window-size={},{}", width, height),
            format!("--screenshot={}", screenshot.display()),
            url.to_string(),
        ]);

        args
    }
}

#[async_trait]
impl Renderer for ChromeRenderer {
    async fn capture(
        &self,
        domain: &Domain,
        url: &str,
        headless: bool,
        device: Device,
    ) -> RenderResult<RenderOutput> {
        tokio::fs::create_dir_all(&self.output_dir).await?;

        let screenshot = self.output_dir.join(screenshot_file_name(domain, device));
        // A stale file from an earlier run must not pass for this capture.
        if let Err(e) = tokio::fs::remove_file(&screenshot).await {
            if e.kind() != io::ErrorKind::NotFound {
                return Err(RenderError::Io(e));
            }
        }

        let args = Self::browser_args(url, headless, device, &screenshot);
        debug!(binary = %self.binary, ?args, "launching browser");

        let child = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| RenderError::Launch {
                binary: self.binary.clone(),
                reason: e.to_string(),
            })?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| RenderError::Timeout(self.timeout.as_secs()))??;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let chars: Vec<char> = stderr.trim().chars().collect();
            let tail = &chars[chars.len().saturating_sub(STDERR_TAIL)..];
            return Err(RenderError::BrowserFailed {
                status: output.status.to_string(),
                stderr: tail.iter().collect(),
            });
        }

        if tokio::fs::metadata(&screenshot).await.is_err() {
            return Err(RenderError::MissingOutput(screenshot));
        }

        info!(%url, path = %screenshot.display(), %device, "screenshot captured");

        Ok(RenderOutput {
            screenshot_path: screenshot,
            final_url: url.to_string(),
        })
    }
}
