//! Domain targets.
//!
//! A `Domain` keeps exactly what the user typed. Everything derived from it
//! (resolver host, probe URL, file-name component) is computed on demand so
//! the original input is what ends up in records and reports.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use url::Url;

/// Characters that may not appear in a file-name component.
const FORBIDDEN_FILENAME_CHARS: &[char] = &['\\', '/', ':', '"', '*', '?', '<', '>', '|'];

/// A reconnaissance target as read from input.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Domain(String);

impl Domain {
    pub fn new(input: impl Into<String>) -> Self {
        Self(input.into().trim().to_string())
    }

    /// The input exactly as given (whitespace trimmed).
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The host component to resolve.
    ///
    /// Full URLs are reduced to their host; bare inputs lose surrounding
    /// slashes, any path/query suffix and a trailing `:port`.
    pub fn host(&self) -> String {
        let input = self.0.trim();

        if input.contains("://") {
            if let Some(host) = Url::parse(input)
                .ok()
                .and_then(|url| url.host_str().map(str::to_string))
            {
                return host.trim_matches(['[', ']']).to_string();
            }
        }

        let trimmed = input.trim_matches('/');
        let host = trimmed.split(['/', '?', '#']).next().unwrap_or(trimmed);

        if host.parse::<IpAddr>().is_ok() {
            return host.to_string();
        }

        match host.rsplit_once(':') {
            Some((name, port)) if !port.is_empty() && port.chars().all(|c| c.is_ascii_digit()) => {
                name.to_string()
            }
            _ => host.to_string(),
        }
    }

    /// The URL used for HTTP probing and rendering: `http://` is prefixed
    /// when the input carries no scheme.
    pub fn url(&self) -> String {
        let input = self.0.trim();
        if input.contains("://") {
            input.to_string()
        } else {
            format!("http://{}", input.trim_start_matches('/'))
        }
    }

    /// The input with filesystem-forbidden characters replaced by `_`.
    pub fn sanitized(&self) -> String {
        self.0
            .chars()
            .map(|c| if FORBIDDEN_FILENAME_CHARS.contains(&c) { '_' } else { c })
            .collect()
    }

    /// Whether `host()` is something worth sending to a resolver.
    pub fn has_valid_host(&self) -> bool {
        let host = self.host();
        host.parse::<IpAddr>().is_ok() || is_valid_hostname(&host)
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Domain {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Domain {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Split free-form input into domains.
///
/// Accepts commas, whitespace and newlines as separators and drops empty
/// entries, so both `"a.com, b.com"` and a one-per-line file work.
pub fn parse_domain_list(input: &str) -> Vec<Domain> {
    input
        .split(|c: char| c == ',' || c.is_whitespace())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(Domain::new)
        .collect()
}

/// Check if a string is a valid hostname.
fn is_valid_hostname(s: &str) -> bool {
    if s.is_empty() || s.len() > 253 {
        return false;
    }

    // A single trailing dot marks a fully-qualified name.
    let s = s.strip_suffix('.').unwrap_or(s);

    s.split('.').all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && label.chars().next().is_some_and(|c| c.is_alphanumeric() || c == '_')
            && label.chars().last().is_some_and(|c| c.is_alphanumeric())
            && label
                .chars()
                .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    })
}
