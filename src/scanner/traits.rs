//! Port prober abstraction.
//!
//! Defines the port status model and the `PortProber` trait so the pipeline
//! can run against the raw-socket prober or a test double.

use crate::error::ProbeResult;
use async_trait::async_trait;
use pnet::packet::tcp::TcpFlags;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::net::IpAddr;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Status of a probed port.
///
/// A drop, a firewall reject and a closed port all look the same to a SYN
/// probe that only trusts SYN+ACK, so there is no separate closed state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortState {
    /// A SYN+ACK came back: something is listening.
    Open,
    /// Anything else, including silence.
    ClosedOrFiltered,
}

impl PortState {
    /// Classify the TCP flags of a reply to a SYN probe.
    ///
    /// Only the exact SYN+ACK combination counts as open; RST, RST+ACK, a bare
    /// SYN or SYN+ACK with extra bits set all read as closed or filtered.
    pub fn from_reply_flags(flags: u8) -> Self {
        if flags == TcpFlags::SYN | TcpFlags::ACK {
            Self::Open
        } else {
            Self::ClosedOrFiltered
        }
    }

    pub fn is_open(self) -> bool {
        self == Self::Open
    }
}

impl fmt::Display for PortState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::ClosedOrFiltered => write!(f, "closed_or_filtered"),
        }
    }
}

/// Per-domain port results, keyed by port number.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PortStatusMap(BTreeMap<u16, PortState>);

impl PortStatusMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, port: u16, state: PortState) {
        self.0.insert(port, state);
    }

    pub fn get(&self, port: u16) -> Option<PortState> {
        self.0.get(&port).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u16, PortState)> + '_ {
        self.0.iter().map(|(port, state)| (*port, *state))
    }

    /// Ports that answered with SYN+ACK, ascending.
    pub fn open_ports(&self) -> Vec<u16> {
        self.iter()
            .filter(|(_, state)| state.is_open())
            .map(|(port, _)| port)
            .collect()
    }

    /// Single-cell form used by the CSV store: `80:open;443:closed_or_filtered`.
    pub fn to_compact_string(&self) -> String {
        self.iter()
            .map(|(port, state)| format!("{}:{}", port, state))
            .collect::<Vec<_>>()
            .join(";")
    }
}

impl FromIterator<(u16, PortState)> for PortStatusMap {
    fn from_iter<I: IntoIterator<Item = (u16, PortState)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Trait for port prober implementations.
///
/// # Example
///
/// ```ignore
/// use domscan::scanner::{PortProber, SynProber};
///
/// let prober = SynProber::new(Duration::from_secs(1));
/// let status = prober
///     .scan(ip, &[80, 443], Duration::from_millis(500), &CancellationToken::new())
///     .await?;
/// ```
#[async_trait]
pub trait PortProber: Send + Sync {
    /// Check if this prober requires elevated privileges.
    fn requires_privileges(&self) -> bool;

    /// Probe `ports` on `target` one at a time, in order, sleeping `delay`
    /// after each probe. An empty port list means every port.
    ///
    /// Cancellation stops the scan between ports and returns the ports
    /// probed so far.
    async fn scan(
        &self,
        target: IpAddr,
        ports: &[u16],
        delay: Duration,
        cancel: &CancellationToken,
    ) -> ProbeResult<PortStatusMap>;
}
