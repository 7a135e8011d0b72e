//! Scanner module - sequential, paced port probing.
//!
//! Ports are probed strictly one after another. The pause after every probe
//! keeps the probe rate below what naive intrusion-detection thresholds flag,
//! so it is part of the observable behavior and must not be optimized away.

pub mod syn;
pub mod traits;

use crate::error::ProbeResult;
use crate::types::PortSpec;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

pub use syn::SynProber;
pub use traits::{PortProber, PortState, PortStatusMap};

/// Default pause between two probes.
pub const DEFAULT_PROBE_DELAY: Duration = Duration::from_millis(500);

/// Default time to wait for a reply to a single probe.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(1);

/// Sleep for `delay` unless `cancel` fires first.
///
/// Returns `false` when the pause was cut short by cancellation.
pub async fn pause(delay: Duration, cancel: &CancellationToken) -> bool {
    if cancel.is_cancelled() {
        return false;
    }
    if delay.is_zero() {
        return true;
    }

    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}

/// Drive `probe` over `ports` in order with a pause after every probe.
///
/// An empty port list expands to the full 0-65535 range. Cancellation is
/// checked before each probe and during each pause; the ports probed before
/// cancellation are returned. A probe error aborts the scan.
pub async fn scan_sequential<F, Fut>(
    ports: &[u16],
    delay: Duration,
    cancel: &CancellationToken,
    mut probe: F,
) -> ProbeResult<PortStatusMap>
where
    F: FnMut(u16) -> Fut,
    Fut: Future<Output = ProbeResult<PortState>>,
{
    let full_range;
    let ports = if ports.is_empty() {
        info!("no ports given, scanning the full 0-65535 range");
        full_range = PortSpec::full().to_ports();
        &full_range[..]
    } else {
        ports
    };

    let mut status = PortStatusMap::new();

    for &port in ports {
        if cancel.is_cancelled() {
            info!(probed = status.len(), total = ports.len(), "port scan cancelled");
            break;
        }

        let state = probe(port).await?;
        debug!(port, %state, "probe complete");
        status.insert(port, state);

        if !pause(delay, cancel).await {
            info!(probed = status.len(), total = ports.len(), "port scan cancelled");
            break;
        }
    }

    Ok(status)
}
