//! SYN prober implementation.
//!
//! Performs half-open TCP probing by sending bare SYN segments over a raw
//! layer-4 socket and reading the replies. Requires raw socket access
//! (root or CAP_NET_RAW).
//!
//! # How It Works
//!
//! 1. Send a TCP segment with only SYN set to the target port
//! 2. Wait up to the probe timeout for a segment from that port addressed to
//!    our source port
//! 3. Exactly SYN+ACK means open; anything else, or silence, means closed or
//!    filtered
//!
//! The kernel answers an unexpected SYN+ACK with RST on its own, so no
//! teardown is sent here.

use crate::error::{ProbeError, ProbeResult};
use crate::scanner::traits::{PortProber, PortState, PortStatusMap};
use crate::scanner::{scan_sequential, DEFAULT_PROBE_TIMEOUT};
use async_trait::async_trait;
use pnet::datalink::{self, NetworkInterface};
use pnet::packet::ip::IpNextHeaderProtocols;
use pnet::packet::tcp::{self, MutableTcpPacket, TcpFlags, TcpPacket};
use pnet::transport::{
    tcp_packet_iter, transport_channel, TransportChannelType, TransportProtocol,
    TransportReceiver, TransportSender,
};
use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, UdpSocket};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

const TRANSPORT_BUFFER_SIZE: usize = 4096;
const TCP_HEADER_LEN: usize = 20;
const CHANNEL_TYPE_TCP: TransportChannelType =
    TransportChannelType::Layer4(TransportProtocol::Ipv4(IpNextHeaderProtocols::Tcp));

/// SYN prober for liveness checks.
///
/// **Requires elevated privileges (root/sudo).**
#[derive(Debug, Clone)]
pub struct SynProber {
    timeout: Duration,
    interface: Option<String>,
}

impl SynProber {
    /// Create a new SYN prober that waits `timeout` for each reply.
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            interface: None,
        }
    }

    /// Take the source address from a named interface instead of the route
    /// towards the target.
    pub fn with_interface(mut self, interface: impl Into<String>) -> Self {
        self.interface = Some(interface.into());
        self
    }

    fn source_address(&self, target: Ipv4Addr) -> ProbeResult<Ipv4Addr> {
        match &self.interface {
            Some(name) => get_interface_ipv4(&find_interface(Some(name))?),
            None => route_source_address(target)
                .or_else(|_| find_interface(None).and_then(|iface| get_interface_ipv4(&iface))),
        }
    }
}

impl Default for SynProber {
    fn default() -> Self {
        Self::new(DEFAULT_PROBE_TIMEOUT)
    }
}

#[async_trait]
impl PortProber for SynProber {
    fn requires_privileges(&self) -> bool {
        true
    }

    async fn scan(
        &self,
        target: IpAddr,
        ports: &[u16],
        delay: Duration,
        cancel: &CancellationToken,
    ) -> ProbeResult<PortStatusMap> {
        let target = match target {
            IpAddr::V4(ip) => ip,
            IpAddr::V6(_) => return Err(ProbeError::UnsupportedAddress(target)),
        };

        let source = self.source_address(target)?;
        let channel = Arc::new(Mutex::new(SynChannel::open(source)?));
        let timeout = self.timeout;

        info!(%target, %source, ports = ports.len(), "starting SYN probe");

        scan_sequential(ports, delay, cancel, |port| {
            let channel = Arc::clone(&channel);
            async move {
                tokio::task::spawn_blocking(move || {
                    let mut channel = channel
                        .lock()
                        .map_err(|_| ProbeError::RawSocketError("probe channel poisoned".to_string()))?;
                    channel.probe(target, port, timeout)
                })
                .await
                .map_err(|e| ProbeError::RawSocketError(e.to_string()))?
            }
        })
        .await
    }
}

/// Raw layer-4 TCP channel bound to one source address.
struct SynChannel {
    tx: TransportSender,
    rx: TransportReceiver,
    source: Ipv4Addr,
}

impl SynChannel {
    fn open(source: Ipv4Addr) -> ProbeResult<Self> {
        let (tx, rx) = transport_channel(TRANSPORT_BUFFER_SIZE, CHANNEL_TYPE_TCP).map_err(|e| {
            if e.kind() == io::ErrorKind::PermissionDenied {
                ProbeError::PermissionDenied(
                    "Raw socket access requires root/sudo privileges".to_string(),
                )
            } else {
                ProbeError::RawSocketError(e.to_string())
            }
        })?;

        Ok(Self { tx, rx, source })
    }

    /// Send one SYN and wait for the matching reply. Blocking.
    fn probe(&mut self, target: Ipv4Addr, port: u16, timeout: Duration) -> ProbeResult<PortState> {
        let source_port = rand_source_port();
        let segment = build_syn_segment(self.source, target, source_port, port)?;
        let packet = TcpPacket::new(&segment)
            .ok_or_else(|| ProbeError::InvalidPacket("SYN segment too short".to_string()))?;

        self.tx
            .send_to(packet, IpAddr::V4(target))
            .map_err(|e| ProbeError::RawSocketError(e.to_string()))?;

        let deadline = Instant::now() + timeout;
        let mut replies = tcp_packet_iter(&mut self.rx);

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(PortState::ClosedOrFiltered);
            }

            match replies.next_with_timeout(remaining) {
                Ok(Some((reply, from))) => {
                    if from != IpAddr::V4(target)
                        || reply.get_source() != port
                        || reply.get_destination() != source_port
                    {
                        continue;
                    }

                    let flags = reply.get_flags();
                    debug!(port, flags, "reply received");
                    return Ok(PortState::from_reply_flags(flags));
                }
                Ok(None) => return Ok(PortState::ClosedOrFiltered),
                Err(e)
                    if matches!(
                        e.kind(),
                        io::ErrorKind::Interrupted
                            | io::ErrorKind::WouldBlock
                            | io::ErrorKind::TimedOut
                    ) =>
                {
                    continue
                }
                Err(e) => return Err(ProbeError::Io(e)),
            }
        }
    }
}

/// Build a bare TCP SYN segment with a valid checksum.
///
/// The IPv4 header is added by the kernel on a layer-4 channel, but the TCP
/// checksum covers the pseudo-header, so both addresses are needed here.
pub fn build_syn_segment(
    source: Ipv4Addr,
    target: Ipv4Addr,
    source_port: u16,
    dest_port: u16,
) -> ProbeResult<Vec<u8>> {
    let mut buffer = vec![0u8; TCP_HEADER_LEN];

    let mut tcp_packet = MutableTcpPacket::new(&mut buffer)
        .ok_or_else(|| ProbeError::InvalidPacket("Failed to create TCP packet".to_string()))?;

    tcp_packet.set_source(source_port);
    tcp_packet.set_destination(dest_port);
    tcp_packet.set_sequence(rand::random());
    tcp_packet.set_acknowledgement(0);
    tcp_packet.set_data_offset(5);
    tcp_packet.set_reserved(0);
    tcp_packet.set_flags(TcpFlags::SYN);
    tcp_packet.set_window(64240);
    tcp_packet.set_urgent_ptr(0);

    let checksum = tcp::ipv4_checksum(&tcp_packet.to_immutable(), &source, &target);
    tcp_packet.set_checksum(checksum);

    Ok(buffer)
}

/// Source address the kernel would use to reach `target`.
///
/// Connecting a UDP socket only consults the routing table; nothing is sent.
fn route_source_address(target: Ipv4Addr) -> ProbeResult<Ipv4Addr> {
    let socket = UdpSocket::bind(SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)))?;
    socket.connect(SocketAddr::from((target, 80)))?;

    match socket.local_addr()?.ip() {
        IpAddr::V4(ip) if !ip.is_unspecified() => Ok(ip),
        other => Err(ProbeError::NoSourceAddress(format!(
            "route lookup returned {}",
            other
        ))),
    }
}

/// Find a suitable network interface.
fn find_interface(name: Option<&str>) -> ProbeResult<NetworkInterface> {
    let interfaces = datalink::interfaces();

    if let Some(name) = name {
        interfaces
            .into_iter()
            .find(|iface| iface.name == name)
            .ok_or_else(|| ProbeError::NoSourceAddress(format!("interface {} not found", name)))
    } else {
        // First non-loopback interface with an IPv4 address
        interfaces
            .into_iter()
            .find(|iface| {
                !iface.is_loopback() && iface.is_up() && iface.ips.iter().any(|ip| ip.is_ipv4())
            })
            .ok_or_else(|| {
                ProbeError::NoSourceAddress("no suitable network interface found".to_string())
            })
    }
}

/// Get IPv4 address from interface.
fn get_interface_ipv4(interface: &NetworkInterface) -> ProbeResult<Ipv4Addr> {
    interface
        .ips
        .iter()
        .find_map(|ip| match ip.ip() {
            IpAddr::V4(addr) if !addr.is_loopback() => Some(addr),
            _ => None,
        })
        .ok_or_else(|| {
            ProbeError::NoSourceAddress(format!("interface {} has no IPv4 address", interface.name))
        })
}

/// Generate a random source port in the ephemeral range.
fn rand_source_port() -> u16 {
    use rand::Rng;
    rand::thread_rng().gen_range(49152..65535)
}
