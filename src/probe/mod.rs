//! Protocol probes: one dial/verify/classify round-trip per execution.

mod classify;
mod tcp;
mod udp;

pub use classify::classify;
pub use tcp::TcpProbe;
pub use udp::UdpProbe;

use std::fmt;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use rand::RngCore;
use thiserror::Error;

use crate::config::{Host, ProbeConfig};
use crate::stats::StatisticsStore;

/// Metric kind recorded for a verified round-trip; the value is the
/// elapsed time in seconds.
pub const PING_SUCCESS: &str = "ping_success";
/// Metric kind recorded when the echoed payload does not match.
pub const CONTENT_ERROR: &str = "content_error";

/// The low-level operation a transport failure occurred in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Connect,
    Write,
    Read,
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Op::Connect => f.write_str("connect"),
            Op::Write => f.write_str("write"),
            Op::Read => f.write_str("read"),
        }
    }
}

/// Transport failure raised by a probe round, tagged with the operation
/// it occurred in where that is known.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("{op} failed: {source}")]
    Io {
        op: Op,
        #[source]
        source: io::Error,
    },
    #[error("{op} timed out after {after:?}")]
    Timeout { op: Op, after: Duration },
    #[error("probe failed: {source}")]
    Unclassified {
        #[source]
        source: io::Error,
    },
}

impl ProbeError {
    pub fn io(op: Op, source: io::Error) -> Self {
        Self::Io { op, source }
    }

    pub fn timeout(op: Op, after: Duration) -> Self {
        Self::Timeout { op, after }
    }
}

/// A registered probe for one (host, protocol) pair.
pub enum Probe {
    Tcp(TcpProbe),
    Udp(UdpProbe),
}

impl Probe {
    /// Run one round; exactly one measurement is recorded per call.
    pub async fn execute(&self) {
        match self {
            Probe::Tcp(probe) => probe.execute().await,
            Probe::Udp(probe) => probe.execute().await,
        }
    }

    pub fn host_name(&self) -> &str {
        match self {
            Probe::Tcp(probe) => probe.host_name(),
            Probe::Udp(probe) => probe.host_name(),
        }
    }

    pub fn protocol(&self) -> crate::stats::Protocol {
        match self {
            Probe::Tcp(_) => crate::stats::Protocol::Tcp,
            Probe::Udp(_) => crate::stats::Protocol::Udp,
        }
    }
}

/// Build the probes a host's configuration implies: TCP if a TCP port is
/// set, UDP if a UDP port is set.
pub fn probes_for_host(
    config: &Arc<ProbeConfig>,
    host: &Host,
    store: &Arc<StatisticsStore>,
) -> Vec<Probe> {
    let mut probes = Vec::new();
    if let Some(port) = host.tcp_port {
        probes.push(Probe::Tcp(TcpProbe::new(
            config.clone(),
            host.clone(),
            port,
            store.clone(),
        )));
    }
    if let Some(port) = host.udp_port {
        probes.push(Probe::Udp(UdpProbe::new(
            config.clone(),
            host.clone(),
            port,
            store.clone(),
        )));
    }
    if host.icmp {
        tracing::warn!(host = %host.name, "icmp probing is not implemented, flag ignored");
    }
    probes
}

/// Fixed random payload, generated once per probe instance and reused
/// unchanged for every round.
fn random_payload(size: usize) -> Vec<u8> {
    let mut payload = vec![0u8; size];
    rand::thread_rng().fill_bytes(&mut payload);
    payload
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::Protocol;
    use std::time::Duration;

    fn config() -> Arc<ProbeConfig> {
        Arc::new(ProbeConfig {
            statistics_port: 0,
            statistics_retention_period: Duration::from_secs(3600),
            ping_interval: Duration::from_secs(1),
            connection_timeout: Duration::from_secs(1),
            read_timeout: Duration::from_secs(1),
            tcp_size: 16,
            udp_size: 16,
            hosts: Vec::new(),
        })
    }

    fn host(tcp_port: Option<u16>, udp_port: Option<u16>) -> Host {
        Host {
            name: "alpha".to_string(),
            address: "127.0.0.1".to_string(),
            tcp_port,
            udp_port,
            icmp: false,
        }
    }

    #[test]
    fn factory_follows_configured_ports() {
        let config = config();
        let store = Arc::new(StatisticsStore::new(Duration::from_secs(3600)));

        assert!(probes_for_host(&config, &host(None, None), &store).is_empty());

        let tcp_only = probes_for_host(&config, &host(Some(9500), None), &store);
        assert_eq!(tcp_only.len(), 1);
        assert_eq!(tcp_only[0].protocol(), Protocol::Tcp);

        let both = probes_for_host(&config, &host(Some(9500), Some(9501)), &store);
        let protocols: Vec<Protocol> = both.iter().map(Probe::protocol).collect();
        assert_eq!(protocols, vec![Protocol::Tcp, Protocol::Udp]);
    }

    #[test]
    fn payload_has_requested_size() {
        assert_eq!(random_payload(1024).len(), 1024);
        assert!(random_payload(0).is_empty());
    }
}
