//! UDP echo round-trip probe.

use std::sync::Arc;
use std::time::Instant;

use tokio::net::UdpSocket;
use tokio::time::timeout;

use super::{classify, random_payload, Op, ProbeError, CONTENT_ERROR, PING_SUCCESS};
use crate::config::{Host, ProbeConfig};
use crate::stats::{Protocol, StatisticsStore};

/// Probes one host over UDP: one datagram out, one datagram back. A lost
/// datagram and an unavailable peer are indistinguishable here; both
/// surface as a read timeout.
pub struct UdpProbe {
    config: Arc<ProbeConfig>,
    host: Host,
    port: u16,
    store: Arc<StatisticsStore>,
    payload: Vec<u8>,
}

impl UdpProbe {
    pub fn new(
        config: Arc<ProbeConfig>,
        host: Host,
        port: u16,
        store: Arc<StatisticsStore>,
    ) -> Self {
        let payload = random_payload(config.udp_size);
        Self {
            config,
            host,
            port,
            store,
            payload,
        }
    }

    pub fn host_name(&self) -> &str {
        &self.host.name
    }

    fn record(&self, kind: &str, value: f64) {
        self.store.add(&self.host.name, Protocol::Udp, kind, value);
    }

    /// Run one round and record exactly one measurement. No retry on
    /// loss; the next scheduled tick is an independent attempt.
    pub async fn execute(&self) {
        let start = Instant::now();
        match self.round_trip().await {
            Ok(echoed) if echoed == self.payload => {
                self.record(PING_SUCCESS, start.elapsed().as_secs_f64());
            }
            Ok(_) => {
                tracing::warn!(host = %self.host.name, "udp echo payload mismatch");
                self.record(CONTENT_ERROR, 1.0);
            }
            Err(error) => {
                let kind = classify(&error);
                tracing::debug!(host = %self.host.name, %error, kind, "udp round failed");
                self.record(&kind, 1.0);
            }
        }
    }

    async fn round_trip(&self) -> Result<Vec<u8>, ProbeError> {
        let socket = UdpSocket::bind("0.0.0.0:0")
            .await
            .map_err(|source| ProbeError::Unclassified { source })?;

        // "Connecting" a UDP socket only fixes the default peer; it also
        // routes ICMP unreachable notifications back as recv errors.
        let address = format!("{}:{}", self.host.address, self.port);
        timeout(self.config.connection_timeout, socket.connect(&address))
            .await
            .map_err(|_| ProbeError::timeout(Op::Connect, self.config.connection_timeout))?
            .map_err(|source| ProbeError::io(Op::Connect, source))?;

        socket
            .send(&self.payload)
            .await
            .map_err(|source| ProbeError::io(Op::Write, source))?;

        let mut echoed = vec![0u8; self.payload.len()];
        let received = timeout(self.config.read_timeout, socket.recv(&mut echoed))
            .await
            .map_err(|_| ProbeError::timeout(Op::Read, self.config.read_timeout))?
            .map_err(|source| ProbeError::io(Op::Read, source))?;

        echoed.truncate(received);
        Ok(echoed)
    }
}
