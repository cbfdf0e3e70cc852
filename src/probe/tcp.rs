//! TCP echo round-trip probe.

use std::sync::Arc;
use std::time::Instant;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{timeout, timeout_at};

use super::{classify, random_payload, Op, ProbeError, CONTENT_ERROR, PING_SUCCESS};
use crate::config::{Host, ProbeConfig};
use crate::stats::{Protocol, StatisticsStore};

/// Probes one host over TCP: connect, send the payload, half-close the
/// write side to mark the request complete, then read the echo back.
pub struct TcpProbe {
    config: Arc<ProbeConfig>,
    host: Host,
    port: u16,
    store: Arc<StatisticsStore>,
    payload: Vec<u8>,
}

impl TcpProbe {
    pub fn new(
        config: Arc<ProbeConfig>,
        host: Host,
        port: u16,
        store: Arc<StatisticsStore>,
    ) -> Self {
        let payload = random_payload(config.tcp_size);
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
        self.store.add(&self.host.name, Protocol::Tcp, kind, value);
    }

    /// Run one round and record exactly one measurement.
    pub async fn execute(&self) {
        let start = Instant::now();
        match self.round_trip().await {
            Ok(echoed) if echoed == self.payload => {
                self.record(PING_SUCCESS, start.elapsed().as_secs_f64());
            }
            Ok(_) => {
                tracing::warn!(host = %self.host.name, "tcp echo payload mismatch");
                self.record(CONTENT_ERROR, 1.0);
            }
            Err(error) => {
                let kind = classify(&error);
                tracing::debug!(host = %self.host.name, %error, kind, "tcp round failed");
                self.record(&kind, 1.0);
            }
        }
    }

    async fn round_trip(&self) -> Result<Vec<u8>, ProbeError> {
        let address = format!("{}:{}", self.host.address, self.port);

        let mut stream = timeout(self.config.connection_timeout, TcpStream::connect(&address))
            .await
            .map_err(|_| ProbeError::timeout(Op::Connect, self.config.connection_timeout))?
            .map_err(|source| ProbeError::io(Op::Connect, source))?;

        // One absolute deadline covers the rest of the round; a peer that
        // accepts but never reads must not stall the probe loop.
        let deadline = tokio::time::Instant::now() + self.config.read_timeout;

        let request = async {
            stream.write_all(&self.payload).await?;
            // Half-close: the request has no framing, the server reads to EOF.
            stream.shutdown().await
        };
        timeout_at(deadline, request)
            .await
            .map_err(|_| ProbeError::timeout(Op::Write, self.config.read_timeout))?
            .map_err(|source| ProbeError::io(Op::Write, source))?;

        let mut echoed = vec![0u8; self.payload.len()];
        timeout_at(deadline, stream.read_exact(&mut echoed))
            .await
            .map_err(|_| ProbeError::timeout(Op::Read, self.config.read_timeout))?
            .map_err(|source| ProbeError::io(Op::Read, source))?;

        Ok(echoed)
    }
}
