//! Echo server counterpart for the probes.
//!
//! TCP: the request has no framing; the client half-closes its write
//! side when done, so each connection is read to EOF and the bytes are
//! written back verbatim. UDP: every datagram is echoed to its sender.

use std::io;
use std::net::SocketAddr;

use anyhow::{Context, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream, UdpSocket};

use crate::config::ServerConfig;

const UDP_BUFFER_SIZE: usize = 64 * 1024;

pub struct EchoServer {
    tcp: TcpListener,
    udp: UdpSocket,
    tcp_addr: SocketAddr,
    udp_addr: SocketAddr,
}

impl EchoServer {
    /// Bind both listeners. Failure to bind either is fatal.
    pub async fn bind(config: &ServerConfig) -> Result<Self> {
        let tcp = TcpListener::bind(("0.0.0.0", config.tcp_port))
            .await
            .with_context(|| format!("failed to bind tcp echo listener on port {}", config.tcp_port))?;
        let udp = UdpSocket::bind(("0.0.0.0", config.udp_port))
            .await
            .with_context(|| format!("failed to bind udp echo socket on port {}", config.udp_port))?;
        let tcp_addr = tcp.local_addr().context("tcp listener has no local address")?;
        let udp_addr = udp.local_addr().context("udp socket has no local address")?;
        Ok(Self {
            tcp,
            udp,
            tcp_addr,
            udp_addr,
        })
    }

    pub fn tcp_addr(&self) -> SocketAddr {
        self.tcp_addr
    }

    pub fn udp_addr(&self) -> SocketAddr {
        self.udp_addr
    }

    /// Serve both protocols until the process terminates.
    pub async fn serve(self) -> Result<()> {
        tracing::info!(tcp = %self.tcp_addr, udp = %self.udp_addr, "echo server listening");
        tokio::try_join!(serve_tcp(self.tcp), serve_udp(self.udp))?;
        Ok(())
    }
}

async fn serve_tcp(listener: TcpListener) -> Result<()> {
    loop {
        let (stream, peer) = listener
            .accept()
            .await
            .context("tcp echo listener failed to accept")?;
        tokio::spawn(async move {
            if let Err(error) = echo_stream(stream).await {
                tracing::debug!(%peer, %error, "tcp echo session failed");
            }
        });
    }
}

/// Read the full request, then write it back and close.
async fn echo_stream(mut stream: TcpStream) -> io::Result<()> {
    let mut request = Vec::new();
    stream.read_to_end(&mut request).await?;
    stream.write_all(&request).await?;
    stream.shutdown().await
}

async fn serve_udp(socket: UdpSocket) -> Result<()> {
    let mut buf = vec![0u8; UDP_BUFFER_SIZE];
    loop {
        let (received, peer) = socket
            .recv_from(&mut buf)
            .await
            .context("udp echo socket failed to receive")?;
        if let Err(error) = socket.send_to(&buf[..received], peer).await {
            tracing::debug!(%peer, %error, "udp echo reply failed");
        }
    }
}
