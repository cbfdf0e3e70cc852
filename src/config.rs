//! Configuration loading for the prober and the echo server.
//!
//! Both commands read the same YAML file; the prober uses the `probe`
//! settings and host list, the echo server only its two listen ports.

use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Deserializer};

/// One remote host to probe. Which protocols are exercised follows from
/// which ports are set.
#[derive(Debug, Clone, Deserialize)]
pub struct Host {
    /// Unique identifying name, used as the statistics key.
    pub name: String,
    /// IP address or resolvable hostname.
    pub address: String,
    #[serde(default)]
    pub tcp_port: Option<u16>,
    #[serde(default)]
    pub udp_port: Option<u16>,
    /// Accepted for config compatibility; ICMP probing is not implemented.
    #[serde(default)]
    pub icmp: bool,
}

/// Process-wide prober settings, immutable after load.
#[derive(Debug, Clone, Deserialize)]
pub struct ProbeConfig {
    /// Port the statistics HTTP endpoint binds to.
    pub statistics_port: u16,
    /// Maximum tolerated age of the oldest retained measurement.
    #[serde(deserialize_with = "duration_secs")]
    pub statistics_retention_period: Duration,
    /// Interval between probe rounds for every registered probe.
    #[serde(deserialize_with = "duration_secs")]
    pub ping_interval: Duration,
    /// Deadline for establishing a connection (or binding the UDP socket).
    #[serde(deserialize_with = "duration_secs")]
    pub connection_timeout: Duration,
    /// Deadline for the echoed response to arrive.
    #[serde(deserialize_with = "duration_secs")]
    pub read_timeout: Duration,
    /// TCP probe payload size in bytes.
    pub tcp_size: usize,
    /// UDP probe payload size in bytes.
    pub udp_size: usize,
    #[serde(default, alias = "servers")]
    pub hosts: Vec<Host>,
}

/// Echo server listen ports.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub tcp_port: u16,
    pub udp_port: u16,
}

/// Durations in the config file are plain integer seconds.
fn duration_secs<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    u64::deserialize(deserializer).map(Duration::from_secs)
}

impl ProbeConfig {
    /// Load and validate prober configuration from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: Self = serde_yaml::from_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.hosts.is_empty() {
            bail!("config contains no hosts to probe");
        }
        if self.ping_interval.is_zero() {
            bail!("ping_interval must be at least one second");
        }
        if self.connection_timeout.is_zero() || self.read_timeout.is_zero() {
            bail!("connection_timeout and read_timeout must be at least one second");
        }
        for host in &self.hosts {
            if host.name.is_empty() {
                bail!("host with address {} has no name", host.address);
            }
            if host.tcp_port.is_some() && self.tcp_size == 0 {
                bail!("host {} enables tcp probing but tcp_size is 0", host.name);
            }
            if host.udp_port.is_some() && self.udp_size == 0 {
                bail!("host {} enables udp probing but udp_size is 0", host.name);
            }
        }
        Ok(())
    }
}

impl ServerConfig {
    /// Load echo server configuration from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        serde_yaml::from_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = "\
statistics_port: 9090
statistics_retention_period: 3600
ping_interval: 10
connection_timeout: 2
read_timeout: 3
tcp_size: 1024
udp_size: 512
tcp_port: 9500
udp_port: 9501
hosts:
  - name: alpha
    address: 10.0.0.1
    tcp_port: 9500
  - name: beta
    address: beta.example.net
    udp_port: 9501
    icmp: true
";

    fn write_sample() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("create temp config");
        file.write_all(SAMPLE.as_bytes()).expect("write temp config");
        file
    }

    #[test]
    fn parses_probe_config() {
        let file = write_sample();
        let cfg = ProbeConfig::load(file.path()).expect("load probe config");
        assert_eq!(cfg.statistics_port, 9090);
        assert_eq!(cfg.statistics_retention_period, Duration::from_secs(3600));
        assert_eq!(cfg.ping_interval, Duration::from_secs(10));
        assert_eq!(cfg.hosts.len(), 2);
        assert_eq!(cfg.hosts[0].tcp_port, Some(9500));
        assert_eq!(cfg.hosts[0].udp_port, None);
        assert!(cfg.hosts[1].icmp);
    }

    #[test]
    fn parses_server_config() {
        let file = write_sample();
        let cfg = ServerConfig::load(file.path()).expect("load server config");
        assert_eq!(cfg.tcp_port, 9500);
        assert_eq!(cfg.udp_port, 9501);
    }

    #[test]
    fn rejects_empty_host_list() {
        let yaml = "\
statistics_port: 9090
statistics_retention_period: 3600
ping_interval: 10
connection_timeout: 2
read_timeout: 3
tcp_size: 1024
udp_size: 512
hosts: []
";
        let cfg: ProbeConfig = serde_yaml::from_str(yaml).expect("parse");
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_zero_payload_for_enabled_protocol() {
        let yaml = "\
statistics_port: 9090
statistics_retention_period: 3600
ping_interval: 10
connection_timeout: 2
read_timeout: 3
tcp_size: 0
udp_size: 512
hosts:
  - name: alpha
    address: 10.0.0.1
    tcp_port: 9500
";
        let cfg: ProbeConfig = serde_yaml::from_str(yaml).expect("parse");
        assert!(cfg.validate().is_err());
    }
}
