//! Concurrency-safe time-series accumulator for probe measurements.
//!
//! Probes append under a (host, protocol) key; the statistics endpoint
//! drains the whole store. A single mutex serializes both paths.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Protocol label a measurement is recorded under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Tcp,
    Udp,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Tcp => f.write_str("tcp"),
            Protocol::Udp => f.write_str("udp"),
        }
    }
}

/// One recorded observation: a round-trip duration in seconds for
/// `ping_success`, or an occurrence count of 1.0 for error kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub kind: String,
    /// Nanoseconds since the Unix epoch at the time of recording.
    pub timestamp: i64,
    pub value: f64,
}

pub type StatsDump = HashMap<String, HashMap<Protocol, Vec<Measurement>>>;

/// Shared measurement store. Series are insertion-ordered, oldest first;
/// once the oldest entry of a series outlives the retention period, the
/// next append discards the older half of that series.
pub struct StatisticsStore {
    retention_period: Duration,
    stats: Mutex<StatsDump>,
}

impl StatisticsStore {
    pub fn new(retention_period: Duration) -> Self {
        Self {
            retention_period,
            stats: Mutex::new(HashMap::new()),
        }
    }

    /// Append a measurement stamped with the current time.
    pub fn add(&self, host: &str, protocol: Protocol, kind: &str, value: f64) {
        self.add_at(host, protocol, kind, value, now_nanos());
    }

    fn add_at(&self, host: &str, protocol: Protocol, kind: &str, value: f64, timestamp: i64) {
        let mut stats = self.stats.lock();
        let series = stats
            .entry(host.to_string())
            .or_default()
            .entry(protocol)
            .or_default();

        if let Some(oldest) = series.first() {
            let age = timestamp.saturating_sub(oldest.timestamp);
            if age > self.retention_period.as_nanos() as i64 {
                // Drop the older half to bound memory; retention is
                // amortized, not an exact sliding window.
                let evicted = series.len() / 2;
                series.drain(..evicted);
                tracing::info!(host, %protocol, evicted, "truncated stale measurements");
            }
        }

        series.push(Measurement {
            kind: kind.to_string(),
            timestamp,
            value,
        });
    }

    /// Take the entire store contents, leaving it empty. Measurements are
    /// returned at most once; a caller that drops the result loses them.
    pub fn dump(&self) -> StatsDump {
        std::mem::take(&mut *self.stats.lock())
    }
}

fn now_nanos() -> i64 {
    // Saturates far outside any plausible process lifetime.
    chrono::Utc::now().timestamp_nanos_opt().unwrap_or(i64::MAX)
}
