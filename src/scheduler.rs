//! Drives every registered probe on its own periodic timer.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::config::ProbeConfig;
use crate::probe::{probes_for_host, Probe};
use crate::stats::StatisticsStore;

/// Spawns one task per (host, enabled protocol) probe. Rounds for a
/// single probe never overlap; probes only share the statistics store.
pub struct Scheduler {
    config: Arc<ProbeConfig>,
    store: Arc<StatisticsStore>,
    stop_tx: broadcast::Sender<()>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Scheduler {
    pub fn new(config: Arc<ProbeConfig>, store: Arc<StatisticsStore>) -> Self {
        let (stop_tx, _) = broadcast::channel(1);
        Self {
            config,
            store,
            stop_tx,
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Register and start the probes implied by the configured hosts.
    pub fn start(&self) {
        let mut tasks = self.tasks.lock();
        for host in &self.config.hosts {
            for probe in probes_for_host(&self.config, host, &self.store) {
                tracing::info!(
                    host = probe.host_name(),
                    protocol = %probe.protocol(),
                    interval = ?self.config.ping_interval,
                    "scheduling probe"
                );
                tasks.push(tokio::spawn(run_probe_loop(
                    probe,
                    self.config.clone(),
                    self.stop_tx.subscribe(),
                )));
            }
        }
        tracing::info!(probes = tasks.len(), "scheduler started");
    }

    /// Number of probe tasks currently registered.
    pub fn probe_count(&self) -> usize {
        self.tasks.lock().len()
    }

    /// Signal every probe loop to stop and wait for the tasks to finish.
    /// The production binary runs until killed; this exists for orderly
    /// teardown in embedding code and tests.
    pub async fn shutdown(&self) {
        let _ = self.stop_tx.send(());
        let tasks = std::mem::take(&mut *self.tasks.lock());
        for task in tasks {
            let _ = task.await;
        }
        tracing::info!("scheduler stopped");
    }
}

/// One probe's timer loop. The round body runs inline, so a tick never
/// starts while the previous round is in flight; missed ticks are
/// skipped rather than queued.
async fn run_probe_loop(
    probe: Probe,
    config: Arc<ProbeConfig>,
    mut stop_rx: broadcast::Receiver<()>,
) {
    let mut ticker = tokio::time::interval(config.ping_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = stop_rx.recv() => break,
            _ = ticker.tick() => probe.execute().await,
        }
    }
}
