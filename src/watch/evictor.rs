use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::debug;
use tracing::info;

use crate::WatchConfig;
use crate::WatcherRegistry;

/// Background sweep that drops watchers older than the configured TTL or
/// belonging to closed sessions.
pub struct WatcherEvictor {
    registry: Arc<WatcherRegistry>,
    ttl: Duration,
    interval_ms: u64,
    shutdown_signal: watch::Receiver<()>,
}

impl WatcherEvictor {
    pub fn new(
        registry: Arc<WatcherRegistry>,
        config: &WatchConfig,
        shutdown_signal: watch::Receiver<()>,
    ) -> Self {
        Self {
            registry,
            ttl: Duration::from_millis(config.watcher_ttl_ms),
            interval_ms: config.eviction_interval_ms,
            shutdown_signal,
        }
    }

    /// Spawns the sweep when eviction is enabled in `config`.
    pub fn spawn(
        registry: Arc<WatcherRegistry>,
        config: &WatchConfig,
        shutdown_signal: watch::Receiver<()>,
    ) -> Option<tokio::task::JoinHandle<()>> {
        if !config.eviction_enabled() {
            debug!("watcher eviction disabled");
            return None;
        }
        let evictor = Self::new(registry, config, shutdown_signal);
        Some(tokio::spawn(async move { evictor.run().await }))
    }

    pub async fn run(mut self) {
        let mut interval = tokio::time::interval(Duration::from_millis(self.interval_ms));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = self.shutdown_signal.changed() => {
                    info!("[WatcherEvictor] shutdown signal received.");
                    return;
                }
                _ = interval.tick() => {
                    self.registry.evict_expired(self.ttl);
                }
            }
        }
    }
}
