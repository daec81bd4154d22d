//! Background eviction of idle rate-limit entries.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};

use super::limiter::WindowRateLimiter;

pub struct EvictionSweeper {
    limiter: Arc<WindowRateLimiter>,
    sweep_interval: Duration,
    handle: Option<JoinHandle<()>>,
}

impl EvictionSweeper {
    pub fn new(limiter: Arc<WindowRateLimiter>, sweep_interval_ms: u64) -> Self {
        Self {
            limiter,
            sweep_interval: Duration::from_millis(sweep_interval_ms),
            handle: None,
        }
    }

    /// Spawns the sweep task. A zero interval leaves the sweeper stopped.
    pub fn start(&mut self) {
        if self.sweep_interval.is_zero() {
            info!("rate limit eviction disabled");
            return;
        }
        if self.handle.is_some() {
            warn!("eviction sweeper is already running");
            return;
        }

        let limiter = Arc::clone(&self.limiter);
        let period = self.sweep_interval;

        self.handle = Some(tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // first tick completes immediately
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let evicted = limiter.evict_stale();
                if evicted > 0 {
                    info!(
                        evicted,
                        remaining = limiter.tracked_identities(),
                        "evicted idle rate limit entries"
                    );
                } else {
                    debug!("no idle rate limit entries to evict");
                }
            }
        }));

        info!(interval = ?period, "eviction sweeper started");
    }

    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            debug!("eviction sweeper stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for EvictionSweeper {
    fn drop(&mut self) {
        self.stop();
    }
}
