//! Periodic reclamation of expired rate limit entries.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, trace};

use super::clock::Clock;
use super::limiter::RateLimiter;

/// Default time between sweeps.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Something holding expirable state that can be swept.
pub trait Sweep: Send + Sync {
    /// Remove expired state, returning how many entries were dropped.
    fn sweep(&self) -> usize;

    /// Label for log output.
    fn label(&self) -> &str;
}

impl<C: Clock> Sweep for RateLimiter<C> {
    fn sweep(&self) -> usize {
        self.cleanup()
    }

    fn label(&self) -> &str {
        self.name()
    }
}

/// Spawn a task that sweeps every target once per `every`.
///
/// The first sweep happens one full interval after spawning. The task exits
/// once `shutdown` carries `true` or its sender is dropped.
pub fn spawn_sweeper(
    targets: Vec<Arc<dyn Sweep>>,
    every: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        info!(
            interval_secs = every.as_secs(),
            targets = targets.len(),
            "Rate limit sweeper started"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let mut removed = 0;
                    for target in &targets {
                        let n = target.sweep();
                        trace!(target = %target.label(), removed = n, "Swept limiter");
                        removed += n;
                    }
                    debug!(removed, "Periodic rate limit sweep complete");
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Rate limit sweeper stopped");
    })
}
