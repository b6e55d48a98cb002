//! Periodic refresh of every tracked query.

use crate::Tracker;
use std::future::Future;
use store::RefreshSettings;
use tokio::{sync::watch, time};
use tracing::{debug, info, warn};

/// Re-runs `refresh_all` on the configured interval.
///
/// Any settings change cancels the pending tick and rearms the timer with
/// the new interval. At most one timer is pending at any time.
pub struct RefreshScheduler {
    tracker: Tracker,
    settings: watch::Receiver<RefreshSettings>,
}

impl RefreshScheduler {
    pub fn new(tracker: Tracker) -> Self {
        let settings = tracker.subscribe_refresh();
        Self { tracker, settings }
    }

    /// Run until `shutdown` resolves.
    pub async fn run(mut self, shutdown: impl Future<Output = ()>) {
        tokio::pin!(shutdown);

        loop {
            let settings = *self.settings.borrow_and_update();

            if !settings.enabled {
                debug!("Auto refresh disabled");
                tokio::select! {
                    changed = self.settings.changed() => {
                        if changed.is_err() {
                            return;
                        }
                    }
                    _ = &mut shutdown => break,
                }
                continue;
            }

            let period = settings.interval();
            debug!(?period, "Auto refresh armed");

            tokio::select! {
                _ = time::sleep(period) => self.tick().await,
                changed = self.settings.changed() => {
                    if changed.is_err() {
                        return;
                    }
                }
                _ = &mut shutdown => break,
            }
        }

        info!("Refresh scheduler stopped");
    }

    async fn tick(&self) {
        if self.tracker.query_count() == 0 {
            return;
        }

        let count = self.tracker.refresh_all().await;
        info!(count, "Refresh cycle complete");

        if let Err(e) = self.tracker.persist().await {
            warn!(error = %e, "Failed to persist after refresh");
        }
    }
}
