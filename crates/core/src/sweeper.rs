//! Background lease sweeper
//!
//! `TaskQueue::dequeue` already reclaims lazily; the sweeper makes sure
//! abandoned work goes back to `Pending` even when no worker is polling.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::queue::TaskQueue;

/// Default period between sweeps
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(5);

/// Spawn a task that calls [`TaskQueue::reclaim_expired`] every `interval`
/// until `shutdown_rx` observes `true` (or its sender is dropped).
pub fn spawn_lease_sweeper(
    queue: Arc<TaskQueue>,
    interval: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        info!(interval_ms = interval.as_millis() as u64, "Lease sweeper started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let reclaimed = queue.reclaim_expired();
                    if !reclaimed.is_empty() {
                        debug!(count = reclaimed.len(), "Sweep reclaimed leases");
                    }
                }
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Lease sweeper stopped");
    })
}
