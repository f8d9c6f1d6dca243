//! Event loop driving live wakeup delivery.
//!
//! Reconciliation has already run by the time a [`WakeupScheduler`] exists,
//! so this loop only has to poll the wake service for due firings and feed
//! them to [`WakeupScheduler::on_fired`] until shutdown.

use std::future::Future;
use std::time::Duration as StdDuration;

use serde::{Deserialize, Serialize};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use super::scheduler::WakeupScheduler;
use super::traits::{Clock, Feedback, KeyValueStore, WakeService};
use super::types::FireOutcome;

/// Counters from one run of the loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub ticks: u64,
    pub handled: u64,
    pub duplicates: u64,
    pub ignored: u64,
}

/// Deliver firings every `poll_interval` until `shutdown` resolves.
pub async fn run<W, S, F, C, Fut>(
    scheduler: &mut WakeupScheduler<W, S, F, C>,
    poll_interval: StdDuration,
    shutdown: Fut,
) -> RunSummary
where
    W: WakeService,
    S: KeyValueStore,
    F: Feedback,
    C: Clock,
    Fut: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    let mut ticker = tokio::time::interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut summary = RunSummary::default();

    info!(interval_ms = poll_interval.as_millis() as u64, "watching for wakeups");
    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = ticker.tick() => {
                summary.ticks += 1;
                for (event, outcome) in scheduler.dispatch_fired() {
                    debug!(id = %event.id, ?outcome, "delivered wakeup");
                    match outcome {
                        FireOutcome::Handled => summary.handled += 1,
                        FireOutcome::Duplicate => summary.duplicates += 1,
                        FireOutcome::Ignored => summary.ignored += 1,
                    }
                }
            }
        }
    }
    info!(?summary, "stopped watching");
    summary
}
