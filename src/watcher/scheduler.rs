//! Periodic check trigger.
//!
//! Runs as a `tokio::spawn`ed task. Each tick calls `Orchestrator::check_once`;
//! the orchestrator's guard makes overlapping triggers harmless. The same loop
//! serves the cooldown follow-up raised when a recording ends.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, Duration, MissedTickBehavior};

use crate::watcher::orchestrator::Orchestrator;

/// Start the scheduler background task. The first check runs immediately.
///
/// The period is measured from the end of the previous check, so a long
/// recording never leaves a tick due the moment it finishes.
pub fn start_scheduler(orchestrator: Arc<Orchestrator>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let token = orchestrator.shutdown_token();
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        log::info!("Scheduler started (interval: {}s)", period.as_secs());

        loop {
            // A follow-up owed by the previous check is served before the next tick.
            let outcome = tokio::select! {
                biased;
                _ = token.cancelled() => break,
                _ = orchestrator.followup_requested() => {
                    tokio::select! {
                        _ = token.cancelled() => break,
                        _ = sleep(orchestrator.cooldown()) => {}
                    }
                    orchestrator.check_once().await
                }
                _ = ticker.tick() => orchestrator.check_once().await,
            };
            log::debug!("Check finished: {:?}", outcome);
            ticker.reset();
        }

        log::info!("Scheduler stopped");
    })
}
