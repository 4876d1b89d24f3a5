//! Poll scheduler — runs the fetch → reconcile cycle on a fixed interval.
//!
//! Polls once immediately, then every `interval`. The task is owned by a
//! [`Scheduler`] handle and stops when its cancellation token fires.

use std::sync::Arc;
use std::time::Instant;

use tokio::task::JoinHandle;
use tokio::time::{self, Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::presence::{CycleReport, PresenceSink, Reconciler};
use crate::status::{PollOutcome, StatusFetcher};

/// Everything a single poll needs.
pub struct PollJob {
    pub address: String,
    pub fetcher: Arc<StatusFetcher>,
    pub reconciler: Arc<Reconciler>,
    pub sink: Arc<dyn PresenceSink>,
}

impl PollJob {
    /// One full cycle. Never fails: fetch errors become `Unreachable` and
    /// rename errors are swallowed by the reconciler.
    pub async fn run_once(&self) -> CycleReport {
        let outcome = self.fetcher.fetch(&self.address).await;
        let report = self.reconciler.run(&outcome, self.sink.as_ref(), Instant::now()).await;

        match &outcome {
            PollOutcome::Success(status) if status.online => {
                if status.player_names.is_empty() {
                    info!(
                        address = %self.address,
                        "Updated: {}/{} players",
                        status.player_count, status.max_players
                    );
                } else {
                    info!(
                        address = %self.address,
                        "Updated: {}/{} players ({})",
                        status.player_count,
                        status.max_players,
                        status.player_names.join(", ")
                    );
                }
            }
            PollOutcome::Success(_) => {
                info!(address = %self.address, "Server appears to be offline");
            }
            PollOutcome::Unreachable(reason) => {
                warn!(address = %self.address, "Error pinging status APIs: {}", reason);
            }
        }

        report
    }
}

pub struct Scheduler {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl Scheduler {
    /// Start polling in the background.
    pub fn spawn(job: PollJob, interval: Duration, cancel: CancellationToken) -> Self {
        let task_cancel = cancel.clone();
        let handle = tokio::spawn(async move {
            run_loop(job, interval, task_cancel).await;
        });
        Self { cancel, handle }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Cancel and wait for the loop to exit.
    pub async fn stop(self) {
        self.cancel.cancel();
        if let Err(e) = self.handle.await {
            error!("Poll task ended abnormally: {}", e);
        }
    }
}

async fn run_loop(job: PollJob, period: Duration, cancel: CancellationToken) {
    info!(
        address = %job.address,
        interval_secs = period.as_secs(),
        "📡 Status poller starting — initial poll..."
    );
    tokio::select! {
        _ = cancel.cancelled() => return,
        _ = job.run_once() => {}
    }

    let mut interval = time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval.tick().await; // Skip the immediate tick (we already ran)

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {}
        }
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = job.run_once() => {}
        }
    }

    info!("📡 Status poller stopped");
}
