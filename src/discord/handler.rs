use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serenity::async_trait;
use serenity::model::gateway::Ready;
use serenity::prelude::*;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::ActivitySink;
use crate::presence::Reconciler;
use crate::scheduler::{PollJob, Scheduler};
use crate::status::StatusFetcher;

/// Slot the handler fills with the running scheduler, so shutdown can stop
/// it before the final rename.
pub type SchedulerSlot = Arc<tokio::sync::Mutex<Option<Scheduler>>>;

pub struct Handler {
    pub address: String,
    pub poll_interval: Duration,
    pub fetcher: Arc<StatusFetcher>,
    pub reconciler: Arc<Reconciler>,
    /// Set on the first `ready`; also tells shutdown whether the gateway
    /// ever came up.
    pub ready: Arc<AtomicBool>,
    pub scheduler: SchedulerSlot,
    pub cancel: CancellationToken,
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("Logged in as {}", ready.user.tag());

        // Ready fires again after a reconnect; only the first one starts
        // polling.
        if self.ready.swap(true, Ordering::SeqCst) {
            return;
        }

        self.reconciler.seed_from_surface().await;

        let job = PollJob {
            address: self.address.clone(),
            fetcher: Arc::clone(&self.fetcher),
            reconciler: Arc::clone(&self.reconciler),
            sink: Arc::new(ActivitySink::new(ctx)),
        };
        if !install_scheduler(&self.scheduler, &self.cancel, job, self.poll_interval).await {
            info!("Shutdown already in progress, not starting the poller");
        }
    }
}

/// Start polling and park the scheduler in `slot`, unless shutdown has
/// begun. Shutdown cancels before taking the slot, so checking under the
/// slot lock means a scheduler is either stopped by shutdown or never
/// spawned.
async fn install_scheduler(
    slot: &SchedulerSlot,
    cancel: &CancellationToken,
    job: PollJob,
    interval: Duration,
) -> bool {
    let mut slot = slot.lock().await;
    if cancel.is_cancelled() {
        return false;
    }
    *slot = Some(Scheduler::spawn(job, interval, cancel.child_token()));
    true
}
