//! The background eviction loop.

use std::sync::Arc;

use beacon_store::{RecordStore, RoomDirectory};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::{Clock, PresenceService};

/// Spawns the task that calls [`PresenceService::reap`] every
/// `reap_interval`.
///
/// A cycle that overruns its interval (a large registry on a slow store)
/// does not trigger a burst of catch-up cycles: missed ticks are skipped
/// and the schedule resumes from the end of the slow cycle.
pub struct Reaper;

impl Reaper {
    /// Starts the loop on the current tokio runtime.
    ///
    /// The first cycle runs immediately. The loop stops when the returned
    /// handle is shut down or dropped.
    pub fn spawn<S, C>(service: Arc<PresenceService<S, C>>) -> ReaperHandle
    where
        S: RecordStore + RoomDirectory,
        C: Clock,
    {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
        let interval = service.config().reap_interval();

        let task = tokio::spawn(async move {
            let mut ticker = time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            tracing::info!(
                interval_ms = service.config().reap_interval_ms,
                timeout_secs = service.config().heartbeat_timeout_secs,
                "reaper started"
            );

            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    _ = ticker.tick() => {
                        service.reap().await;
                    }
                }
            }

            tracing::info!("reaper stopped");
        });

        ReaperHandle {
            shutdown: Some(shutdown_tx),
            task,
        }
    }
}

/// Controls a running reaper.
#[must_use = "dropping the handle stops the reaper"]
pub struct ReaperHandle {
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl ReaperHandle {
    /// Stops the loop and waits for the in-flight cycle, if any, to
    /// finish.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Err(e) = (&mut self.task).await {
            tracing::warn!(error = %e, "reaper task ended abnormally");
        }
    }

    /// Returns `true` while the loop is running.
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}
