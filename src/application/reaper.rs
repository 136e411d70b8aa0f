use super::checkout::CheckoutCoordinator;
use crate::domain::intent::max_age;
use crate::error::Result;
use chrono::TimeDelta;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// Periodic trigger for reclaiming abandoned Pending intents.
pub struct ExpiryReaper {
    coordinator: Arc<CheckoutCoordinator>,
    max_age: TimeDelta,
    interval: Duration,
}

impl ExpiryReaper {
    pub fn new(coordinator: Arc<CheckoutCoordinator>, max_age_minutes: i64, interval: Duration) -> Self {
        Self {
            coordinator,
            max_age: max_age(max_age_minutes),
            interval,
        }
    }

    /// One sweep, on demand.
    pub async fn run_once(&self) -> Result<usize> {
        self.coordinator.reclaim_expired(self.max_age).await
    }

    /// Sweeps every `interval` until the handle is stopped.
    pub fn spawn(self) -> ReaperHandle {
        let (shutdown, mut stop) = oneshot::channel();
        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.interval);
            loop {
                tokio::select! {
                    _ = &mut stop => {
                        debug!("Expiry reaper stopping");
                        break;
                    }
                    _ = interval.tick() => {
                        match self.run_once().await {
                            Ok(0) => {}
                            Ok(count) => info!(count, "Expiry reaper reclaimed intents"),
                            Err(e) => error!(error = %e, "Expiry sweep failed"),
                        }
                    }
                }
            }
        });
        ReaperHandle { shutdown, task }
    }
}

pub struct ReaperHandle {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl ReaperHandle {
    pub async fn stop(self) {
        let _ = self.shutdown.send(());
        if let Err(e) = self.task.await {
            error!(error = %e, "Expiry reaper task failed");
        }
    }
}
