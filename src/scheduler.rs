//! Periodic background-task runner.
//!
//! The store registers its two tick tasks here at construction. Each task
//! gets its own timer loop; a tick that fails is logged and the loop keeps
//! going, so a single failed flush or yield never stops future ticks.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::error::Result;

/// A task the scheduler runs on a fixed interval for the life of the store.
#[async_trait::async_trait]
pub(crate) trait BackgroundTask: Send + Sync {
    /// Task name for logging
    fn name(&self) -> &'static str;

    /// How often to run this task
    fn interval(&self) -> Duration;

    /// One tick. Errors are contained at the loop boundary.
    async fn tick(&self) -> Result<()>;
}

pub(crate) struct Scheduler {
    handles: Vec<JoinHandle<()>>,
    shutdown_tx: broadcast::Sender<()>,
}

impl Scheduler {
    pub fn new() -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            handles: Vec::new(),
            shutdown_tx,
        }
    }

    /// Spawn the timer loop for a task.
    pub fn register<T: BackgroundTask + 'static>(&mut self, task: Arc<T>) {
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(task.interval());
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = task.tick().await {
                            tracing::error!(task = task.name(), error = %e, "tick failed");
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        tracing::debug!(task = task.name(), "task shutting down");
                        break;
                    }
                }
            }
        });
        self.handles.push(handle);
    }

    /// Signal all task loops to stop and wait for them to finish.
    pub async fn shutdown(mut self) {
        self.shutdown_tx.send(()).ok();
        for handle in self.handles.drain(..) {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "background task did not join cleanly");
            }
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        // A store dropped without shutdown() must not leak ticking loops
        self.shutdown_tx.send(()).ok();
    }
}
