//! Shutdown coordination for the balancer.

use std::future::Future;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinSet;

/// Coordinator for graceful shutdown.
///
/// Provides a broadcast channel that all long-running tasks can subscribe to,
/// and owns the tasks it spawned so they can be drained on exit.
pub struct Shutdown {
    /// Broadcast channel sender.
    tx: broadcast::Sender<()>,
    /// Background tasks, each resolving to its name.
    tasks: JoinSet<&'static str>,
}

impl Shutdown {
    /// Create a new shutdown coordinator.
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self {
            tx,
            tasks: JoinSet::new(),
        }
    }

    /// Subscribe to the shutdown signal.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Run `task` in the background until it finishes or is drained.
    pub fn spawn<F>(&mut self, name: &'static str, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        tracing::debug!(task = name, "Background task started");
        self.tasks.spawn(async move {
            task.await;
            name
        });
    }

    /// Trigger the shutdown signal.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }

    /// Trigger shutdown and wait up to `deadline` for background tasks.
    ///
    /// Returns `false` if some tasks had to be aborted.
    pub async fn drain(mut self, deadline: Duration) -> bool {
        self.trigger();

        let wait_all = async {
            while let Some(joined) = self.tasks.join_next().await {
                match joined {
                    Ok(name) => tracing::debug!(task = name, "Background task stopped"),
                    Err(e) => tracing::error!(error = %e, "Background task failed"),
                }
            }
        };

        if tokio::time::timeout(deadline, wait_all).await.is_ok() {
            return true;
        }

        tracing::warn!(
            remaining = self.tasks.len(),
            "Background tasks did not stop in time, aborting"
        );
        self.tasks.shutdown().await;
        false
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
