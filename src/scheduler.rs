use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info};

/// Gate the periodic loops wait on before their first run, flipped once the
/// delivery collaborator is reachable.
#[derive(Clone)]
pub struct ReadySignal {
    tx: Arc<watch::Sender<bool>>,
}

impl ReadySignal {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn notify_ready(&self) {
        let _ = self.tx.send(true);
    }

    pub async fn ready(&self) {
        let mut rx = self.tx.subscribe();
        let _ = rx.wait_for(|ready| *ready).await;
    }
}

impl Default for ReadySignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Drives the periodic engines. Each task loop is serialized against itself
/// (the run is awaited in the loop body), runs independently of the other
/// loops, and survives any error a run returns.
pub struct Scheduler {
    ready: ReadySignal,
    handles: Vec<JoinHandle<()>>,
}

impl Scheduler {
    pub fn new(ready: ReadySignal) -> Self {
        Self {
            ready,
            handles: Vec::new(),
        }
    }

    pub fn spawn<F, Fut>(&mut self, name: &'static str, period: Duration, task: F)
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send,
    {
        let ready = self.ready.clone();
        let handle = tokio::spawn(async move {
            ready.ready().await;
            info!(task = name, period_secs = period.as_secs(), "periodic task starting");

            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(err) = task().await {
                    error!(task = name, error = format!("{err:#}"), "periodic run failed");
                }
            }
        });
        self.handles.push(handle);
    }

    /// Aborts the loops. In-flight external fetches are abandoned; store
    /// writes are transactional per unit of work, so nothing half-updated
    /// survives.
    pub fn shutdown(&mut self) {
        for handle in self.handles.drain(..) {
            handle.abort();
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}
