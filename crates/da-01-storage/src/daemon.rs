//! # Periodic Background Task
//!
//! Owns one spawned loop with its `watch` shutdown channel and join handle.
//! Used by the replication daemon, the eager fallback and the aggregator
//! health check. Tasks are only started and stopped through `Lifecycle`.

use parking_lot::Mutex;
use shared_types::DaError;
use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

struct RunningTask {
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// A named loop that runs `tick` every `interval` until stopped.
pub struct PeriodicTask {
    name: String,
    interval: Duration,
    running: Mutex<Option<RunningTask>>,
}

impl PeriodicTask {
    pub fn new(name: impl Into<String>, interval: Duration) -> Self {
        Self {
            name: name.into(),
            interval,
            running: Mutex::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_running(&self) -> bool {
        self.running.lock().is_some()
    }

    /// Spawn the loop. The first tick fires immediately.
    pub fn start<F, Fut>(&self, mut tick: F) -> Result<(), DaError>
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut running = self.running.lock();
        if running.is_some() {
            return Err(DaError::Configuration(format!(
                "{} already started",
                self.name
            )));
        }
        if self.interval.is_zero() {
            return Err(DaError::Configuration(format!(
                "{} interval must be non-zero",
                self.name
            )));
        }

        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let interval = self.interval;
        let name = self.name.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => tick().await,
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }
            debug!(task = %name, "[da] background task exited");
        });

        info!(task = %self.name, interval_ms = interval.as_millis() as u64, "[da] background task started");
        *running = Some(RunningTask {
            shutdown_tx,
            handle,
        });
        Ok(())
    }

    /// Signal shutdown and wait for the loop to finish its current tick.
    pub async fn stop(&self) -> Result<(), DaError> {
        let running = self.running.lock().take();
        let Some(task) = running else {
            return Ok(());
        };
        let _ = task.shutdown_tx.send(true);
        task.handle
            .await
            .map_err(|e| DaError::transient(self.name.clone(), format!("task join failed: {}", e)))?;
        info!(task = %self.name, "[da] background task stopped");
        Ok(())
    }
}

impl Drop for PeriodicTask {
    fn drop(&mut self) {
        if let Some(task) = self.running.get_mut().take() {
            let _ = task.shutdown_tx.send(true);
            task.handle.abort();
        }
    }
}
