//! # Lifecycle Manager
//!
//! Ordered registry of every graph component with a start/stop hook.
//!
//! ```text
//! start:  c0 ─▶ c1 ─▶ c2 ✗        stop:  c4 ─▶ c3 ─▶ c2 ─▶ c1 ─▶ c0
//!               ◀── c1 ◀── c0          (every component, failures collected)
//!          (rollback in reverse)
//! ```
//!
//! Start and stop are strictly sequential; no two hooks overlap.

use parking_lot::RwLock;
use shared_types::{ComponentStatus, DaError, Lifecycle};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

/// Failures collected while stopping components.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{} component(s) failed: {}", .failures.len(), summary(.failures))]
pub struct LifecycleError {
    /// `(component, error)` in the order they occurred.
    pub failures: Vec<(String, DaError)>,
}

fn summary(failures: &[(String, DaError)]) -> String {
    failures
        .iter()
        .map(|(name, e)| format!("[{}] {}", name, e))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Error returned when start fails.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("failed to start {component}: {error}")]
pub struct StartError {
    pub component: String,
    pub error: DaError,
    /// Failures while rolling back already-started components.
    pub rollback: Vec<(String, DaError)>,
}

struct Entry {
    component: Arc<dyn Lifecycle>,
    status: ComponentStatus,
}

/// Starts components in registration order and stops them in reverse.
#[derive(Default)]
pub struct LifecycleManager {
    entries: RwLock<Vec<Entry>>,
    // Serializes start/stop so hooks never overlap.
    sequence: tokio::sync::Mutex<()>,
}

impl LifecycleManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a component.
    pub fn register(&self, component: Arc<dyn Lifecycle>) {
        info!(component = %component.component_name(), "[da] registering component");
        self.entries.write().push(Entry {
            component,
            status: ComponentStatus::Registered,
        });
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn component(&self, index: usize) -> Arc<dyn Lifecycle> {
        Arc::clone(&self.entries.read()[index].component)
    }

    fn set_status(&self, index: usize, status: ComponentStatus) {
        if let Some(entry) = self.entries.write().get_mut(index) {
            entry.status = status;
        }
    }

    /// Start every component in order. On failure, already-started
    /// components are stopped in reverse and later ones are never started.
    pub async fn start(&self) -> Result<(), StartError> {
        let _guard = self.sequence.lock().await;
        let count = self.len();

        for index in 0..count {
            let component = self.component(index);
            let name = component.component_name();
            info!(component = %name, "[da] starting");

            if let Err(e) = component.start().await {
                error!(component = %name, error = %e, "[da] start failed, rolling back");
                self.set_status(index, ComponentStatus::Failed);

                let mut rollback = Vec::new();
                for prior in (0..index).rev() {
                    let started = self.component(prior);
                    match started.stop().await {
                        Ok(()) => self.set_status(prior, ComponentStatus::Stopped),
                        Err(stop_err) => {
                            warn!(
                                component = %started.component_name(),
                                error = %stop_err,
                                "[da] rollback stop failed"
                            );
                            self.set_status(prior, ComponentStatus::Failed);
                            rollback.push((started.component_name(), stop_err));
                        }
                    }
                }

                return Err(StartError {
                    component: name,
                    error: e,
                    rollback,
                });
            }
            self.set_status(index, ComponentStatus::Running);
        }
        Ok(())
    }

    /// Stop every component in reverse order, collecting failures.
    pub async fn stop(&self) -> Result<(), LifecycleError> {
        let _guard = self.sequence.lock().await;
        let mut failures = Vec::new();

        for index in (0..self.len()).rev() {
            let component = self.component(index);
            let name = component.component_name();
            info!(component = %name, "[da] stopping");

            match component.stop().await {
                Ok(()) => self.set_status(index, ComponentStatus::Stopped),
                Err(e) => {
                    warn!(component = %name, error = %e, "[da] stop failed");
                    self.set_status(index, ComponentStatus::Failed);
                    failures.push((name, e));
                }
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(LifecycleError { failures })
        }
    }

    /// `(component, status)` in registration order.
    pub fn statuses(&self) -> Vec<(String, ComponentStatus)> {
        self.entries
            .read()
            .iter()
            .map(|e| (e.component.component_name(), e.status))
            .collect()
    }

    pub fn print_status(&self) {
        info!("===========================================");
        info!("  DA COMPONENT STATUS");
        info!("===========================================");
        for (name, status) in self.statuses() {
            info!("  {:30} {}", name, status);
        }
        info!("===========================================");
    }
}
