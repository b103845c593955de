//! # Lifecycle Trait
//!
//! Contract for graph components that own background work or connections
//! and therefore need an explicit start and stop.
//!
//! Components never start themselves; the lifecycle manager built alongside
//! the decorator graph sequences every `start`/`stop` call.
//!
//! ## Example Implementation
//!
//! ```rust,ignore
//! use shared_types::{DaError, Lifecycle};
//! use async_trait::async_trait;
//!
//! pub struct MyDaemon { /* ... */ }
//!
//! #[async_trait]
//! impl Lifecycle for MyDaemon {
//!     fn component_name(&self) -> String { "my-daemon".into() }
//!     async fn start(&self) -> Result<(), DaError> { Ok(()) }
//!     async fn stop(&self) -> Result<(), DaError> { Ok(()) }
//! }
//! ```

use crate::errors::DaError;
use async_trait::async_trait;
use std::fmt;

/// A component with explicit start/stop hooks.
#[async_trait]
pub trait Lifecycle: Send + Sync {
    /// Name used in logs and aggregated errors.
    fn component_name(&self) -> String;

    /// Begin background work. Must not be called twice without `stop`.
    async fn start(&self) -> Result<(), DaError>;

    /// Stop background work and wait for it to finish.
    async fn stop(&self) -> Result<(), DaError>;
}

/// Run state tracked for each registered component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentStatus {
    /// Registered but not started.
    Registered,
    /// `start` returned `Ok`.
    Running,
    /// `stop` returned `Ok`.
    Stopped,
    /// `start` or `stop` returned an error.
    Failed,
}

impl fmt::Display for ComponentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Registered => write!(f, "Registered"),
            Self::Running => write!(f, "Running"),
            Self::Stopped => write!(f, "Stopped"),
            Self::Failed => write!(f, "Failed"),
        }
    }
}
