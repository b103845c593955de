//! # Node Runtime Library
//!
//! Composes the data-availability graph from configuration and drives the
//! lifecycle of its background components. The `main.rs` binary is a thin
//! shell over `DaNode`.
//!
//! ## Modules
//!
//! - `container/` - configuration loading, env overrides and role rules
//! - `builder/` - composition plan and bottom-up graph construction
//! - `registry/` - lifecycle manager for background components
//! - `node` - the host-facing `DaNode` facade

#![allow(clippy::type_complexity)]

pub mod builder;
pub mod container;
pub mod node;
pub mod registry;

pub use builder::{
    build_graph, plan, BackendFactory, Collaborators, CompositionPlan, DaGraph, PlanStep,
};
pub use container::{ConfigError, DataAvailabilityConfig, NodeRole};
pub use node::DaNode;
pub use registry::{LifecycleError, LifecycleManager, StartError};
