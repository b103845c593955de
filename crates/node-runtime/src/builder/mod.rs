//! # Graph Builder
//!
//! Configuration in, running-ready DA graph out.
//!
//! | Stage | Module | Side effects |
//! |-------|--------|--------------|
//! | Plan | `plan` | none |
//! | Build | `graph` | opens backends, registers components |
//!
//! Host-supplied pieces (chain reader, external cache, exotic backends)
//! arrive through `Collaborators`.

pub mod collaborators;
pub mod graph;
pub mod plan;

pub use collaborators::{BackendFactory, Collaborators};
pub use graph::{build, build_graph, DaGraph};
pub use plan::{plan, CompositionPlan, PlanStep};
