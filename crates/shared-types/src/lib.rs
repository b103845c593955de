//! # Shared Types Crate
//!
//! This crate contains the domain entities, the error taxonomy and the port
//! traits shared by every layer of the data-availability decorator graph.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: All cross-crate types are defined here.
//! - **Content Addressing**: A payload's key is the Keccak-256 of its bytes;
//!   every layer must return bytes that hash to the requested key.
//! - **Explicit Capabilities**: Readers, storage services, writers and
//!   enumerable stores are separate traits; nothing inspects types at runtime.

pub mod entities;
pub mod errors;
pub mod lifecycle;
pub mod ports;

pub use entities::*;
pub use errors::*;
pub use lifecycle::{ComponentStatus, Lifecycle};
pub use ports::*;
