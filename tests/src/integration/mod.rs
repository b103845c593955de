//! Integration flows across the storage, aggregation and certification crates.

pub mod flows;
pub mod topologies;
