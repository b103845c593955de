//! # Data-Availability Test Suite
//!
//! Cross-crate flows exercising the composed graph the way a rollup node
//! uses it.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── fixtures.rs       # committees, mock signers, chain helpers
//! └── integration/
//!     ├── flows.rs      # decorator-level properties
//!     └── topologies.rs # graphs built from configuration
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p da-tests
//! cargo test -p da-tests integration::topologies::
//!
//! # Benchmarks
//! cargo bench -p da-tests
//! ```

pub mod fixtures;
pub mod integration;
