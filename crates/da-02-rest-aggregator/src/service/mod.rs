//! Quorum services over remote committee members.

mod reader;
mod writer;

pub use reader::QuorumRestAggregator;
pub use writer::{QuorumStoreAggregator, MAX_SIGNERS};
