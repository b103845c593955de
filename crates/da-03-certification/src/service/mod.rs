//! Certificate-producing and certificate-checking decorators.

mod reader;
mod writer;

pub use reader::ChainValidatingReader;
pub use writer::{CertifyingWriter};
