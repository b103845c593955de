//! Outbound adapters: HTTP clients for remote committee members.

mod rest_client;
mod signer_client;
pub mod types;

#[cfg(test)]
pub(crate) mod test_server;

pub use rest_client::RestfulDasClient;
pub use signer_client::RestSignerClient;
