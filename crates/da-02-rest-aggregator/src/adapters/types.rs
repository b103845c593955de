//! JSON wire types of the committee REST protocol.
//!
//! | Route | Method | Body | Response |
//! |-------|--------|------|----------|
//! | `/get-by-hash/{hex}` | GET | - | `GetByHashResponse` |
//! | `/store` | POST | `StoreRequest` | `StoreResponse` |
//! | `/health` | GET | - | 2xx |

use crate::domain::ApiError;
use crate::ports::SignerResponse;
use serde::{Deserialize, Serialize};
use shared_types::{DataHash, Timestamp};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetByHashResponse {
    /// Hex-encoded payload.
    pub data: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreRequest {
    pub data: String,
    pub expiration: Timestamp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreResponse {
    pub data_hash: String,
    pub expiration: Timestamp,
    pub signature: String,
    pub signer: u32,
}

fn decode_hex(field: &str, value: &str) -> Result<Vec<u8>, ApiError> {
    hex::decode(value.strip_prefix("0x").unwrap_or(value))
        .map_err(|e| ApiError::Parse(format!("{}: {}", field, e)))
}

impl GetByHashResponse {
    pub fn decode(&self) -> Result<Vec<u8>, ApiError> {
        decode_hex("data", &self.data)
    }
}

impl StoreRequest {
    pub fn new(data: &[u8], expiration: Timestamp) -> Self {
        Self {
            data: hex::encode(data),
            expiration,
        }
    }
}

impl StoreResponse {
    pub fn decode(&self) -> Result<SignerResponse, ApiError> {
        let data_hash = DataHash::from_hex(&self.data_hash)
            .ok_or_else(|| ApiError::Parse(format!("data_hash: {}", self.data_hash)))?;
        let raw = decode_hex("signature", &self.signature)?;
        let signature: [u8; 96] = raw.as_slice().try_into().map_err(|_| {
            ApiError::Parse(format!("signature: expected 96 bytes, got {}", raw.len()))
        })?;
        Ok(SignerResponse {
            data_hash,
            expiration: self.expiration,
            signature,
            signer: self.signer,
        })
    }
}
