//! # REST Committee Reader
//!
//! Reads payloads from one remote committee member over HTTP.

use crate::adapters::types::GetByHashResponse;
use crate::domain::ApiError;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use shared_types::{DaError, DaReader, DataHash, ExpirationPolicy};
use std::time::Duration;
use tracing::debug;

/// Client for `GET /get-by-hash/{hex}` on one endpoint.
pub struct RestfulDasClient {
    client: Client,
    base_url: String,
}

impl RestfulDasClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(2)))
            .build()
            .map_err(ApiError::Http)?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn connection_error(&self, e: reqwest::Error) -> ApiError {
        if e.is_connect() {
            ApiError::Connection(format!("Cannot connect to {}", self.base_url))
        } else {
            ApiError::Http(e)
        }
    }

    async fn fetch(&self, hash: &DataHash) -> Result<Vec<u8>, ApiError> {
        let url = format!("{}/get-by-hash/{}", self.base_url, hash.to_hex());
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.connection_error(e))?;

        match response.status() {
            StatusCode::NOT_FOUND => return Err(ApiError::NotFound),
            status if !status.is_success() => return Err(ApiError::Status(status.as_u16())),
            _ => {}
        }

        let body: GetByHashResponse = response
            .json()
            .await
            .map_err(|e| ApiError::Parse(e.to_string()))?;
        body.decode()
    }
}

#[async_trait]
impl DaReader for RestfulDasClient {
    async fn get_by_hash(&self, hash: &DataHash) -> Result<Vec<u8>, DaError> {
        debug!(endpoint = %self.base_url, %hash, "[da-02] remote get");
        self.fetch(hash)
            .await
            .map_err(|e| e.into_da_error(&self.base_url, Some(*hash)))
    }

    /// Committee members retain payloads until the certified expiration.
    async fn expiration_policy(&self) -> Result<ExpirationPolicy, DaError> {
        Ok(ExpirationPolicy::DiscardAfterDataTimeout)
    }

    async fn health_check(&self) -> Result<(), DaError> {
        let url = format!("{}/health", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.connection_error(e).into_da_error(&self.base_url, None))?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(ApiError::Status(response.status().as_u16()).into_da_error(&self.base_url, None))
        }
    }

    fn name(&self) -> String {
        format!("rest({})", self.base_url)
    }
}
