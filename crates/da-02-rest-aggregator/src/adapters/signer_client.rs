//! REST client for a committee member's `POST /store` route.

use crate::adapters::types::{StoreRequest, StoreResponse};
use crate::domain::ApiError;
use crate::ports::{RemoteSigner, SignerResponse};
use async_trait::async_trait;
use reqwest::Client;
use shared_types::{DaError, Timestamp};
use std::time::Duration;

pub struct RestSignerClient {
    client: Client,
    base_url: String,
}

impl RestSignerClient {
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

    async fn post_store(
        &self,
        data: &[u8],
        expiration: Timestamp,
    ) -> Result<SignerResponse, ApiError> {
        let response = self
            .client
            .post(format!("{}/store", self.base_url))
            .json(&StoreRequest::new(data, expiration))
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    ApiError::Connection(format!("Cannot connect to {}", self.base_url))
                } else {
                    ApiError::Http(e)
                }
            })?;

        if !response.status().is_success() {
            return Err(ApiError::Status(response.status().as_u16()));
        }

        let body: StoreResponse = response
            .json()
            .await
            .map_err(|e| ApiError::Parse(e.to_string()))?;
        body.decode()
    }
}

#[async_trait]
impl RemoteSigner for RestSignerClient {
    async fn store(&self, data: &[u8], expiration: Timestamp) -> Result<SignerResponse, DaError> {
        self.post_store(data, expiration)
            .await
            .map_err(|e| e.into_da_error(&self.base_url, None))
    }

    fn endpoint(&self) -> String {
        self.base_url.clone()
    }
}
