use crate::{domain::PerceptualHasher, errors::HashError};
use async_trait::async_trait;
use backoff::ExponentialBackoff;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing;

#[derive(Serialize)]
struct HashRequest<'a> {
    image_url: &'a str,
}

#[derive(Deserialize)]
struct HashResponse {
    hash: String,
}

/// Client for the external perceptual-hashing service.
///
/// Connection failures and 5xx answers are retried with exponential backoff;
/// any other failure is returned immediately.
#[derive(Debug, Clone)]
pub struct HttpPerceptualHasher {
    client: reqwest::Client,
    endpoint: String,
    max_elapsed: Duration,
}

impl HttpPerceptualHasher {
    pub fn new(endpoint: String) -> Result<Self, HashError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        tracing::info!(%endpoint, "Initializing HttpPerceptualHasher");
        Ok(Self {
            client,
            endpoint,
            max_elapsed: Duration::from_secs(20),
        })
    }

    /// Caps the total time spent retrying one hash request.
    pub fn with_max_elapsed(mut self, max_elapsed: Duration) -> Self {
        self.max_elapsed = max_elapsed;
        self
    }

    async fn request_once(&self, image_url: &str) -> Result<String, backoff::Error<HashError>> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&HashRequest { image_url })
            .send()
            .await
            .map_err(|e| backoff::Error::transient(HashError::Request(e)))?;

        let status = response.status();
        if status.is_server_error() {
            tracing::warn!(%status, %image_url, "Hashing service unavailable, will retry");
            let err = response.error_for_status().err().map(HashError::Request).unwrap_or_else(|| {
                HashError::InvalidResponse(format!("unexpected status {}", status))
            });
            return Err(backoff::Error::transient(err));
        }

        let body: HashResponse = response
            .error_for_status()
            .map_err(|e| backoff::Error::permanent(HashError::Request(e)))?
            .json()
            .await
            .map_err(|e| backoff::Error::permanent(HashError::Request(e)))?;

        let hash = body.hash.trim().to_string();
        if hash.is_empty() {
            return Err(backoff::Error::permanent(HashError::InvalidResponse(
                "empty hash".into(),
            )));
        }
        Ok(hash)
    }
}

#[async_trait]
impl PerceptualHasher for HttpPerceptualHasher {
    async fn hash(&self, image_url: &str) -> Result<String, HashError> {
        let policy = ExponentialBackoff {
            max_elapsed_time: Some(self.max_elapsed),
            ..ExponentialBackoff::default()
        };

        let hash = backoff::future::retry(policy, move || self.request_once(image_url)).await?;
        tracing::debug!(%image_url, %hash, "Computed perceptual hash");
        Ok(hash)
    }
}
