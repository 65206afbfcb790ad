//! Google Cloud Storage JSON API uploads.

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use tracing::debug;

use super::{BlobStore, TokenSource};
use crate::error::{Result, SyncError};

const SERVICE: &str = "Cloud Storage";

/// Uploads objects into a single bucket.
#[derive(Debug)]
pub struct GcsClient {
    client: reqwest::Client,
    api_url: String,
    bucket: String,
    tokens: TokenSource,
}

impl GcsClient {
    /// Create a client writing to `bucket`.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be built
    pub fn new(api_url: &str, bucket: &str, tokens: TokenSource) -> Result<Self> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            bucket: bucket.to_string(),
            tokens,
        })
    }

    /// Bucket objects are written to.
    #[must_use]
    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[async_trait]
impl BlobStore for GcsClient {
    async fn save(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<()> {
        let url = format!(
            "{}/upload/storage/v1/b/{}/o",
            self.api_url,
            urlencoding::encode(&self.bucket)
        );
        let token = self.tokens.token().await?;
        let size = bytes.len();

        let response = self
            .client
            .post(&url)
            .query(&[("uploadType", "media"), ("name", key)])
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .header(CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SyncError::from_response(SERVICE, response).await);
        }

        debug!(bucket = %self.bucket, key = %key, size, "Uploaded object");
        Ok(())
    }
}
