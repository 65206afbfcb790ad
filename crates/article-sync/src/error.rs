//! Error types for the sync workflow.

use std::sync::Arc;

use thiserror::Error;

/// Errors that can occur while syncing a single file.
#[derive(Debug, Error)]
pub enum SyncError {
    /// HTTP request failed before a response was received
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Remote service answered with a non-success status
    #[error("{service} API error: {status} - {body}")]
    Api {
        service: &'static str,
        status: reqwest::StatusCode,
        body: String,
    },

    /// File content was not valid base64
    #[error("Invalid base64 content: {0}")]
    Decode(#[from] base64::DecodeError),

    /// File content was not valid UTF-8
    #[error("File is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// Article front-matter could not be used
    #[error("Invalid front-matter: {0}")]
    FrontMatter(#[from] FrontMatterError),

    /// Update requested for a slug with no existing post
    #[error("Post not found for slug '{slug}'")]
    PostNotFound { slug: String },

    /// Contents API returned no download reference for a binary file
    #[error("No download URL returned for '{path}'")]
    MissingDownloadUrl { path: String },

    /// A referenced tag could not be created earlier in this run
    #[error("Tag '{name}' could not be resolved")]
    TagUnavailable { name: String },

    /// Existing tags could not be listed, so no tag reference can be resolved
    #[error("Tag collection could not be listed: {0}")]
    TagListing(#[source] Arc<SyncError>),

    /// Blob-store credentials could not be obtained
    #[error("Storage authentication failed: {0}")]
    Auth(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SyncError {
    /// Build an [`SyncError::Api`] from a failed response, consuming its body.
    pub(crate) async fn from_response(service: &'static str, response: reqwest::Response) -> Self {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Self::Api {
            service,
            status,
            body,
        }
    }
}

/// Errors produced while splitting and parsing article front-matter.
#[derive(Debug, Error)]
pub enum FrontMatterError {
    /// Document does not start with a `---` block
    #[error("document has no front-matter block")]
    Missing,

    /// Opening `---` has no matching closing line
    #[error("front-matter block is not terminated")]
    Unterminated,

    /// Block is not valid YAML for an article
    #[error("front-matter YAML is invalid: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Required key absent or empty
    #[error("required field '{0}' is missing")]
    MissingField(&'static str),
}

/// Configuration problems detected at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// One or more required environment variables are unset
    #[error("missing required configuration: {}", .0.join(", "))]
    Missing(Vec<&'static str>),
}

/// Convenience alias used throughout the crate.
pub type Result<T, E = SyncError> = std::result::Result<T, E>;
