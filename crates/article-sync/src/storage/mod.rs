//! Object storage for image assets.

pub mod auth;
pub mod gcs;

use std::path::Path;

use async_trait::async_trait;

use crate::error::Result;

pub use auth::TokenSource;
pub use gcs::GcsClient;

/// Write-only object store.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `bytes` under `key`, replacing any existing object.
    async fn save(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<()>;
}

/// Media type for an object key, derived from its extension.
#[must_use]
pub fn content_type_for(key: &str) -> &'static str {
    let extension = Path::new(key)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        "avif" => "image/avif",
        "ico" => "image/x-icon",
        "bmp" => "image/bmp",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for("images/logo.png"), "image/png");
        assert_eq!(content_type_for("images/Photo.JPG"), "image/jpeg");
        assert_eq!(content_type_for("images/icon.svg"), "image/svg+xml");
        assert_eq!(content_type_for("images/blob"), "application/octet-stream");
    }
}
