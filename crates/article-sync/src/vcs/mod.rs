//! Source control integrations.
//!
//! The sync workflow only needs to read file contents at a revision; this
//! module defines that seam and the GitHub implementation of it.
//!
//! # Example
//!
//! ```no_run
//! use article_sync::vcs::{GitHubClient, SourceControl};
//! use article_sync::webhooks::RepoRef;
//!
//! # async fn example() -> article_sync::error::Result<()> {
//! let client = GitHubClient::new(None, "https://api.github.com")?;
//! let repo = RepoRef {
//!     owner: "octo".to_string(),
//!     repo: "blog".to_string(),
//!     revision: None,
//! };
//! let markdown = client.fetch_text(&repo, "articles/hello.md").await?;
//! # Ok(())
//! # }
//! ```

pub mod github;

use async_trait::async_trait;

use crate::error::Result;
use crate::webhooks::RepoRef;

pub use github::GitHubClient;

/// Read-only access to repository file contents.
#[async_trait]
pub trait SourceControl: Send + Sync {
    /// Fetch a text file and decode it as UTF-8.
    async fn fetch_text(&self, repo: &RepoRef, path: &str) -> Result<String>;

    /// Fetch the raw bytes of a binary file.
    async fn fetch_binary(&self, repo: &RepoRef, path: &str) -> Result<Vec<u8>>;
}
