//! GitHub push webhook service that publishes a blog repository.
//!
//! This crate provides:
//! - Push payload parsing and webhook signature verification
//! - Classification of pushed paths into articles and images
//! - Front-matter parsing for markdown articles
//! - Contentful management API client for posts and tags
//! - Cloud Storage client for image uploads
//! - The sync workflow tying them together
//! - HTTP server for webhook handling (standalone service)

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)] // Most async API methods can fail

pub mod classifier;
pub mod cms;
pub mod config;
pub mod error;
pub mod frontmatter;
pub mod server;
pub mod storage;
pub mod sync;
pub mod vcs;
pub mod webhooks;

pub use classifier::{ChangeKind, ChangeSet, FileKind};
pub use cms::{ContentManagement, ContentfulClient};
pub use config::Config;
pub use error::{Result, SyncError};
pub use frontmatter::{parse_article, ArticleMeta};
pub use storage::{BlobStore, GcsClient, TokenSource};
pub use sync::{SyncReport, SyncSettings, SyncWorkflow};
pub use vcs::{GitHubClient, SourceControl};
pub use webhooks::{verify_webhook_signature, PushEvent};
