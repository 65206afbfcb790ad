//! Push-driven sync workflow.
//!
//! One [`SyncWorkflow::run`] call handles one push notification:
//!
//! 1. Classify the pushed paths into articles and images.
//! 2. Run the article pipeline and the asset pipeline concurrently.
//! 3. Collect every item's result into a [`SyncReport`].
//!
//! Clients are built once per process and shared by every run.

mod articles;
mod assets;
pub mod report;
pub mod tags;

use std::sync::Arc;

use tracing::{debug, info};

use crate::classifier::ChangeSet;
use crate::cms::ContentManagement;
use crate::config::{Config, PathRules};
use crate::storage::BlobStore;
use crate::vcs::SourceControl;
use crate::webhooks::PushEvent;

pub use report::{ItemOutcome, SyncReport, Synced};
pub use tags::{resolve_tags, TagIndex};

/// Settings the workflow needs beyond its clients.
#[derive(Debug, Clone)]
pub struct SyncSettings {
    /// Which pushed paths are synced
    pub paths: PathRules,
    /// Locale every CMS field is written under
    pub locale: String,
    /// Content type id of posts
    pub post_content_type: String,
    /// Content type id of tags
    pub tag_content_type: String,
}

impl SyncSettings {
    /// Take the workflow settings from the service configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            paths: config.paths.clone(),
            locale: config.cms.locale.clone(),
            post_content_type: config.cms.post_content_type.clone(),
            tag_content_type: config.cms.tag_content_type.clone(),
        }
    }
}

/// Syncs articles into the CMS and images into the object store.
pub struct SyncWorkflow {
    source: Arc<dyn SourceControl>,
    cms: Arc<dyn ContentManagement>,
    blobs: Arc<dyn BlobStore>,
    settings: SyncSettings,
}

impl std::fmt::Debug for SyncWorkflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncWorkflow")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl SyncWorkflow {
    /// Create a workflow over already constructed clients.
    #[must_use]
    pub fn new(
        source: Arc<dyn SourceControl>,
        cms: Arc<dyn ContentManagement>,
        blobs: Arc<dyn BlobStore>,
        settings: SyncSettings,
    ) -> Self {
        Self {
            source,
            cms,
            blobs,
            settings,
        }
    }

    /// Select the paths of `push` this workflow would sync.
    #[must_use]
    pub fn changes(&self, push: &PushEvent) -> ChangeSet {
        ChangeSet::from_push(push, &self.settings.paths)
    }

    /// Sync every article and image selected from `push`.
    ///
    /// Never fails as a whole; each file's result is recorded in the report.
    pub async fn run(&self, push: &PushEvent) -> SyncReport {
        let changes = self.changes(push);
        let repo = push.repo_ref();

        if changes.is_empty() {
            debug!(repo = %repo.full_name(), "Push touches no synced paths");
            return SyncReport::default();
        }

        info!(
            repo = %repo.full_name(),
            revision = repo.revision.as_deref().unwrap_or("default"),
            articles = changes.article_count(),
            images = changes.image_count(),
            "Syncing push"
        );

        let ((article_outcomes, tags_created), asset_outcomes) = tokio::join!(
            self.sync_articles(&repo, &changes),
            self.sync_assets(&repo, &changes),
        );

        let mut outcomes = article_outcomes;
        outcomes.extend(asset_outcomes);
        SyncReport {
            outcomes,
            tags_created,
        }
    }
}
