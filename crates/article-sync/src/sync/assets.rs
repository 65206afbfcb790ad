//! Image pipeline: download from the repository, upload to the bucket.

use futures::future::join_all;
use tracing::info;

use super::{ItemOutcome, SyncWorkflow, Synced};
use crate::classifier::{ChangeSet, FileKind};
use crate::error::Result;
use crate::storage::content_type_for;
use crate::webhooks::RepoRef;

impl SyncWorkflow {
    /// Upload every selected image concurrently.
    pub(super) async fn sync_assets(&self, repo: &RepoRef, changes: &ChangeSet) -> Vec<ItemOutcome> {
        join_all(changes.images().map(|(path, change)| async move {
            let result = self.import_asset(repo, path).await;
            ItemOutcome::new(path, FileKind::Image, change, result)
        }))
        .await
    }

    /// Copy one image into the object store under its repository path.
    ///
    /// Existing objects at the same key are overwritten.
    ///
    /// # Errors
    /// Returns error if the download or the upload fails
    pub async fn import_asset(&self, repo: &RepoRef, path: &str) -> Result<Synced> {
        let bytes = self.source.fetch_binary(repo, path).await?;
        let size = bytes.len();

        self.blobs.save(path, bytes, content_type_for(path)).await?;
        info!(key = %path, size, "Stored image");

        Ok(Synced::Asset {
            key: path.to_string(),
            size,
        })
    }
}
