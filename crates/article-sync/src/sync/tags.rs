//! Tag reconciliation against the CMS tag collection.
//!
//! All tag names referenced by a push are resolved in one pass before any
//! article is written, so a new tag is created at most once per notification
//! even when several articles introduce it.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use serde_json::json;
use tracing::{debug, info, warn};

use super::SyncSettings;
use crate::cms::{set_localized, ContentManagement, EntryQuery, Fields, Tag};
use crate::error::{Result, SyncError};

/// Name-to-tag lookup for one notification.
#[derive(Debug, Default)]
pub struct TagIndex {
    tags: HashMap<String, Tag>,
    created: Vec<String>,
    listing_error: Option<Arc<SyncError>>,
}

impl TagIndex {
    /// Index with no known tags; every lookup of a name fails.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Index for a run whose tag listing failed.
    ///
    /// Every non-empty lookup fails with [`SyncError::TagListing`] carrying `error`.
    #[must_use]
    pub fn unlisted(error: SyncError) -> Self {
        Self {
            listing_error: Some(Arc::new(error)),
            ..Self::default()
        }
    }

    /// Tags for `names`, in the same order.
    ///
    /// # Errors
    /// Returns [`SyncError::TagListing`] if the tag collection could not be
    /// listed, or [`SyncError::TagUnavailable`] for the first name that could
    /// not be resolved
    pub fn tags_for(&self, names: &[String]) -> Result<Vec<Tag>> {
        if let (Some(error), false) = (&self.listing_error, names.is_empty()) {
            return Err(SyncError::TagListing(Arc::clone(error)));
        }
        names
            .iter()
            .map(|name| {
                self.tags
                    .get(name)
                    .cloned()
                    .ok_or_else(|| SyncError::TagUnavailable { name: name.clone() })
            })
            .collect()
    }

    /// Names of the tags created while building this index.
    #[must_use]
    pub fn created(&self) -> &[String] {
        &self.created
    }
}

/// Resolve `names` to tag entries, creating and publishing the missing ones.
///
/// Existing tags are matched by exact, case-sensitive name. A tag that fails
/// to be created is logged and left out of the index, so only the articles
/// referencing it fail.
///
/// # Errors
/// Returns error if the existing tag collection cannot be listed
pub async fn resolve_tags(
    cms: &dyn ContentManagement,
    settings: &SyncSettings,
    names: &[String],
) -> Result<TagIndex> {
    let mut index = TagIndex::empty();
    if names.is_empty() {
        return Ok(index);
    }

    let existing = cms
        .get_entries(&EntryQuery::content_type(&settings.tag_content_type))
        .await?;

    for entry in &existing {
        let Some(name) = entry.field_str("name", &settings.locale) else {
            continue;
        };
        if !names.iter().any(|n| n == name) {
            continue;
        }
        if index.tags.contains_key(name) {
            warn!(tag = %name, entry_id = %entry.sys.id, "Duplicate tag entry in CMS, using first");
            continue;
        }
        index.tags.insert(
            name.to_string(),
            Tag {
                id: entry.sys.id.clone(),
                name: name.to_string(),
            },
        );
    }

    let missing: Vec<&String> = names
        .iter()
        .filter(|n| !index.tags.contains_key(n.as_str()))
        .collect();
    debug!(
        requested = names.len(),
        existing = index.tags.len(),
        missing = missing.len(),
        "Reconciled tag names"
    );

    let created = join_all(
        missing
            .into_iter()
            .map(|name| async move { (name, create_tag(cms, settings, name).await) }),
    )
    .await;

    for (name, result) in created {
        match result {
            Ok(tag) => {
                index.created.push(name.clone());
                index.tags.insert(name.clone(), tag);
            }
            Err(e) => warn!(tag = %name, error = %e, "Failed to create tag"),
        }
    }

    Ok(index)
}

/// Create a draft tag entry named `name` and publish it.
async fn create_tag(
    cms: &dyn ContentManagement,
    settings: &SyncSettings,
    name: &str,
) -> Result<Tag> {
    let mut fields = Fields::new();
    set_localized(&mut fields, "name", &settings.locale, json!(name));
    set_localized(&mut fields, "slug", &settings.locale, json!(name));

    let draft = cms
        .create_entry(&settings.tag_content_type, fields)
        .await?;
    let published = cms.publish_entry(&draft).await?;
    info!(tag = %name, entry_id = %published.sys.id, "Created tag");

    Ok(Tag {
        id: published.sys.id,
        name: name.to_string(),
    })
}
