//! Article pipeline: fetch and parse markdown, resolve tags, write posts.

use futures::future::join_all;
use serde_json::json;
use tracing::{debug, info, warn};

use super::{resolve_tags, ItemOutcome, SyncWorkflow, Synced, TagIndex};
use crate::classifier::{ChangeKind, ChangeSet, FileKind};
use crate::cms::{link_objects, set_localized, Entry, EntryQuery, Fields, Tag};
use crate::error::{Result, SyncError};
use crate::frontmatter::{parse_article, ArticleMeta};
use crate::webhooks::RepoRef;

impl SyncWorkflow {
    /// Import every selected article.
    ///
    /// Articles are loaded concurrently, their tags are resolved in a single
    /// pass, then posts are written concurrently. Returns the outcomes and
    /// the names of tags created along the way.
    pub(super) async fn sync_articles(
        &self,
        repo: &RepoRef,
        changes: &ChangeSet,
    ) -> (Vec<ItemOutcome>, Vec<String>) {
        if changes.article_count() == 0 {
            return (Vec::new(), Vec::new());
        }

        let loaded = join_all(changes.articles().map(|(path, change)| async move {
            (path, change, self.load_article(repo, path).await)
        }))
        .await;

        let mut names: Vec<String> = Vec::new();
        for meta in loaded.iter().filter_map(|(_, _, meta)| meta.as_ref().ok()) {
            for name in &meta.tag_names {
                if !names.contains(name) {
                    names.push(name.clone());
                }
            }
        }

        // A listing failure is reported by every article that references a tag.
        let index = resolve_tags(self.cms.as_ref(), &self.settings, &names)
            .await
            .unwrap_or_else(TagIndex::unlisted);

        let tags = &index;
        let outcomes = join_all(loaded.into_iter().map(|(path, change, meta)| async move {
            let result = match meta {
                Ok(meta) => self.import_article(&meta, change, tags).await,
                Err(e) => Err(e),
            };
            ItemOutcome::new(path, FileKind::Article, change, result)
        }))
        .await;

        (outcomes, index.created().to_vec())
    }

    /// Fetch one markdown file and parse its front-matter.
    ///
    /// # Errors
    /// Returns error if the file cannot be fetched or its front-matter is invalid
    pub async fn load_article(&self, repo: &RepoRef, path: &str) -> Result<ArticleMeta> {
        let markdown = self.source.fetch_text(repo, path).await?;
        let meta = parse_article(&markdown)?;
        debug!(path = %path, slug = %meta.slug, tags = meta.tag_names.len(), "Parsed article");
        Ok(meta)
    }

    /// Write one article to its post entry.
    ///
    /// Added articles create a new post; modified articles overwrite the
    /// title, content and tags of the post with the same slug. The entry is
    /// published only when the article asks for it.
    ///
    /// # Errors
    /// Returns [`SyncError::TagListing`] or [`SyncError::TagUnavailable`] if a
    /// referenced tag is not in `tags`, [`SyncError::PostNotFound`] if a
    /// modified article has no post, or any CMS error
    pub async fn import_article(
        &self,
        meta: &ArticleMeta,
        change: ChangeKind,
        tags: &TagIndex,
    ) -> Result<Synced> {
        let tags = tags.tags_for(&meta.tag_names)?;

        let entry = match change {
            ChangeKind::Added => self.create_post(meta, &tags).await?,
            ChangeKind::Modified => self.update_post(meta, &tags).await?,
        };

        let entry = if meta.published {
            self.cms.publish_entry(&entry).await?
        } else {
            entry
        };

        info!(
            slug = %meta.slug,
            entry_id = %entry.sys.id,
            change = ?change,
            published = meta.published,
            "Synced post"
        );

        Ok(Synced::Post {
            entry_id: entry.sys.id,
            slug: meta.slug.clone(),
            published: meta.published,
        })
    }

    async fn create_post(&self, meta: &ArticleMeta, tags: &[Tag]) -> Result<Entry> {
        let locale = &self.settings.locale;
        let mut fields = Fields::new();
        set_localized(&mut fields, "title", locale, json!(meta.title));
        set_localized(&mut fields, "content", locale, json!(meta.entry));
        set_localized(&mut fields, "slug", locale, json!(meta.slug));
        set_localized(&mut fields, "tags", locale, link_objects(tags));

        self.cms
            .create_entry(&self.settings.post_content_type, fields)
            .await
    }

    async fn update_post(&self, meta: &ArticleMeta, tags: &[Tag]) -> Result<Entry> {
        let id = self.find_post(&meta.slug).await?;
        let mut entry = self.cms.get_entry(&id).await?;
        if entry.is_published() && !meta.published {
            info!(
                slug = %meta.slug,
                entry_id = %entry.sys.id,
                "Post stays live at its last published version, changes saved as draft"
            );
        }

        let locale = &self.settings.locale;
        entry.set_field("title", locale, json!(meta.title));
        entry.set_field("content", locale, json!(meta.entry));
        entry.set_field("tags", locale, link_objects(tags));

        self.cms.update_entry(&entry).await
    }

    /// ID of the post addressed by `slug`.
    async fn find_post(&self, slug: &str) -> Result<String> {
        let query =
            EntryQuery::content_type(&self.settings.post_content_type).field_eq("slug", slug);
        let matches = self.cms.get_entries(&query).await?;

        if matches.len() > 1 {
            warn!(slug = %slug, matches = matches.len(), "Multiple posts share a slug, updating the first");
        }

        matches
            .into_iter()
            .next()
            .map(|entry| entry.sys.id)
            .ok_or_else(|| SyncError::PostNotFound {
                slug: slug.to_string(),
            })
    }
}
