//! Partition pushed file paths into articles and images.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use crate::config::PathRules;
use crate::webhooks::PushEvent;

/// Extension that marks a markdown article.
const ARTICLE_EXTENSION: &str = "md";

/// Kind of repository file being synced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    /// Markdown article under the article prefix
    Article,
    /// Image under the image prefix
    Image,
}

/// Whether a path was added or modified in the push.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    /// First appearance in the repository
    Added,
    /// Existing file changed
    Modified,
}

/// Four disjoint buckets of paths to sync for one push.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub articles_added: Vec<String>,
    pub articles_modified: Vec<String>,
    pub images_added: Vec<String>,
    pub images_modified: Vec<String>,
}

impl ChangeSet {
    /// Classify every added and modified path across the push's commits.
    ///
    /// Paths are de-duplicated, a path both added and modified in the same push
    /// is only treated as added, and a path whose last change in the push was a
    /// removal is dropped. Paths outside the configured prefixes or extensions
    /// are ignored without a diagnostic.
    #[must_use]
    pub fn from_push(push: &PushEvent, rules: &PathRules) -> Self {
        // Whether the last change to each path in this push was a removal.
        let mut last_change: HashMap<&str, bool> = HashMap::new();
        for commit in &push.commits {
            for path in commit.added.iter().chain(&commit.modified) {
                last_change.insert(path.as_str(), false);
            }
            for path in &commit.removed {
                last_change.insert(path.as_str(), true);
            }
        }
        let removed = |path: &str| last_change.get(path).copied().unwrap_or(false);

        let added = unique(push.commits.iter().flat_map(|c| &c.added), &HashSet::new());
        let added_set: HashSet<&str> = added.iter().copied().collect();
        let modified = unique(push.commits.iter().flat_map(|c| &c.modified), &added_set);

        let mut set = Self::default();
        for path in added.into_iter().filter(|p| !removed(*p)) {
            match classify(path, rules) {
                Some(FileKind::Article) => set.articles_added.push(path.to_string()),
                Some(FileKind::Image) => set.images_added.push(path.to_string()),
                None => {}
            }
        }
        for path in modified.into_iter().filter(|p| !removed(*p)) {
            match classify(path, rules) {
                Some(FileKind::Article) => set.articles_modified.push(path.to_string()),
                Some(FileKind::Image) => set.images_modified.push(path.to_string()),
                None => {}
            }
        }
        set
    }

    /// Number of article paths selected.
    #[must_use]
    pub fn article_count(&self) -> usize {
        self.articles_added.len() + self.articles_modified.len()
    }

    /// Number of image paths selected.
    #[must_use]
    pub fn image_count(&self) -> usize {
        self.images_added.len() + self.images_modified.len()
    }

    /// True when nothing in the push needs syncing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.article_count() == 0 && self.image_count() == 0
    }

    /// Article paths tagged with how they changed.
    pub fn articles(&self) -> impl Iterator<Item = (&str, ChangeKind)> {
        tagged(&self.articles_added, &self.articles_modified)
    }

    /// Image paths tagged with how they changed.
    pub fn images(&self) -> impl Iterator<Item = (&str, ChangeKind)> {
        tagged(&self.images_added, &self.images_modified)
    }
}

/// Decide whether a single path is an article, an image, or neither.
#[must_use]
pub fn classify(path: &str, rules: &PathRules) -> Option<FileKind> {
    let extension = Path::new(path).extension()?.to_str()?;

    if extension.eq_ignore_ascii_case(ARTICLE_EXTENSION) {
        return path
            .starts_with(&rules.article_prefix)
            .then_some(FileKind::Article);
    }

    (rules.is_allowed_image(extension) && path.starts_with(&rules.image_prefix))
        .then_some(FileKind::Image)
}

fn unique<'a>(
    paths: impl Iterator<Item = &'a String>,
    exclude: &HashSet<&str>,
) -> Vec<&'a str> {
    let mut seen = HashSet::new();
    paths
        .map(String::as_str)
        .filter(|p| !exclude.contains(p) && seen.insert(*p))
        .collect()
}

fn tagged<'a>(
    added: &'a [String],
    modified: &'a [String],
) -> impl Iterator<Item = (&'a str, ChangeKind)> {
    added
        .iter()
        .map(|p| (p.as_str(), ChangeKind::Added))
        .chain(modified.iter().map(|p| (p.as_str(), ChangeKind::Modified)))
}
