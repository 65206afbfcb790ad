//! Per-notification outcome of a sync run.

use serde_json::{json, Value};
use tracing::{error, info};

use crate::classifier::{ChangeKind, FileKind};
use crate::error::SyncError;

/// What a successfully synced file produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Synced {
    /// Article written to a post entry
    Post {
        /// Post entry ID
        entry_id: String,
        /// Slug the post is addressed by
        slug: String,
        /// Whether the entry was published
        published: bool,
    },
    /// Image written to the object store
    Asset {
        /// Object key
        key: String,
        /// Bytes written
        size: usize,
    },
}

/// Result for one pushed file.
#[derive(Debug)]
pub struct ItemOutcome {
    /// Repository-relative path
    pub path: String,
    /// Article or image
    pub kind: FileKind,
    /// Added or modified
    pub change: ChangeKind,
    /// Sync result
    pub result: Result<Synced, SyncError>,
}

impl ItemOutcome {
    /// Record the result for `path`.
    #[must_use]
    pub fn new(
        path: &str,
        kind: FileKind,
        change: ChangeKind,
        result: Result<Synced, SyncError>,
    ) -> Self {
        Self {
            path: path.to_string(),
            kind,
            change,
            result,
        }
    }

    fn to_json(&self) -> Value {
        let mut value = json!({
            "path": self.path,
            "kind": match self.kind {
                FileKind::Article => "article",
                FileKind::Image => "image",
            },
            "change": match self.change {
                ChangeKind::Added => "added",
                ChangeKind::Modified => "modified",
            },
        });

        let detail = match &self.result {
            Ok(Synced::Post {
                entry_id,
                slug,
                published,
            }) => json!({
                "status": "synced",
                "entry_id": entry_id,
                "slug": slug,
                "published": published,
            }),
            Ok(Synced::Asset { key, size }) => json!({
                "status": "synced",
                "key": key,
                "size": size,
            }),
            Err(e) => json!({
                "status": "failed",
                "error": e.to_string(),
            }),
        };

        if let (Value::Object(base), Value::Object(extra)) = (&mut value, detail) {
            base.extend(extra);
        }
        value
    }
}

/// Outcomes of every file selected from one push.
#[derive(Debug, Default)]
pub struct SyncReport {
    /// Per-file outcomes, articles first
    pub outcomes: Vec<ItemOutcome>,
    /// Tag names created during this run
    pub tags_created: Vec<String>,
}

impl SyncReport {
    /// Number of files synced successfully.
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    /// Number of files that failed.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    /// Outcome for a given path, if it was selected.
    #[must_use]
    pub fn outcome(&self, path: &str) -> Option<&ItemOutcome> {
        self.outcomes.iter().find(|o| o.path == path)
    }

    /// Log each failure once and a closing summary.
    pub fn log(&self, run_id: &str) {
        for outcome in &self.outcomes {
            if let Err(e) = &outcome.result {
                error!(
                    run_id = %run_id,
                    path = %outcome.path,
                    kind = ?outcome.kind,
                    change = ?outcome.change,
                    error = %e,
                    "Failed to sync file"
                );
            }
        }

        info!(
            run_id = %run_id,
            total = self.outcomes.len(),
            succeeded = self.succeeded(),
            failed = self.failed(),
            tags_created = self.tags_created.len(),
            "Sync run complete"
        );
    }

    /// JSON summary for API responses.
    #[must_use]
    pub fn to_json(&self) -> Value {
        json!({
            "total": self.outcomes.len(),
            "succeeded": self.succeeded(),
            "failed": self.failed(),
            "tags_created": self.tags_created,
            "items": self.outcomes.iter().map(ItemOutcome::to_json).collect::<Vec<_>>(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> SyncReport {
        SyncReport {
            outcomes: vec![
                ItemOutcome::new(
                    "articles/hello.md",
                    FileKind::Article,
                    ChangeKind::Added,
                    Ok(Synced::Post {
                        entry_id: "p1".to_string(),
                        slug: "hello".to_string(),
                        published: true,
                    }),
                ),
                ItemOutcome::new(
                    "articles/gone.md",
                    FileKind::Article,
                    ChangeKind::Modified,
                    Err(SyncError::PostNotFound {
                        slug: "gone".to_string(),
                    }),
                ),
                ItemOutcome::new(
                    "images/logo.png",
                    FileKind::Image,
                    ChangeKind::Added,
                    Ok(Synced::Asset {
                        key: "images/logo.png".to_string(),
                        size: 4,
                    }),
                ),
            ],
            tags_created: vec!["intro".to_string()],
        }
    }

    #[test]
    fn test_counts() {
        let report = report();
        assert_eq!(report.succeeded(), 2);
        assert_eq!(report.failed(), 1);
        assert!(report.outcome("articles/gone.md").unwrap().result.is_err());
        assert!(report.outcome("README.md").is_none());
    }

    #[test]
    fn test_to_json() {
        let value = report().to_json();
        assert_eq!(value["total"], 3);
        assert_eq!(value["failed"], 1);
        assert_eq!(value["tags_created"][0], "intro");
        assert_eq!(value["items"][0]["status"], "synced");
        assert_eq!(value["items"][0]["entry_id"], "p1");
        assert_eq!(value["items"][1]["status"], "failed");
        assert_eq!(value["items"][1]["error"], "Post not found for slug 'gone'");
        assert_eq!(value["items"][2]["kind"], "image");
        assert_eq!(value["items"][2]["size"], 4);
    }
}
