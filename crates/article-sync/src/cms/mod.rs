//! Headless CMS integration.
//!
//! Entries are addressed by content type and carry locale-keyed fields:
//!
//! ```text
//! { "title": { "en-US": "Hello" }, "slug": { "en-US": "hello" } }
//! ```

pub mod contentful;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::Result;

pub use contentful::ContentfulClient;

/// Locale-keyed entry fields.
pub type Fields = Map<String, Value>;

/// CMS entry as returned by the management API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    /// System metadata
    pub sys: EntrySys,
    /// Field values keyed by field id, then locale
    #[serde(default)]
    pub fields: Fields,
}

/// Entry system metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntrySys {
    /// Entry ID
    pub id: String,
    /// Current version, required for optimistic locking on update/publish
    #[serde(default)]
    pub version: u64,
    /// Version that was last published
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_version: Option<u64>,
    /// Content type link
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<Link>,
}

impl Entry {
    /// Read a string field in the given locale.
    #[must_use]
    pub fn field_str(&self, field: &str, locale: &str) -> Option<&str> {
        self.fields.get(field)?.get(locale)?.as_str()
    }

    /// Replace a field's value in the given locale, keeping other locales.
    pub fn set_field(&mut self, field: &str, locale: &str, value: Value) {
        set_localized(&mut self.fields, field, locale, value);
    }

    /// Whether the entry has a published version.
    #[must_use]
    pub const fn is_published(&self) -> bool {
        self.sys.published_version.is_some()
    }
}

/// Insert `value` under `fields[field][locale]`.
pub fn set_localized(fields: &mut Fields, field: &str, locale: &str, value: Value) {
    let slot = fields
        .entry(field.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    if !slot.is_object() {
        *slot = Value::Object(Map::new());
    }
    if let Value::Object(locales) = slot {
        locales.insert(locale.to_string(), value);
    }
}

/// Reference to another CMS object by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    /// Link target
    pub sys: LinkSys,
}

/// Link system metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkSys {
    /// Always `Link`
    #[serde(rename = "type")]
    pub kind: String,
    /// Target kind (`Entry`, `ContentType`, ...)
    pub link_type: String,
    /// Target ID
    pub id: String,
}

impl Link {
    /// Link to an entry.
    #[must_use]
    pub fn entry(id: impl Into<String>) -> Self {
        Self {
            sys: LinkSys {
                kind: "Link".to_string(),
                link_type: "Entry".to_string(),
                id: id.into(),
            },
        }
    }
}

/// Tag entry reduced to what articles reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    /// Entry ID
    pub id: String,
    /// Unique tag name
    pub name: String,
}

impl Tag {
    /// Link object pointing at this tag.
    #[must_use]
    pub fn link(&self) -> Link {
        Link::entry(&self.id)
    }
}

/// Build the link array stored in a post's `tags` field.
#[must_use]
pub fn link_objects(tags: &[Tag]) -> Value {
    Value::Array(
        tags.iter()
            .map(|t| json!(t.link()))
            .collect(),
    )
}

/// Filter for listing entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryQuery {
    /// Content type id
    pub content_type: String,
    /// Additional `key=value` filters, e.g. `fields.slug=hello`
    pub filters: Vec<(String, String)>,
}

impl EntryQuery {
    /// All entries of a content type.
    #[must_use]
    pub fn content_type(content_type: impl Into<String>) -> Self {
        Self {
            content_type: content_type.into(),
            filters: Vec::new(),
        }
    }

    /// Require an exact field match.
    #[must_use]
    pub fn field_eq(mut self, field: &str, value: impl Into<String>) -> Self {
        self.filters.push((format!("fields.{field}"), value.into()));
        self
    }
}

/// Entry operations the sync workflow issues against the CMS.
#[async_trait]
pub trait ContentManagement: Send + Sync {
    /// List every entry matching the query.
    async fn get_entries(&self, query: &EntryQuery) -> Result<Vec<Entry>>;

    /// Fetch a single entry at its latest version.
    async fn get_entry(&self, id: &str) -> Result<Entry>;

    /// Create a draft entry.
    async fn create_entry(&self, content_type: &str, fields: Fields) -> Result<Entry>;

    /// Persist the entry's fields, returning the new version.
    async fn update_entry(&self, entry: &Entry) -> Result<Entry>;

    /// Publish the entry's current version.
    async fn publish_entry(&self, entry: &Entry) -> Result<Entry>;
}
