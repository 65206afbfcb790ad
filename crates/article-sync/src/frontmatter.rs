//! Article front-matter parsing.
//!
//! Articles carry a YAML block at the top of the file:
//!
//! ```text
//! ---
//! title: Hello
//! slug: hello
//! published: true
//! tagNames:
//!   - intro
//! ---
//! Body markdown...
//! ```

use serde::Deserialize;

use crate::error::FrontMatterError;

/// Front-matter delimiter line.
const DELIMITER: &str = "---";

/// Parsed article metadata plus its body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleMeta {
    /// Post title.
    pub title: String,
    /// Stable identifier used to find the post on later updates.
    pub slug: String,
    /// Markdown body following the front-matter block.
    pub entry: String,
    /// Whether the post should be published after writing.
    pub published: bool,
    /// Tag names in declaration order, without duplicates.
    pub tag_names: Vec<String>,
}

/// Raw YAML shape before validation.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFrontMatter {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    slug: Option<String>,
    #[serde(default)]
    published: bool,
    #[serde(default, alias = "tags")]
    tag_names: Option<Vec<String>>,
}

/// Split a markdown document into its YAML block and body.
///
/// The opening delimiter must be the first line. The body starts after the
/// closing delimiter line.
pub fn split_front_matter(document: &str) -> Result<(&str, &str), FrontMatterError> {
    let document = document.strip_prefix('\u{feff}').unwrap_or(document);

    let (first, rest) = split_line(document);
    if first.trim_end() != DELIMITER {
        return Err(FrontMatterError::Missing);
    }

    let mut offset = 0;
    let mut remaining = rest;
    while !remaining.is_empty() {
        let (line, after) = split_line(remaining);
        if line.trim_end() == DELIMITER {
            return Ok((&rest[..offset], after));
        }
        offset += remaining.len() - after.len();
        remaining = after;
    }

    Err(FrontMatterError::Unterminated)
}

/// Parse an article into metadata and body.
///
/// `title` and `slug` are required; `published` defaults to `false` and the
/// tag list to empty.
pub fn parse_article(document: &str) -> Result<ArticleMeta, FrontMatterError> {
    let (yaml, body) = split_front_matter(document)?;

    if yaml.trim().is_empty() {
        return Err(FrontMatterError::MissingField("title"));
    }
    let raw: RawFrontMatter = serde_yaml::from_str(yaml)?;

    let title = required(raw.title, "title")?;
    let slug = required(raw.slug, "slug")?;

    let mut tag_names: Vec<String> = Vec::new();
    for name in raw.tag_names.unwrap_or_default() {
        let name = name.trim().to_string();
        if !name.is_empty() && !tag_names.contains(&name) {
            tag_names.push(name);
        }
    }

    Ok(ArticleMeta {
        title,
        slug,
        entry: body.to_string(),
        published: raw.published,
        tag_names,
    })
}

fn required(value: Option<String>, field: &'static str) -> Result<String, FrontMatterError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(FrontMatterError::MissingField(field))
}

/// Split off the first line, returning it without its terminator.
fn split_line(text: &str) -> (&str, &str) {
    match text.find('\n') {
        Some(pos) => (text[..pos].trim_end_matches('\r'), &text[pos + 1..]),
        None => (text, ""),
    }
}
