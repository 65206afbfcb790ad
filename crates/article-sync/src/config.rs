//! Configuration for the article sync service.

use std::env;

use crate::error::ConfigError;

/// Webhook service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port.
    pub port: u16,
    /// Webhook signing secret for signature verification.
    pub webhook_secret: Option<String>,
    /// Whether push events are processed at all.
    pub enabled: bool,
    /// Only pushes to this branch are synced (e.g. `main`). `None` syncs every branch.
    pub branch: Option<String>,
    /// GitHub contents API settings.
    pub github: GitHubConfig,
    /// Contentful management API settings.
    pub cms: CmsConfig,
    /// Cloud Storage settings.
    pub storage: StorageConfig,
    /// Which repository paths are synced.
    pub paths: PathRules,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: env::var("SYNC_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3000),
            webhook_secret: non_empty("WEBHOOK_SECRET"),
            enabled: env::var("SYNC_ENABLED")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(true),
            branch: non_empty("SYNC_BRANCH"),
            github: GitHubConfig::default(),
            cms: CmsConfig::default(),
            storage: StorageConfig::default(),
            paths: PathRules::default(),
        }
    }
}

impl Config {
    /// Check that every setting needed to reach the CMS and the bucket is present.
    ///
    /// All missing variables are reported together.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut missing = Vec::new();
        if self.cms.access_token.is_none() {
            missing.push("CONTENTFUL_MANAGEMENT_API_ACCESS_TOKEN");
        }
        if self.cms.space_id.is_none() {
            missing.push("CONTENTFUL_SPACE_ID");
        }
        if self.storage.bucket.is_none() {
            missing.push("GCS_NAME");
        }
        if self.storage.access_token.is_none() && self.storage.key_path.is_none() {
            missing.push("GCS_KEY_PATH");
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Missing(missing))
        }
    }
}

/// GitHub contents API configuration.
#[derive(Debug, Clone)]
pub struct GitHubConfig {
    /// Token for private repositories. Anonymous access when unset.
    pub token: Option<String>,
    /// API base URL.
    pub api_url: String,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            token: non_empty("GITHUB_TOKEN"),
            api_url: env::var("GITHUB_API_URL")
                .unwrap_or_else(|_| "https://api.github.com".to_string()),
        }
    }
}

/// Contentful management API configuration.
#[derive(Debug, Clone)]
pub struct CmsConfig {
    /// Content management token.
    pub access_token: Option<String>,
    /// Space holding posts and tags.
    pub space_id: Option<String>,
    /// Environment within the space.
    pub environment: String,
    /// API base URL.
    pub api_url: String,
    /// Locale every field value is written under.
    pub locale: String,
    /// Content type id of article entries.
    pub post_content_type: String,
    /// Content type id of tag entries.
    pub tag_content_type: String,
}

impl Default for CmsConfig {
    fn default() -> Self {
        Self {
            access_token: non_empty("CONTENTFUL_MANAGEMENT_API_ACCESS_TOKEN"),
            space_id: non_empty("CONTENTFUL_SPACE_ID"),
            environment: env::var("CONTENTFUL_ENVIRONMENT")
                .unwrap_or_else(|_| "master".to_string()),
            api_url: env::var("CONTENTFUL_API_URL")
                .unwrap_or_else(|_| "https://api.contentful.com".to_string()),
            locale: env::var("CONTENTFUL_LOCALE").unwrap_or_else(|_| "en-US".to_string()),
            post_content_type: env::var("CONTENTFUL_POST_CONTENT_TYPE")
                .unwrap_or_else(|_| "posts".to_string()),
            tag_content_type: env::var("CONTENTFUL_TAG_CONTENT_TYPE")
                .unwrap_or_else(|_| "tags".to_string()),
        }
    }
}

/// Cloud Storage configuration.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Destination bucket name.
    pub bucket: Option<String>,
    /// GCP project id (informational, logged at startup).
    pub project_id: Option<String>,
    /// Path to a service-account JSON key.
    pub key_path: Option<String>,
    /// Pre-issued OAuth access token. Takes precedence over `key_path`.
    pub access_token: Option<String>,
    /// API base URL.
    pub api_url: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            bucket: non_empty("GCS_NAME"),
            project_id: non_empty("GCP_PROJECT_ID"),
            key_path: non_empty("GCS_KEY_PATH"),
            access_token: non_empty("GCS_ACCESS_TOKEN"),
            api_url: env::var("GCS_API_URL")
                .unwrap_or_else(|_| "https://storage.googleapis.com".to_string()),
        }
    }
}

/// Path filters deciding which pushed files are synced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathRules {
    /// Markdown articles must live under this prefix.
    pub article_prefix: String,
    /// Images must live under this prefix.
    pub image_prefix: String,
    /// Allowed image extensions, lowercase and without the dot.
    pub image_extensions: Vec<String>,
}

/// Image extensions accepted when `IMAGE_EXTENSIONS` is unset.
pub const DEFAULT_IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "svg", "webp"];

impl Default for PathRules {
    fn default() -> Self {
        Self {
            article_prefix: env::var("ARTICLE_PREFIX").unwrap_or_else(|_| "articles/".to_string()),
            image_prefix: env::var("IMAGE_PREFIX").unwrap_or_else(|_| "images/".to_string()),
            image_extensions: env::var("IMAGE_EXTENSIONS")
                .ok()
                .map(|s| parse_extensions(&s))
                .filter(|exts| !exts.is_empty())
                .unwrap_or_else(|| {
                    DEFAULT_IMAGE_EXTENSIONS
                        .iter()
                        .map(|e| (*e).to_string())
                        .collect()
                }),
        }
    }
}

impl PathRules {
    /// Check whether `extension` (no dot, any case) is an allowed image type.
    #[must_use]
    pub fn is_allowed_image(&self, extension: &str) -> bool {
        self.image_extensions
            .iter()
            .any(|e| e.eq_ignore_ascii_case(extension))
    }
}

fn parse_extensions(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|e| !e.is_empty())
        .collect()
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}
