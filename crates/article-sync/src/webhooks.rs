//! GitHub push payload parsing and signature verification.

use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Prefix GitHub puts in front of the hex digest in `X-Hub-Signature-256`.
const SIGNATURE_PREFIX: &str = "sha256=";

/// Verify a GitHub webhook signature using HMAC-SHA256.
///
/// # Arguments
/// * `body` - Raw webhook body bytes
/// * `signature` - Value of the `X-Hub-Signature-256` header (`sha256=<hex>`)
/// * `secret` - Webhook signing secret
///
/// # Returns
/// `true` if signature is valid, `false` otherwise
#[must_use]
pub fn verify_webhook_signature(body: &[u8], signature: &str, secret: &str) -> bool {
    let Some(hex_digest) = signature.strip_prefix(SIGNATURE_PREFIX) else {
        return false;
    };

    let Ok(signature_bytes) = hex::decode(hex_digest) else {
        return false;
    };

    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    let computed = mac.finalize().into_bytes();

    // Constant-time comparison to prevent timing attacks
    computed.as_slice().ct_eq(&signature_bytes).into()
}

/// Push event payload (the subset this service consumes).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushEvent {
    /// Full ref that was pushed, e.g. `refs/heads/main`
    #[serde(rename = "ref", default)]
    pub git_ref: String,
    /// Commit SHA the ref points to after the push
    #[serde(default)]
    pub after: Option<String>,
    /// Repository the push went to
    pub repository: Repository,
    /// Commits in push order
    #[serde(default)]
    pub commits: Vec<Commit>,
}

/// Repository coordinates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repository {
    /// Repository name
    pub name: String,
    /// Full name (owner/repo)
    #[serde(default)]
    pub full_name: Option<String>,
    /// Owning user or organization
    pub owner: RepositoryOwner,
}

/// Repository owner. Push payloads carry `name`; other events only `login`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryOwner {
    /// Owner name (push payloads)
    #[serde(default)]
    pub name: Option<String>,
    /// Owner login
    #[serde(default)]
    pub login: Option<String>,
}

/// Single commit's file changes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Commit {
    /// Commit SHA
    #[serde(default)]
    pub id: String,
    /// Paths added by the commit
    #[serde(default)]
    pub added: Vec<String>,
    /// Paths modified by the commit
    #[serde(default)]
    pub modified: Vec<String>,
    /// Paths removed by the commit
    #[serde(default)]
    pub removed: Vec<String>,
}

/// Owner/name pair plus the revision file contents are read at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    /// Owner login or organization
    pub owner: String,
    /// Repository name
    pub repo: String,
    /// Commit to read contents at; default branch when `None`
    pub revision: Option<String>,
}

impl RepoRef {
    /// `owner/repo` form used in log fields.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }
}

impl PushEvent {
    /// Owner of the pushed repository.
    #[must_use]
    pub fn owner(&self) -> &str {
        let owner = &self.repository.owner;
        owner
            .name
            .as_deref()
            .or(owner.login.as_deref())
            .unwrap_or_default()
    }

    /// Branch name if the push targeted a branch.
    #[must_use]
    pub fn branch(&self) -> Option<&str> {
        self.git_ref.strip_prefix("refs/heads/")
    }

    /// Repository coordinates pinned to the pushed head commit.
    ///
    /// A deleted branch has an all-zero `after`; contents are then read from
    /// the default branch.
    #[must_use]
    pub fn repo_ref(&self) -> RepoRef {
        let revision = self
            .after
            .as_ref()
            .filter(|sha| !sha.is_empty() && !sha.chars().all(|c| c == '0'))
            .cloned();

        RepoRef {
            owner: self.owner().to_string(),
            repo: self.repository.name.clone(),
            revision,
        }
    }
}

/// Parsed webhook headers
#[derive(Debug, Clone)]
pub struct WebhookHeaders {
    /// Unique delivery ID
    pub delivery_id: Option<String>,
    /// Event type
    pub event_type: Option<String>,
    /// HMAC signature
    pub signature: Option<String>,
}

impl WebhookHeaders {
    /// Parse headers from a request
    #[must_use]
    pub fn from_header_map(get_header: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            delivery_id: get_header("x-github-delivery"),
            event_type: get_header("x-github-event"),
            signature: get_header("x-hub-signature-256"),
        }
    }
}
