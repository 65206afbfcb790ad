//! OAuth access tokens for Cloud Storage.
//!
//! Either a pre-issued token is used as-is, or a service-account key is
//! exchanged for a short-lived token through the JWT bearer grant.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{Result, SyncError};

/// Scope needed to write objects.
const STORAGE_SCOPE: &str = "https://www.googleapis.com/auth/devstorage.read_write";

/// Token endpoint used when the key file does not name one.
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Lifetime requested for the signed assertion.
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// Tokens are refreshed this long before they expire.
const REFRESH_MARGIN_SECS: i64 = 60;

/// Fields of a service-account JSON key this client reads.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    /// Service account email, the assertion issuer
    pub client_email: String,
    /// PEM-encoded RSA private key
    pub private_key: String,
    /// OAuth token endpoint
    #[serde(default)]
    pub token_uri: Option<String>,
}

/// JWT claims for the bearer grant.
#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

/// Token endpoint response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

const fn default_expires_in() -> i64 {
    ASSERTION_LIFETIME_SECS
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: DateTime<Utc>,
}

/// Supplies bearer tokens for storage requests.
#[derive(Debug)]
pub struct TokenSource {
    inner: Source,
}

#[derive(Debug)]
enum Source {
    /// Token configured directly
    Fixed(String),
    /// Service account exchanging signed assertions for tokens
    ServiceAccount {
        key: ServiceAccountKey,
        client: reqwest::Client,
        cached: Mutex<Option<CachedToken>>,
    },
}

impl TokenSource {
    /// Use a pre-issued token for every request.
    #[must_use]
    pub fn fixed(token: impl Into<String>) -> Self {
        Self {
            inner: Source::Fixed(token.into()),
        }
    }

    /// Build a source from a service-account key file on disk.
    ///
    /// # Errors
    /// Returns error if the file cannot be read or is not a service-account key
    pub fn from_key_file(path: &str) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| SyncError::Auth(format!("cannot read key file {path}: {e}")))?;
        let key: ServiceAccountKey = serde_json::from_str(&raw)?;
        info!(client_email = %key.client_email, "Loaded service account key");
        Ok(Self::service_account(key))
    }

    /// Build a source from an already parsed key.
    #[must_use]
    pub fn service_account(key: ServiceAccountKey) -> Self {
        Self {
            inner: Source::ServiceAccount {
                key,
                client: reqwest::Client::new(),
                cached: Mutex::new(None),
            },
        }
    }

    /// Current access token, refreshing it when close to expiry.
    ///
    /// # Errors
    /// Returns error if signing or the token exchange fails
    pub async fn token(&self) -> Result<String> {
        match &self.inner {
            Source::Fixed(token) => Ok(token.clone()),
            Source::ServiceAccount {
                key,
                client,
                cached,
            } => {
                let mut cached = cached.lock().await;
                let now = Utc::now();
                if let Some(token) = cached.as_ref() {
                    if token.expires_at - Duration::seconds(REFRESH_MARGIN_SECS) > now {
                        return Ok(token.value.clone());
                    }
                }

                let fresh = exchange(client, key, now).await?;
                let value = fresh.value.clone();
                *cached = Some(fresh);
                Ok(value)
            }
        }
    }
}

/// Sign an assertion and trade it for an access token.
async fn exchange(
    client: &reqwest::Client,
    key: &ServiceAccountKey,
    now: DateTime<Utc>,
) -> Result<CachedToken> {
    let token_uri = key.token_uri.as_deref().unwrap_or(DEFAULT_TOKEN_URI);
    let iat = now.timestamp();
    let claims = AssertionClaims {
        iss: &key.client_email,
        scope: STORAGE_SCOPE,
        aud: token_uri,
        iat,
        exp: iat + ASSERTION_LIFETIME_SECS,
    };

    let signing_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
        .map_err(|e| SyncError::Auth(format!("invalid private key: {e}")))?;
    let assertion = encode(&Header::new(Algorithm::RS256), &claims, &signing_key)
        .map_err(|e| SyncError::Auth(format!("cannot sign assertion: {e}")))?;

    let response = client
        .post(token_uri)
        .form(&[
            ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
            ("assertion", assertion.as_str()),
        ])
        .send()
        .await?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(SyncError::Auth(format!("token endpoint returned {status}: {body}")));
    }

    let token: TokenResponse = response.json().await?;
    debug!(expires_in = token.expires_in, "Obtained storage access token");

    Ok(CachedToken {
        value: token.access_token,
        expires_at: now + Duration::seconds(token.expires_in),
    })
}
