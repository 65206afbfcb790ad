//! GitHub contents API client.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use serde::Deserialize;
use tracing::{debug, instrument};

use super::SourceControl;
use crate::error::{Result, SyncError};
use crate::webhooks::RepoRef;

const SERVICE: &str = "GitHub";

/// GitHub API client for reading repository files.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    client: reqwest::Client,
    api_url: String,
    token: Option<String>,
}

/// Response of `GET /repos/{owner}/{repo}/contents/{path}` for a file.
#[derive(Debug, Clone, Deserialize)]
pub struct ContentFile {
    /// Repository-relative path
    pub path: String,
    /// Content encoding, `base64` for files under the inline size limit
    #[serde(default)]
    pub encoding: Option<String>,
    /// Inline content, line-wrapped base64
    #[serde(default)]
    pub content: Option<String>,
    /// Short-lived raw download reference
    #[serde(default)]
    pub download_url: Option<String>,
}

impl ContentFile {
    /// Decode the inline base64 content, if the API included it.
    pub fn decode_inline(&self) -> Result<Option<Vec<u8>>> {
        let inline = self
            .content
            .as_deref()
            .filter(|c| !c.is_empty() && self.encoding.as_deref() == Some("base64"));

        let Some(content) = inline else {
            return Ok(None);
        };

        let compact: String = content.chars().filter(|c| !c.is_whitespace()).collect();
        Ok(Some(STANDARD.decode(compact)?))
    }
}

impl GitHubClient {
    /// Create a new GitHub client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(token: Option<&str>, api_url: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static("2022-11-28"),
        );
        headers.insert(USER_AGENT, HeaderValue::from_static("article-sync/1.0"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            token: token.map(str::to_string),
        })
    }

    /// Get file metadata and inline content.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing, access is denied, or the API call fails.
    #[instrument(skip(self, repo), fields(repo = %repo.full_name()))]
    pub async fn get_content(&self, repo: &RepoRef, path: &str) -> Result<ContentFile> {
        let encoded_path = path
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/");
        let url = format!(
            "{}/repos/{}/{}/contents/{encoded_path}",
            self.api_url, repo.owner, repo.repo
        );

        let mut request = self.client.get(&url);
        if let Some(revision) = &repo.revision {
            request = request.query(&[("ref", revision.as_str())]);
        }
        if let Some(token) = &self.token {
            request = request.header(AUTHORIZATION, format!("Bearer {token}"));
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(SyncError::from_response(SERVICE, response).await);
        }

        let file: ContentFile = response.json().await?;
        debug!(path = %file.path, has_inline = file.content.is_some(), "Fetched file metadata");
        Ok(file)
    }

    /// Download raw bytes from a contents API download reference.
    ///
    /// # Errors
    ///
    /// Returns an error if the download fails.
    pub async fn download(&self, download_url: &str) -> Result<Vec<u8>> {
        let response = self.client.get(download_url).send().await?;
        if !response.status().is_success() {
            return Err(SyncError::from_response(SERVICE, response).await);
        }
        Ok(response.bytes().await?.to_vec())
    }

    async fn download_file(&self, file: &ContentFile) -> Result<Vec<u8>> {
        let url = file
            .download_url
            .as_deref()
            .ok_or_else(|| SyncError::MissingDownloadUrl {
                path: file.path.clone(),
            })?;
        self.download(url).await
    }
}

#[async_trait]
impl SourceControl for GitHubClient {
    async fn fetch_text(&self, repo: &RepoRef, path: &str) -> Result<String> {
        let file = self.get_content(repo, path).await?;

        // Files over the inline limit come back without content.
        let bytes = match file.decode_inline()? {
            Some(bytes) => bytes,
            None => self.download_file(&file).await?,
        };
        Ok(String::from_utf8(bytes)?)
    }

    async fn fetch_binary(&self, repo: &RepoRef, path: &str) -> Result<Vec<u8>> {
        let file = self.get_content(repo, path).await?;
        self.download_file(&file).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn repo(revision: Option<&str>) -> RepoRef {
        RepoRef {
            owner: "octo".to_string(),
            repo: "blog".to_string(),
            revision: revision.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_fetch_text_decodes_wrapped_base64() {
        let server = MockServer::start().await;
        let encoded = STANDARD.encode("---\ntitle: Hello\n---\nbody");
        let wrapped = format!("{}\n{}\n", &encoded[..10], &encoded[10..]);

        Mock::given(method("GET"))
            .and(path("/repos/octo/blog/contents/articles/hello.md"))
            .and(query_param("ref", "abc123"))
            .and(header("authorization", "Bearer gh-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "type": "file",
                "path": "articles/hello.md",
                "encoding": "base64",
                "content": wrapped,
                "download_url": null
            })))
            .mount(&server)
            .await;

        let client = GitHubClient::new(Some("gh-token"), &server.uri()).unwrap();
        let text = client
            .fetch_text(&repo(Some("abc123")), "articles/hello.md")
            .await
            .unwrap();
        assert_eq!(text, "---\ntitle: Hello\n---\nbody");
    }

    #[tokio::test]
    async fn test_fetch_binary_follows_download_url() {
        let server = MockServer::start().await;
        let png = vec![0x89, b'P', b'N', b'G', 0x00, 0xff];

        Mock::given(method("GET"))
            .and(path("/repos/octo/blog/contents/images/logo.png"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "path": "images/logo.png",
                "encoding": "base64",
                "content": "",
                "download_url": format!("{}/raw/images/logo.png", server.uri())
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/raw/images/logo.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(png.clone()))
            .mount(&server)
            .await;

        let client = GitHubClient::new(None, &server.uri()).unwrap();
        let bytes = client
            .fetch_binary(&repo(None), "images/logo.png")
            .await
            .unwrap();
        assert_eq!(bytes, png);
    }

    #[tokio::test]
    async fn test_fetch_encodes_path_segments() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/repos/octo/blog/contents/articles/my%20post.md"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "path": "articles/my post.md",
                "encoding": "base64",
                "content": STANDARD.encode("x"),
            })))
            .mount(&server)
            .await;

        let client = GitHubClient::new(None, &server.uri()).unwrap();
        let text = client
            .fetch_text(&repo(None), "articles/my post.md")
            .await
            .unwrap();
        assert_eq!(text, "x");
    }

    #[tokio::test]
    async fn test_missing_file_is_api_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string("Not Found"))
            .mount(&server)
            .await;

        let client = GitHubClient::new(None, &server.uri()).unwrap();
        let err = client
            .fetch_text(&repo(None), "articles/gone.md")
            .await
            .unwrap_err();
        match err {
            SyncError::Api { status, body, .. } => {
                assert_eq!(status, reqwest::StatusCode::NOT_FOUND);
                assert_eq!(body, "Not Found");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_binary_without_download_url() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "path": "images/logo.png"
            })))
            .mount(&server)
            .await;

        let client = GitHubClient::new(None, &server.uri()).unwrap();
        let err = client
            .fetch_binary(&repo(None), "images/logo.png")
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::MissingDownloadUrl { path } if path == "images/logo.png"));
    }
}
