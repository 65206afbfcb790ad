//! Contentful Content Management API client.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::RequestBuilder;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::{ContentManagement, Entry, EntryQuery, Fields};
use crate::error::{Result, SyncError};

const SERVICE: &str = "Contentful";

/// Media type the management API expects for request bodies.
const CMA_CONTENT_TYPE: &str = "application/vnd.contentful.management.v1+json";

/// Entries requested per page when listing.
const PAGE_SIZE: usize = 100;

/// Contentful management client scoped to one space environment.
#[derive(Debug, Clone)]
pub struct ContentfulClient {
    client: reqwest::Client,
    base_url: String,
}

/// Paged entry listing.
#[derive(Debug, Deserialize)]
struct EntryCollection {
    #[serde(default)]
    total: usize,
    #[serde(default)]
    items: Vec<Entry>,
}

/// Create/update request body.
#[derive(Debug, Serialize)]
struct EntryBody<'a> {
    fields: &'a Fields,
}

impl ContentfulClient {
    /// Create a client for `space_id`/`environment`.
    ///
    /// # Errors
    /// Returns error if headers cannot be constructed
    pub fn new(
        access_token: &str,
        api_url: &str,
        space_id: &str,
        environment: &str,
    ) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let auth_value = HeaderValue::from_str(&format!("Bearer {access_token}"))
            .map_err(|e| SyncError::Auth(format!("invalid CMS access token: {e}")))?;
        headers.insert(AUTHORIZATION, auth_value);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(CMA_CONTENT_TYPE));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: format!(
                "{}/spaces/{space_id}/environments/{environment}",
                api_url.trim_end_matches('/')
            ),
        })
    }

    fn entries_url(&self) -> String {
        format!("{}/entries", self.base_url)
    }

    fn entry_url(&self, id: &str) -> String {
        format!("{}/entries/{id}", self.base_url)
    }

    /// Send a request and decode the JSON response.
    async fn execute<R: serde::de::DeserializeOwned>(&self, request: RequestBuilder) -> Result<R> {
        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(SyncError::from_response(SERVICE, response).await);
        }
        Ok(response.json().await?)
    }

    fn with_body(request: RequestBuilder, fields: &Fields) -> Result<RequestBuilder> {
        let body = serde_json::to_vec(&EntryBody { fields })?;
        Ok(request.header(CONTENT_TYPE, CMA_CONTENT_TYPE).body(body))
    }
}

#[async_trait]
impl ContentManagement for ContentfulClient {
    #[instrument(skip(self))]
    async fn get_entries(&self, query: &EntryQuery) -> Result<Vec<Entry>> {
        let mut entries = Vec::new();

        loop {
            let mut params: Vec<(String, String)> = vec![
                ("content_type".to_string(), query.content_type.clone()),
                ("skip".to_string(), entries.len().to_string()),
                ("limit".to_string(), PAGE_SIZE.to_string()),
            ];
            params.extend(query.filters.iter().cloned());

            let page: EntryCollection = self
                .execute(self.client.get(self.entries_url()).query(&params))
                .await?;

            let fetched = page.items.len();
            entries.extend(page.items);
            if fetched == 0 || entries.len() >= page.total {
                break;
            }
        }

        debug!(count = entries.len(), "Listed entries");
        Ok(entries)
    }

    async fn get_entry(&self, id: &str) -> Result<Entry> {
        self.execute(self.client.get(self.entry_url(id))).await
    }

    #[instrument(skip(self, fields))]
    async fn create_entry(&self, content_type: &str, fields: Fields) -> Result<Entry> {
        let request = self
            .client
            .post(self.entries_url())
            .header("X-Contentful-Content-Type", content_type);
        let entry: Entry = self.execute(Self::with_body(request, &fields)?).await?;
        debug!(entry_id = %entry.sys.id, "Created draft entry");
        Ok(entry)
    }

    #[instrument(skip(self, entry), fields(entry_id = %entry.sys.id))]
    async fn update_entry(&self, entry: &Entry) -> Result<Entry> {
        let request = self
            .client
            .put(self.entry_url(&entry.sys.id))
            .header("X-Contentful-Version", entry.sys.version);
        self.execute(Self::with_body(request, &entry.fields)?).await
    }

    #[instrument(skip(self, entry), fields(entry_id = %entry.sys.id))]
    async fn publish_entry(&self, entry: &Entry) -> Result<Entry> {
        let request = self
            .client
            .put(format!("{}/published", self.entry_url(&entry.sys.id)))
            .header("X-Contentful-Version", entry.sys.version);
        self.execute(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cms::set_localized;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const BASE: &str = "/spaces/space-1/environments/master";

    fn client(server: &MockServer) -> ContentfulClient {
        ContentfulClient::new("cma-token", &server.uri(), "space-1", "master").unwrap()
    }

    fn tag_json(id: &str, name: &str) -> serde_json::Value {
        json!({
            "sys": { "id": id, "version": 2, "publishedVersion": 1 },
            "fields": { "name": { "en-US": name } }
        })
    }

    #[tokio::test]
    async fn test_get_entries_pages_until_total() {
        let server = MockServer::start().await;
        let first_page: Vec<_> = (0..PAGE_SIZE)
            .map(|i| tag_json(&format!("t{i}"), &format!("tag{i}")))
            .collect();

        Mock::given(method("GET"))
            .and(path(format!("{BASE}/entries")))
            .and(query_param("content_type", "tags"))
            .and(query_param("skip", "0"))
            .and(header("authorization", "Bearer cma-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "total": PAGE_SIZE + 1,
                "items": first_page
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("{BASE}/entries")))
            .and(query_param("skip", PAGE_SIZE.to_string()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "total": PAGE_SIZE + 1,
                "items": [tag_json("last", "last")]
            })))
            .mount(&server)
            .await;

        let entries = client(&server)
            .get_entries(&EntryQuery::content_type("tags"))
            .await
            .unwrap();
        assert_eq!(entries.len(), PAGE_SIZE + 1);
        assert_eq!(entries[PAGE_SIZE].sys.id, "last");
        assert_eq!(entries[0].field_str("name", "en-US"), Some("tag0"));
    }

    #[tokio::test]
    async fn test_get_entries_sends_field_filter() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(format!("{BASE}/entries")))
            .and(query_param("content_type", "posts"))
            .and(query_param("fields.slug", "hello"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "total": 0,
                "items": []
            })))
            .expect(1)
            .mount(&server)
            .await;

        let query = EntryQuery::content_type("posts").field_eq("slug", "hello");
        let entries = client(&server).get_entries(&query).await.unwrap();
        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn test_create_entry_sets_content_type_header() {
        let server = MockServer::start().await;
        let mut fields = Fields::new();
        set_localized(&mut fields, "name", "en-US", json!("intro"));
        set_localized(&mut fields, "slug", "en-US", json!("intro"));

        Mock::given(method("POST"))
            .and(path(format!("{BASE}/entries")))
            .and(header("X-Contentful-Content-Type", "tags"))
            .and(header("content-type", CMA_CONTENT_TYPE))
            .and(body_json(json!({
                "fields": {
                    "name": { "en-US": "intro" },
                    "slug": { "en-US": "intro" }
                }
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "sys": { "id": "new-tag", "version": 1 },
                "fields": { "name": { "en-US": "intro" } }
            })))
            .mount(&server)
            .await;

        let entry = client(&server).create_entry("tags", fields).await.unwrap();
        assert_eq!(entry.sys.id, "new-tag");
        assert_eq!(entry.sys.version, 1);
    }

    #[tokio::test]
    async fn test_update_and_publish_send_version() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path(format!("{BASE}/entries/p1")))
            .and(header("X-Contentful-Version", "4"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "sys": { "id": "p1", "version": 5 }
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path(format!("{BASE}/entries/p1/published")))
            .and(header("X-Contentful-Version", "5"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "sys": { "id": "p1", "version": 6, "publishedVersion": 5 }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client(&server);
        let entry: Entry = serde_json::from_value(json!({
            "sys": { "id": "p1", "version": 4 },
            "fields": { "title": { "en-US": "Hello" } }
        }))
        .unwrap();

        let updated = client.update_entry(&entry).await.unwrap();
        assert_eq!(updated.sys.version, 5);
        let published = client.publish_entry(&updated).await.unwrap();
        assert!(published.is_published());
    }

    #[tokio::test]
    async fn test_version_conflict_is_api_error() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(409).set_body_string("VersionMismatch"))
            .mount(&server)
            .await;

        let entry: Entry = serde_json::from_value(json!({ "sys": { "id": "p1", "version": 1 } }))
            .unwrap();
        let err = client(&server).publish_entry(&entry).await.unwrap_err();
        assert!(matches!(
            err,
            SyncError::Api { service: "Contentful", status, .. } if status == reqwest::StatusCode::CONFLICT
        ));
    }
}
