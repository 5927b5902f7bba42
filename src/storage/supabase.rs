//! Supabase storage REST client
//!
//! Implements [`ObjectStore`] against the Supabase storage v1 API. Every call
//! is a point-to-point async request; non-2xx responses are surfaced as
//! [`StorageError::Backend`] with the response body as message.

use crate::config::StorageConfig;
use crate::storage::{ObjectStore, RemoteEntry, StorageError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hyper::body::Bytes;
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub struct SupabaseStore {
    client: Client,
    base_url: String,
    api_key: String,
    bucket: String,
}

/// Object metadata as returned by the list endpoint.
#[derive(Debug, Deserialize)]
struct ListedObject {
    name: String,
    updated_at: Option<DateTime<Utc>>,
}

impl SupabaseStore {
    pub fn new(config: &StorageConfig) -> Result<Self, StorageError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            bucket: config.bucket.clone(),
        })
    }

    fn object_url(&self, suffix: &str) -> String {
        format!("{}/storage/v1/object/{suffix}", self.base_url)
    }

    /// Attach the authorization headers every storage call requires.
    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .bearer_auth(&self.api_key)
            .header("apikey", &self.api_key)
    }

    async fn check_status(response: Response) -> Result<Response, StorageError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        Err(StorageError::Backend {
            status: status.as_u16(),
            message,
        })
    }

    async fn list_objects(
        &self,
        body: serde_json::Value,
    ) -> Result<Vec<RemoteEntry>, StorageError> {
        let response = self
            .authorize(
                self.client
                    .post(self.object_url(&format!("list/{}", self.bucket))),
            )
            .json(&body)
            .send()
            .await?;
        let response = Self::check_status(response).await?;

        let objects: Vec<ListedObject> = response.json().await?;
        Ok(objects
            .into_iter()
            .map(|obj| RemoteEntry {
                name: obj.name,
                updated_at: obj.updated_at,
            })
            .collect())
    }
}

#[async_trait]
impl ObjectStore for SupabaseStore {
    async fn list(
        &self,
        prefix: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<RemoteEntry>, StorageError> {
        self.list_objects(json!({
            "prefix": prefix,
            "limit": limit,
            "offset": offset,
            "sortBy": { "column": "name", "order": "asc" },
        }))
        .await
    }

    async fn find_by_name(&self, name: &str) -> Result<Vec<RemoteEntry>, StorageError> {
        let entries = self
            .list_objects(json!({
                "prefix": "",
                "limit": 1,
                "search": name,
            }))
            .await?;
        // The search is a substring match server-side; keep exact hits only.
        Ok(entries.into_iter().filter(|e| e.name == name).collect())
    }

    fn public_url(&self, name: &str) -> String {
        self.object_url(&format!("public/{}/{name}", self.bucket))
    }

    async fn upload(
        &self,
        name: &str,
        bytes: Bytes,
        content_type: &str,
        overwrite: bool,
    ) -> Result<(), StorageError> {
        let response = self
            .authorize(
                self.client
                    .post(self.object_url(&format!("{}/{name}", self.bucket))),
            )
            .header("Content-Type", content_type)
            .header("x-upsert", overwrite.to_string())
            .body(bytes)
            .send()
            .await?;
        Self::check_status(response).await?;
        Ok(())
    }

    async fn remove(&self, names: &[String]) -> Result<(), StorageError> {
        let response = self
            .authorize(self.client.delete(self.object_url(&self.bucket)))
            .json(&json!({ "prefixes": names }))
            .send()
            .await?;
        Self::check_status(response).await?;
        Ok(())
    }
}
