//! Object-storage backend interface
//!
//! The server treats the storage service as an opaque collaborator: named
//! blobs with list/search/upload/remove operations and public URLs. Backend
//! failures propagate to the caller, which fails closed with a 500 response;
//! no retries are performed.

pub mod supabase;

pub use supabase::SupabaseStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hyper::body::Bytes;
use thiserror::Error;

/// A stored object as reported by the backend, consumed read-only.
#[derive(Debug, Clone)]
pub struct RemoteEntry {
    pub name: String,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("storage responded with status {status}: {message}")]
    Backend { status: u16, message: String },
}

/// Operations the server needs from the storage backend.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// List up to `limit` entries starting at `offset`, ascending by name.
    async fn list(
        &self,
        prefix: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<RemoteEntry>, StorageError>;

    /// Exact-name search, used for upload collision checks.
    async fn find_by_name(&self, name: &str) -> Result<Vec<RemoteEntry>, StorageError>;

    /// Public URL for a stored object.
    fn public_url(&self, name: &str) -> String;

    /// Store `bytes` under `name`.
    async fn upload(
        &self,
        name: &str,
        bytes: Bytes,
        content_type: &str,
        overwrite: bool,
    ) -> Result<(), StorageError>;

    /// Remove the named objects.
    async fn remove(&self, names: &[String]) -> Result<(), StorageError>;
}
