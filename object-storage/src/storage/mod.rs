/// Object storage backends
///
/// This module provides:
/// - The `ObjectStore` trait every backend implements
/// - An S3-compatible client (DigitalOcean Spaces, MinIO, AWS)
/// - An in-process store for offline runs and tests

pub mod memory;
pub mod s3_client;

pub use memory::MemoryStore;
pub use s3_client::{S3Client, S3Config};

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Object listed or stored in a bucket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredObject {
    pub bucket: String,
    pub key: String,
    pub size: u64,
    /// Not reported by S3 listings
    pub content_type: Option<String>,
    /// Not reported by S3 listings
    pub public: Option<bool>,
    pub last_modified: Option<DateTime<Utc>>,
    pub etag: Option<String>,
}

/// Storage operations the object storage facade relies on
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Bucket this store writes to
    fn bucket_name(&self) -> String;

    /// Upload the file at `source` under `key`
    async fn put_object(&self, key: &str, source: &Path, content_type: &str, public: bool) -> Result<()>;

    /// Download `key` into `destination`, returning the number of bytes written
    async fn get_object(&self, key: &str, destination: &Path) -> Result<u64>;

    /// All objects whose key starts with `prefix`
    async fn list_objects(&self, prefix: &str) -> Result<Vec<StoredObject>>;

    async fn bucket_exists(&self) -> Result<bool>;

    async fn create_bucket(&self) -> Result<()>;

    /// Public URL of `key`; whether it resolves depends on the object's ACL
    fn object_url(&self, key: &str) -> String;
}

/// Build the object key for `name` inside `folder_path`
pub fn object_key(folder_path: &str, name: &str) -> String {
    let folder = folder_path.trim_matches('/');
    if folder.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", folder, name)
    }
}

/// Treat a non-empty prefix as a folder
pub fn normalize_prefix(prefix: &str) -> String {
    if prefix.is_empty() || prefix.ends_with('/') {
        prefix.to_string()
    } else {
        format!("{}/", prefix)
    }
}
