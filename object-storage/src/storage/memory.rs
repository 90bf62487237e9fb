//! In-process object store
//!
//! Keeps objects in memory with the same key, prefix and ACL semantics as
//! the S3 client. Useful for offline runs and tests.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use super::{ObjectStore, StoredObject};
use crate::error::{ObjectStorageError, Result};

#[derive(Debug, Clone)]
struct MemoryEntry {
    data: Bytes,
    content_type: String,
    public: bool,
    last_modified: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct MemoryStore {
    bucket: String,
    objects: Arc<RwLock<BTreeMap<String, MemoryEntry>>>,
    bucket_created: Arc<AtomicBool>,
}

impl MemoryStore {
    /// Store with an existing bucket
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            objects: Arc::new(RwLock::new(BTreeMap::new())),
            bucket_created: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Store whose bucket must be created before use
    pub fn without_bucket(bucket: impl Into<String>) -> Self {
        let store = Self::new(bucket);
        store.bucket_created.store(false, Ordering::SeqCst);
        store
    }

    /// Raw stored bytes for `key`
    pub async fn object_bytes(&self, key: &str) -> Option<Bytes> {
        self.objects.read().await.get(key).map(|entry| entry.data.clone())
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }

    fn ensure_bucket(&self) -> Result<()> {
        if self.bucket_created.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(ObjectStorageError::NotFound(format!("Bucket {} does not exist", self.bucket)))
        }
    }

    fn to_stored(&self, key: &str, entry: &MemoryEntry) -> StoredObject {
        StoredObject {
            bucket: self.bucket.clone(),
            key: key.to_string(),
            size: entry.data.len() as u64,
            content_type: Some(entry.content_type.clone()),
            public: Some(entry.public),
            last_modified: Some(entry.last_modified),
            etag: None,
        }
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    fn bucket_name(&self) -> String {
        self.bucket.clone()
    }

    async fn put_object(&self, key: &str, source: &Path, content_type: &str, public: bool) -> Result<()> {
        self.ensure_bucket()?;
        let data = tokio::fs::read(source)
            .await
            .map_err(|e| ObjectStorageError::Upload(format!("Failed to read {}: {}", source.display(), e)))?;

        debug!(key, size = data.len(), public, "Storing object in memory");
        self.objects.write().await.insert(
            key.to_string(),
            MemoryEntry {
                data: Bytes::from(data),
                content_type: content_type.to_string(),
                public,
                last_modified: Utc::now(),
            },
        );
        Ok(())
    }

    async fn get_object(&self, key: &str, destination: &Path) -> Result<u64> {
        self.ensure_bucket()?;
        let data = self
            .object_bytes(key)
            .await
            .ok_or_else(|| ObjectStorageError::NotFound(format!("{}: no such key", key)))?;

        tokio::fs::write(destination, &data).await?;
        Ok(data.len() as u64)
    }

    async fn list_objects(&self, prefix: &str) -> Result<Vec<StoredObject>> {
        self.ensure_bucket()?;
        let objects = self.objects.read().await;
        Ok(objects
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, entry)| self.to_stored(key, entry))
            .collect())
    }

    async fn bucket_exists(&self) -> Result<bool> {
        Ok(self.bucket_created.load(Ordering::SeqCst))
    }

    async fn create_bucket(&self) -> Result<()> {
        self.bucket_created.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn object_url(&self, key: &str) -> String {
        format!("memory://{}/{}", self.bucket, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn put(store: &MemoryStore, key: &str, data: &[u8]) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("payload");
        tokio::fs::write(&path, data).await.unwrap();
        store.put_object(key, &path, "application/zstd", false).await.unwrap();
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let store = MemoryStore::new("test-bucket");
        put(&store, "a/b.zstd", b"payload").await;

        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let written = store.get_object("a/b.zstd", &out).await.unwrap();
        assert_eq!(written, 7);
        assert_eq!(tokio::fs::read(&out).await.unwrap(), b"payload");
    }

    #[tokio::test]
    async fn test_missing_key() {
        let store = MemoryStore::new("test-bucket");
        let dir = tempfile::tempdir().unwrap();
        let result = store.get_object("missing", &dir.path().join("out")).await;
        assert!(matches!(result, Err(ObjectStorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_prefix_listing() {
        let store = MemoryStore::new("test-bucket");
        put(&store, "data/html/a.zstd", b"a").await;
        put(&store, "data/html/b.zstd", b"b").await;
        put(&store, "data/json/c.zstd", b"c").await;
        put(&store, "root.zstd", b"d").await;

        let listed = store.list_objects("data/html/").await.unwrap();
        let keys: Vec<_> = listed.iter().map(|o| o.key.as_str()).collect();
        assert_eq!(keys, vec!["data/html/a.zstd", "data/html/b.zstd"]);
        assert_eq!(listed[0].content_type.as_deref(), Some("application/zstd"));
        assert_eq!(listed[0].public, Some(false));

        assert_eq!(store.list_objects("").await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_bucket_lifecycle() {
        let store = MemoryStore::without_bucket("fresh");
        assert!(!store.bucket_exists().await.unwrap());
        assert!(store.list_objects("").await.is_err());

        store.create_bucket().await.unwrap();
        assert!(store.bucket_exists().await.unwrap());
        assert!(store.list_objects("").await.unwrap().is_empty());
    }
}
