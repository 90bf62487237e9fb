//! Compress-and-upload facade over an [`ObjectStore`]

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, error, info, warn, Instrument};

use shared::observability::OperationContext;

use crate::compression::{CompressionFormat, FileCompressor};
use crate::config::Config;
use crate::error::{ObjectStorageError, Result};
use crate::metadata::{FileRecord, MetadataStore};
use crate::storage::{normalize_prefix, object_key, ObjectStore, S3Client, StoredObject};

/// Combines compression, object storage and optional upload metadata
#[derive(Clone)]
pub struct ObjectStorage {
    store: Arc<dyn ObjectStore>,
    compressor: FileCompressor,
    metadata: Option<MetadataStore>,
    public_access: bool,
}

impl std::fmt::Debug for ObjectStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectStorage")
            .field("bucket", &self.store.bucket_name())
            .field("compression_level", &self.compressor.level())
            .field("metadata", &self.metadata.is_some())
            .field("public_access", &self.public_access)
            .finish()
    }
}

impl ObjectStorage {
    /// `compression_level` must be within 1..=9
    pub fn new(store: Arc<dyn ObjectStore>, compression_level: u32, public_access: bool) -> Result<Self> {
        Ok(Self {
            store,
            compressor: FileCompressor::new(compression_level)?,
            metadata: None,
            public_access,
        })
    }

    /// Build an S3-backed facade (plus metadata store when configured)
    pub async fn from_config(config: &Config) -> Result<Self> {
        let store = Arc::new(S3Client::new(config.storage.clone()).await?);
        let storage = Self::new(store, config.compression.level, config.compression.public_access)?;

        match &config.metadata {
            Some(metadata_config) => {
                let metadata = MetadataStore::connect(metadata_config).await?;
                Ok(storage.with_metadata(metadata))
            }
            None => Ok(storage),
        }
    }

    pub fn with_metadata(mut self, metadata: MetadataStore) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn metadata(&self) -> Option<&MetadataStore> {
        self.metadata.as_ref()
    }

    /// Compress `input_file` and upload it as `<folder_path>/<object_name>.<ext>`.
    ///
    /// `public_access` overrides the configured default ACL for this upload.
    /// Returns the object URL.
    pub async fn compress_and_upload(
        &self,
        input_file: &Path,
        object_name: &str,
        folder_path: &str,
        format: &str,
        public_access: Option<bool>,
    ) -> Result<String> {
        let ctx = OperationContext::new("compress_and_upload", input_file.display().to_string());
        let result = self
            .upload_inner(input_file, object_name, folder_path, format, public_access)
            .instrument(ctx.span())
            .await;
        finish(&ctx, result)
    }

    /// Download `<folder_path>/<object_name>` and decompress it into `output_file`.
    ///
    /// The format extension is appended to `object_name` exactly as
    /// [`compress_and_upload`](Self::compress_and_upload) does, so the upload
    /// name can be reused as is. When that key is missing and `object_name`
    /// already ends in the extension, `object_name` is tried as the full key.
    pub async fn download_and_decompress(
        &self,
        object_name: &str,
        output_file: &Path,
        folder_path: &str,
        format: &str,
    ) -> Result<()> {
        let ctx = OperationContext::new("download_and_decompress", object_key(folder_path, object_name));
        let result = self
            .download_inner(object_name, output_file, folder_path, format)
            .instrument(ctx.span())
            .await;
        finish(&ctx, result)
    }

    /// Objects under `prefix`; a non-empty prefix is treated as a folder
    pub async fn list_objects(&self, prefix: &str) -> Result<Vec<StoredObject>> {
        let prefix = normalize_prefix(prefix);
        let ctx = OperationContext::new("list_objects", prefix.clone());
        let result = self.store.list_objects(&prefix).instrument(ctx.span()).await;
        finish(&ctx, result)
    }

    pub fn object_url(&self, key: &str) -> String {
        self.store.object_url(key)
    }

    /// Create the configured bucket unless it already exists
    pub async fn create_bucket(&self) -> Result<()> {
        let ctx = OperationContext::new("create_bucket", self.store.bucket_name());
        let result = self.store.create_bucket().instrument(ctx.span()).await;
        finish(&ctx, result)
    }

    pub fn compression_ratio(&self, original: &Path, compressed: &Path) -> Result<f64> {
        self.compressor.compression_ratio(original, compressed)
    }

    async fn upload_inner(
        &self,
        input_file: &Path,
        object_name: &str,
        folder_path: &str,
        format: &str,
        public_access: Option<bool>,
    ) -> Result<String> {
        // Validate before touching the filesystem or the network
        let format: CompressionFormat = format.parse()?;

        let original_size = match tokio::fs::metadata(input_file).await {
            Ok(meta) if meta.is_file() => meta.len(),
            Ok(_) => {
                return Err(ObjectStorageError::Io(std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("{} is not a regular file", input_file.display()),
                )))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ObjectStorageError::InputNotFound(input_file.to_path_buf()))
            }
            Err(e) => return Err(e.into()),
        };

        // Removed on drop, whichever way this function returns
        let staged = tempfile::Builder::new()
            .prefix("object-storage-")
            .suffix(&format!(".{}", format.extension()))
            .tempfile()?;
        let staged_path = staged.path().to_path_buf();

        let compressor = self.compressor;
        let source = input_file.to_path_buf();
        let target = staged_path.clone();
        let compressed_size =
            tokio::task::spawn_blocking(move || compressor.compress(&source, &target, format)).await??;

        let key = object_key(folder_path, &format!("{}.{}", object_name, format.extension()));
        let public = public_access.unwrap_or(self.public_access);
        debug!(
            key = %key,
            original_size,
            compressed_size,
            public,
            "Uploading compressed file"
        );

        self.store
            .put_object(&key, &staged_path, format.content_type(), public)
            .await?;
        let url = self.store.object_url(&key);

        if let Some(metadata) = &self.metadata {
            let record = FileRecord::new(input_file, original_size, compressed_size, format, &key, &url);
            // Upload already succeeded; metadata failures are only logged
            if let Err(e) = metadata.record(&record).await {
                warn!(key = %key, error = %e, "Failed to record upload metadata");
            }
        }

        info!(key = %key, url = %url, original_size, compressed_size, "Upload complete");
        Ok(url)
    }

    async fn download_inner(
        &self,
        object_name: &str,
        output_file: &Path,
        folder_path: &str,
        format: &str,
    ) -> Result<()> {
        let format: CompressionFormat = format.parse()?;

        let suffix = format!(".{}", format.extension());
        let staged = tempfile::Builder::new()
            .prefix("object-storage-")
            .suffix(&suffix)
            .tempfile()?;
        let staged_path = staged.path().to_path_buf();

        // Same key as the upload; a name already carrying the extension may
        // also be the full stored key
        let mut key = object_key(folder_path, &format!("{}{}", object_name, suffix));
        let first_attempt = self.store.get_object(&key, &staged_path).await;
        let downloaded = match first_attempt {
            Err(ObjectStorageError::NotFound(_)) if object_name.ends_with(&suffix) => {
                let literal = object_key(folder_path, object_name);
                debug!(missing = %key, key = %literal, "Retrying download with the name as given");
                key = literal;
                self.store.get_object(&key, &staged_path).await?
            }
            result => result?,
        };
        debug!(key = %key, downloaded, "Decompressing downloaded object");

        let compressor = self.compressor;
        let output = output_file.to_path_buf();
        let written =
            tokio::task::spawn_blocking(move || compressor.decompress(&staged_path, &output, format))
                .await??;

        info!(key = %key, output = %output_file.display(), bytes = written, "Download complete");
        Ok(())
    }
}

/// Log failures at the facade boundary and hand the result back unchanged
fn finish<T>(ctx: &OperationContext, result: Result<T>) -> Result<T> {
    match &result {
        Ok(_) => ctx.log_completion(true),
        Err(e) => {
            error!(
                operation = ctx.operation,
                resource = %ctx.target,
                error = %e,
                "Storage operation failed"
            );
            ctx.log_completion(false);
        }
    }
    result
}
