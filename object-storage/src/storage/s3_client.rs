/// S3-compatible object storage client
///
/// Talks to DigitalOcean Spaces (or any S3-compatible service such as MinIO)
/// through the AWS SDK with explicit credentials and a custom endpoint.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use aws_config::timeout::TimeoutConfig;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::ObjectCannedAcl;
use aws_sdk_s3::Client;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info};
use url::Url;

use super::{ObjectStore, StoredObject};
use crate::error::{ObjectStorageError, Result};

const CREDENTIALS_PROVIDER: &str = "object-storage-env";

/// S3 configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3Config {
    pub endpoint: String,
    pub region: String,
    pub bucket: String,
    pub access_key_id: String,
    #[serde(skip_serializing)]
    pub secret_access_key: String,
    pub path_style: bool,
    pub operation_timeout_seconds: u64,
    pub max_file_size_mb: u64,
}

impl Default for S3Config {
    fn default() -> Self {
        Self {
            endpoint: "https://blr1.digitaloceanspaces.com".to_string(),
            region: "blr1".to_string(),
            bucket: String::new(),
            access_key_id: String::new(),
            secret_access_key: String::new(),
            path_style: false,
            operation_timeout_seconds: 300,
            max_file_size_mb: 5 * 1024,
        }
    }
}

impl S3Config {
    pub fn validate(&self) -> Result<()> {
        if self.bucket.is_empty() {
            return Err(ObjectStorageError::Config("Bucket name cannot be empty".to_string()));
        }
        if self.region.is_empty() {
            return Err(ObjectStorageError::Config("Region cannot be empty".to_string()));
        }
        if self.access_key_id.is_empty() || self.secret_access_key.is_empty() {
            return Err(ObjectStorageError::Config(
                "Access key and secret must both be set".to_string(),
            ));
        }
        let endpoint = Url::parse(&self.endpoint).map_err(|e| {
            ObjectStorageError::Config(format!("Invalid endpoint '{}': {}", self.endpoint, e))
        })?;
        if endpoint.host_str().is_none() {
            return Err(ObjectStorageError::Config(format!(
                "Endpoint '{}' has no host",
                self.endpoint
            )));
        }
        Ok(())
    }

    /// Base URL objects are publicly reachable under
    fn public_base_url(&self) -> Result<Url> {
        let mut base = Url::parse(&self.endpoint)
            .map_err(|e| ObjectStorageError::Config(format!("Invalid endpoint: {}", e)))?;

        if self.path_style {
            base.path_segments_mut()
                .map_err(|_| ObjectStorageError::Config("Endpoint cannot be a base URL".to_string()))?
                .pop_if_empty()
                .push(&self.bucket);
        } else {
            let host = base
                .host_str()
                .ok_or_else(|| ObjectStorageError::Config("Endpoint has no host".to_string()))?
                .to_string();
            base.set_host(Some(&format!("{}.{}", self.bucket, host)))
                .map_err(|e| ObjectStorageError::Config(format!("Invalid bucket host: {}", e)))?;
            base.set_path("");
        }

        Ok(base)
    }
}

/// S3 client for object storage operations
#[derive(Debug, Clone)]
pub struct S3Client {
    client: Client,
    config: S3Config,
    public_base: Url,
}

impl S3Client {
    /// Create a new S3 client
    pub async fn new(config: S3Config) -> Result<Self> {
        config.validate()?;
        info!(
            bucket = %config.bucket,
            endpoint = %config.endpoint,
            region = %config.region,
            "Initializing S3 client"
        );

        let credentials = Credentials::new(
            &config.access_key_id,
            &config.secret_access_key,
            None,
            None,
            CREDENTIALS_PROVIDER,
        );

        let shared = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .endpoint_url(config.endpoint.clone())
            .credentials_provider(credentials)
            .timeout_config(
                TimeoutConfig::builder()
                    .operation_timeout(Duration::from_secs(config.operation_timeout_seconds))
                    .build(),
            )
            .load()
            .await;

        let s3_config = aws_sdk_s3::config::Builder::from(&shared)
            .force_path_style(config.path_style)
            .build();

        Self::from_client(Client::from_conf(s3_config), config)
    }

    /// Wrap an already configured SDK client
    pub fn from_client(client: Client, config: S3Config) -> Result<Self> {
        let public_base = config.public_base_url()?;
        Ok(Self {
            client,
            config,
            public_base,
        })
    }

    pub fn config(&self) -> &S3Config {
        &self.config
    }

    fn check_size_limit(&self, key: &str, size: u64) -> Result<()> {
        let size_mb = size / (1024 * 1024);
        if size_mb > self.config.max_file_size_mb {
            return Err(ObjectStorageError::Upload(format!(
                "{}: size {} MB exceeds limit of {} MB",
                key, size_mb, self.config.max_file_size_mb
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for S3Client {
    fn bucket_name(&self) -> String {
        self.config.bucket.clone()
    }

    async fn put_object(&self, key: &str, source: &Path, content_type: &str, public: bool) -> Result<()> {
        let size = tokio::fs::metadata(source).await?.len();
        self.check_size_limit(key, size)?;
        debug!(key, size, public, "Uploading object to S3");

        let body = ByteStream::from_path(source).await.map_err(|e| {
            ObjectStorageError::Upload(format!("Failed to read {}: {}", source.display(), e))
        })?;

        let mut request = self
            .client
            .put_object()
            .bucket(&self.config.bucket)
            .key(key)
            .content_type(content_type)
            .body(body);
        if public {
            request = request.acl(ObjectCannedAcl::PublicRead);
        }

        request
            .send()
            .await
            .map_err(|e| classify_sdk_error(e, key, ObjectStorageError::Upload))?;

        info!(key, size, "Object uploaded");
        Ok(())
    }

    async fn get_object(&self, key: &str, destination: &Path) -> Result<u64> {
        debug!(key, "Downloading object from S3");

        let response = self
            .client
            .get_object()
            .bucket(&self.config.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| classify_sdk_error(e, key, ObjectStorageError::Download))?;

        let mut body = Box::pin(response.body.into_async_read());
        let mut file = tokio::fs::File::create(destination).await?;
        let written = tokio::io::copy(&mut body, &mut file)
            .await
            .map_err(|e| ObjectStorageError::Download(format!("{}: {}", key, e)))?;
        file.flush().await?;

        debug!(key, bytes = written, "Object downloaded");
        Ok(written)
    }

    async fn list_objects(&self, prefix: &str) -> Result<Vec<StoredObject>> {
        debug!(prefix, "Listing objects");

        let mut pages = self
            .client
            .list_objects_v2()
            .bucket(&self.config.bucket)
            .prefix(prefix)
            .into_paginator()
            .send();

        let mut objects = Vec::new();
        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| classify_sdk_error(e, prefix, ObjectStorageError::Storage))?;
            for object in page.contents() {
                let Some(key) = object.key() else { continue };
                objects.push(StoredObject {
                    bucket: self.config.bucket.clone(),
                    key: key.to_string(),
                    size: object.size().unwrap_or(0).max(0) as u64,
                    content_type: None,
                    public: None,
                    last_modified: object
                        .last_modified()
                        .and_then(|t| DateTime::<Utc>::from_timestamp(t.secs(), t.subsec_nanos())),
                    etag: object.e_tag().map(|tag| tag.trim_matches('"').to_string()),
                });
            }
        }

        debug!(prefix, count = objects.len(), "Objects listed");
        Ok(objects)
    }

    async fn bucket_exists(&self) -> Result<bool> {
        match self
            .client
            .head_bucket()
            .bucket(&self.config.bucket)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(err) => {
                let not_found = err
                    .as_service_error()
                    .map(|service| service.is_not_found())
                    .unwrap_or(false)
                    || err.raw_response().map(|r| r.status().as_u16()) == Some(404);
                if not_found {
                    Ok(false)
                } else {
                    Err(classify_sdk_error(err, &self.config.bucket, ObjectStorageError::Storage))
                }
            }
        }
    }

    async fn create_bucket(&self) -> Result<()> {
        if self.bucket_exists().await? {
            debug!(bucket = %self.config.bucket, "Bucket already exists");
            return Ok(());
        }

        self.client
            .create_bucket()
            .bucket(&self.config.bucket)
            .send()
            .await
            .map_err(|e| classify_sdk_error(e, &self.config.bucket, ObjectStorageError::Storage))?;

        info!(bucket = %self.config.bucket, "Bucket created");
        Ok(())
    }

    fn object_url(&self, key: &str) -> String {
        let mut url = self.public_base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend(key.split('/'));
        }
        url.to_string()
    }
}

/// Map an SDK failure onto the crate error, using `fallback` for anything
/// that is neither a missing object nor a credentials problem
fn classify_sdk_error<E>(
    err: SdkError<E>,
    resource: &str,
    fallback: fn(String) -> ObjectStorageError,
) -> ObjectStorageError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    let status = err.raw_response().map(|r| r.status().as_u16());
    let code = err.code().map(str::to_string);
    let message = format!("{}: {}", resource, DisplayErrorContext(&err));

    match (code.as_deref(), status) {
        (Some("NoSuchKey" | "NoSuchBucket" | "NotFound"), _) | (_, Some(404)) => {
            ObjectStorageError::NotFound(message)
        }
        (Some("InvalidAccessKeyId" | "SignatureDoesNotMatch" | "AccessDenied"), _)
        | (_, Some(401 | 403)) => {
            error!(resource, ?status, "S3 rejected credentials");
            ObjectStorageError::Auth(message)
        }
        _ => fallback(message),
    }
}
