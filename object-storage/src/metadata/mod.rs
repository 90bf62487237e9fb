/// Upload metadata persistence
///
/// Records one row per successful upload in SQLite:
/// - Connection pool management
/// - Idempotent schema migrations
/// - Lookup by object key and recent-uploads listing

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::{debug, info};
use uuid::Uuid;

use crate::compression::CompressionFormat;
use crate::error::{ObjectStorageError, Result};

/// Metadata database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_seconds: u64,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://object_storage.db".to_string(),
            max_connections: 5,
            acquire_timeout_seconds: 10,
        }
    }
}

impl MetadataConfig {
    pub fn in_memory() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            ..Default::default()
        }
    }

    fn is_in_memory(&self) -> bool {
        self.url.contains(":memory:")
    }
}

/// One uploaded file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct FileRecord {
    pub id: Uuid,
    pub file_name: String,
    pub file_type: String,
    pub original_file_size: i64,
    pub compressed_file_size: i64,
    pub compression_type: String,
    pub object_key: String,
    pub file_url: String,
    pub created_at: DateTime<Utc>,
}

impl FileRecord {
    pub fn new(
        input_file: &Path,
        original_size: u64,
        compressed_size: u64,
        format: CompressionFormat,
        object_key: &str,
        file_url: &str,
    ) -> Self {
        let file_name = input_file
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let file_type = input_file
            .extension()
            .map(|ext| ext.to_string_lossy().into_owned())
            .unwrap_or_default();

        Self {
            id: Uuid::new_v4(),
            file_name,
            file_type,
            original_file_size: original_size as i64,
            compressed_file_size: compressed_size as i64,
            compression_type: format.extension().to_string(),
            object_key: object_key.to_string(),
            file_url: file_url.to_string(),
            created_at: Utc::now(),
        }
    }

    pub fn compression_ratio(&self) -> Option<f64> {
        if self.compressed_file_size > 0 {
            Some(self.original_file_size as f64 / self.compressed_file_size as f64)
        } else {
            None
        }
    }
}

/// SQLite-backed store of upload records
#[derive(Debug, Clone)]
pub struct MetadataStore {
    pool: SqlitePool,
}

impl MetadataStore {
    /// Open (creating if missing) the database and run migrations
    pub async fn connect(config: &MetadataConfig) -> Result<Self> {
        info!(url = %config.url, "Connecting to metadata database");

        let options = SqliteConnectOptions::from_str(&config.url)
            .map_err(|e| ObjectStorageError::Config(format!("Invalid metadata URL: {}", e)))?
            .create_if_missing(true);

        let mut pool_options = SqlitePoolOptions::new()
            .max_connections(config.max_connections.max(1))
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_seconds));

        // Every connection to :memory: is a separate database
        if config.is_in_memory() {
            pool_options = pool_options
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }

        let pool = pool_options.connect_with(options).await?;
        Self::run_migrations(&pool).await?;

        info!("Metadata database ready");
        Ok(Self { pool })
    }

    async fn run_migrations(pool: &SqlitePool) -> Result<()> {
        debug!("Running metadata migrations");

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS uploaded_files (
                id BLOB PRIMARY KEY,
                file_name TEXT NOT NULL,
                file_type TEXT NOT NULL,
                original_file_size INTEGER NOT NULL,
                compressed_file_size INTEGER NOT NULL,
                compression_type TEXT NOT NULL,
                object_key TEXT NOT NULL,
                file_url TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_uploaded_files_object_key ON uploaded_files (object_key)",
        )
        .execute(pool)
        .await?;

        Ok(())
    }

    pub async fn record(&self, record: &FileRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO uploaded_files (
                id, file_name, file_type, original_file_size, compressed_file_size,
                compression_type, object_key, file_url, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.id)
        .bind(&record.file_name)
        .bind(&record.file_type)
        .bind(record.original_file_size)
        .bind(record.compressed_file_size)
        .bind(&record.compression_type)
        .bind(&record.object_key)
        .bind(&record.file_url)
        .bind(record.created_at)
        .execute(&self.pool)
        .await?;

        debug!(key = %record.object_key, id = %record.id, "Upload recorded");
        Ok(())
    }

    /// Most recent record for `object_key`
    pub async fn find_by_key(&self, object_key: &str) -> Result<Option<FileRecord>> {
        let record = sqlx::query_as::<_, FileRecord>(
            "SELECT * FROM uploaded_files WHERE object_key = ? ORDER BY created_at DESC LIMIT 1",
        )
        .bind(object_key)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }

    pub async fn list_recent(&self, limit: u32) -> Result<Vec<FileRecord>> {
        let records = sqlx::query_as::<_, FileRecord>(
            "SELECT * FROM uploaded_files ORDER BY created_at DESC LIMIT ?",
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }

    pub async fn count(&self) -> Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM uploaded_files")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.0)
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
