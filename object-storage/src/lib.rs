//! Compress local files and store them in S3-compatible object storage
//! (DigitalOcean Spaces), and the reverse: download and decompress.
//!
//! ```no_run
//! use std::path::Path;
//! use object_storage::{Config, ObjectStorage};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = Config::from_env()?;
//! config.validate()?;
//! let storage = ObjectStorage::from_config(&config).await?;
//!
//! let url = storage
//!     .compress_and_upload(Path::new("report.json"), "report.json", "reports", "zstd", None)
//!     .await?;
//! println!("stored at {url}");
//!
//! storage
//!     .download_and_decompress("report.json", Path::new("restored.json"), "reports", "zstd")
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod compression;
pub mod config;
pub mod error;
pub mod metadata;
pub mod services;
pub mod storage;

pub use compression::{CompressionFormat, FileCompressor};
pub use config::Config;
pub use error::{ObjectStorageError, Result};
pub use metadata::{FileRecord, MetadataConfig, MetadataStore};
pub use services::ObjectStorage;
pub use storage::{MemoryStore, ObjectStore, S3Client, S3Config, StoredObject};
