/// Configuration module for object storage
///
/// Settings come from environment variables (a `.env` file is loaded when
/// present) with defaults for everything except credentials and bucket.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use shared::observability::{LogConfig, LogFormat, LogLevel};

use crate::compression::{CompressionFormat, FileCompressor, DEFAULT_COMPRESSION_LEVEL};
use crate::metadata::MetadataConfig;
use crate::storage::S3Config;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub storage: S3Config,
    pub compression: CompressionConfig,
    pub metadata: Option<MetadataConfig>,
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if present
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            storage: storage_from_lookup(&lookup)?,
            compression: CompressionConfig::from_lookup(&lookup)?,
            metadata: MetadataConfig::from_lookup(&lookup)?,
            logging: LoggingConfig::from_lookup(&lookup)?,
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.storage.validate()?;
        self.compression.validate()?;
        if let Some(metadata) = &self.metadata {
            if metadata.url.is_empty() {
                anyhow::bail!("Metadata database URL cannot be empty");
            }
        }
        Ok(())
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(value) if !value.trim().is_empty() => value
            .trim()
            .parse()
            .with_context(|| format!("Invalid {}", key)),
        _ => Ok(default),
    }
}

fn storage_from_lookup<F>(lookup: &F) -> Result<S3Config>
where
    F: Fn(&str) -> Option<String>,
{
    let defaults = S3Config::default();
    Ok(S3Config {
        endpoint: lookup("DO_SPACES_ENDPOINT").unwrap_or(defaults.endpoint),
        region: lookup("DO_SPACES_REGION").unwrap_or(defaults.region),
        bucket: lookup("DO_SPACES_BUCKET").unwrap_or(defaults.bucket),
        access_key_id: lookup("DO_SPACES_KEY").unwrap_or_default(),
        secret_access_key: lookup("DO_SPACES_SECRET").unwrap_or_default(),
        path_style: parse_or(lookup, "DO_SPACES_FORCE_PATH_STYLE", defaults.path_style)?,
        operation_timeout_seconds: parse_or(
            lookup,
            "DO_SPACES_OPERATION_TIMEOUT",
            defaults.operation_timeout_seconds,
        )?,
        max_file_size_mb: parse_or(lookup, "DO_SPACES_MAX_FILE_SIZE_MB", defaults.max_file_size_mb)?,
    })
}

/// Compression and upload defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompressionConfig {
    pub level: u32,
    pub default_format: CompressionFormat,
    pub public_access: bool,
}

impl CompressionConfig {
    fn from_lookup<F>(lookup: &F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let default_format = match lookup("COMPRESSION_FORMAT") {
            Some(name) if !name.trim().is_empty() => name
                .parse()
                .context("Invalid COMPRESSION_FORMAT")?,
            _ => CompressionFormat::default(),
        };

        Ok(Self {
            level: parse_or(lookup, "COMPRESSION_LEVEL", DEFAULT_COMPRESSION_LEVEL)?,
            default_format,
            public_access: parse_or(lookup, "DO_SPACES_PUBLIC_ACCESS", false)?,
        })
    }

    pub fn validate(&self) -> Result<()> {
        FileCompressor::new(self.level)?;
        Ok(())
    }
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_COMPRESSION_LEVEL,
            default_format: CompressionFormat::default(),
            public_access: false,
        }
    }
}

impl MetadataConfig {
    /// `None` when `METADATA_DATABASE_URL` is unset
    fn from_lookup<F>(lookup: &F) -> Result<Option<Self>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let Some(url) = lookup("METADATA_DATABASE_URL").filter(|url| !url.trim().is_empty()) else {
            return Ok(None);
        };
        let defaults = MetadataConfig::default();
        Ok(Some(MetadataConfig {
            url,
            max_connections: parse_or(lookup, "METADATA_MAX_CONNECTIONS", defaults.max_connections)?,
            acquire_timeout_seconds: parse_or(
                lookup,
                "METADATA_ACQUIRE_TIMEOUT",
                defaults.acquire_timeout_seconds,
            )?,
        }))
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl LoggingConfig {
    fn from_lookup<F>(lookup: &F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = Self {
            level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            format: lookup("LOG_FORMAT").unwrap_or_else(|| "compact".to_string()),
        };
        config.to_log_config()?;
        Ok(config)
    }

    pub fn to_log_config(&self) -> Result<LogConfig> {
        Ok(LogConfig {
            level: self.level.parse::<LogLevel>()?,
            format: self.format.parse::<LogFormat>()?,
            ..Default::default()
        })
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "compact".to_string(),
        }
    }
}
