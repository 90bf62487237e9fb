//! object-storage CLI
//!
//! Compresses files and uploads them to DigitalOcean Spaces, lists stored
//! objects, and downloads + decompresses them again. Connection settings come
//! from the environment (see `Config::from_env`).

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use futures::stream::{self, StreamExt};
use tracing::{error, info};

use object_storage::{Config, ObjectStorage};
use shared::observability::init_logging;

#[derive(Parser)]
#[command(name = "object-storage")]
#[command(about = "Compress files and store them in S3-compatible object storage")]
#[command(version)]
struct Cli {
    /// Bucket name (overrides DO_SPACES_BUCKET)
    #[arg(short, long, global = true)]
    bucket: Option<String>,

    /// Compression level 1-9 (overrides COMPRESSION_LEVEL)
    #[arg(short, long, global = true)]
    level: Option<u32>,

    /// Log format: pretty, json or compact (overrides LOG_FORMAT)
    #[arg(long, global = true)]
    log_format: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compress and upload one or more files
    Upload {
        /// Files to upload
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Object name (single file only; defaults to the file name)
        #[arg(short, long)]
        name: Option<String>,
        /// Folder path inside the bucket
        #[arg(short, long, default_value = "")]
        folder: String,
        /// Compression format: zstd, gz, bz2, xz, lzma or zlib
        #[arg(long)]
        format: Option<String>,
        /// Make the uploaded objects publicly readable
        #[arg(long, conflicts_with = "private")]
        public: bool,
        /// Keep the uploaded objects private
        #[arg(long)]
        private: bool,
        /// Maximum concurrent uploads
        #[arg(short, long, default_value_t = 8)]
        concurrency: usize,
    },

    /// Download and decompress an object
    Download {
        /// Object name (format extension optional)
        object_name: String,
        /// Where to write the decompressed file
        output: PathBuf,
        /// Folder path inside the bucket
        #[arg(short, long, default_value = "")]
        folder: String,
        /// Compression format the object was stored with
        #[arg(long)]
        format: Option<String>,
    },

    /// List objects under a prefix
    List {
        /// Folder prefix
        #[arg(short, long, default_value = "")]
        prefix: String,
        /// Print JSON instead of one key per line
        #[arg(long)]
        json: bool,
    },

    /// Print the URL of an object key
    Url {
        key: String,
    },

    /// Create the bucket if it does not exist
    CreateBucket,

    /// Show recently recorded uploads (requires METADATA_DATABASE_URL)
    Records {
        #[arg(short, long, default_value_t = 20)]
        limit: u32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::from_env().context("Failed to load configuration")?;
    if let Some(bucket) = cli.bucket {
        config.storage.bucket = bucket;
    }
    if let Some(level) = cli.level {
        config.compression.level = level;
    }
    if let Some(format) = cli.log_format {
        config.logging.format = format;
    }

    init_logging(config.logging.to_log_config()?)?;
    config.validate().context("Invalid configuration")?;

    let storage = ObjectStorage::from_config(&config).await?;
    let default_format = config.compression.default_format.to_string();

    match cli.command {
        Commands::Upload {
            files,
            name,
            folder,
            format,
            public,
            private,
            concurrency,
        } => {
            if name.is_some() && files.len() > 1 {
                anyhow::bail!("--name can only be used with a single file");
            }
            let format = format.unwrap_or(default_format);
            let public_access = match (public, private) {
                (true, _) => Some(true),
                (_, true) => Some(false),
                _ => None,
            };

            let started = Instant::now();
            let total = files.len();
            let results: Vec<_> = stream::iter(files)
                .map(|file| {
                    let storage = &storage;
                    let folder = &folder;
                    let format = &format;
                    let object_name = name.clone().unwrap_or_else(|| {
                        file.file_name()
                            .map(|n| n.to_string_lossy().into_owned())
                            .unwrap_or_default()
                    });
                    async move {
                        let result = storage
                            .compress_and_upload(&file, &object_name, folder, format, public_access)
                            .await;
                        (file, result)
                    }
                })
                .buffer_unordered(concurrency.max(1))
                .collect()
                .await;

            let mut failed = 0;
            for (file, result) in results {
                match result {
                    Ok(url) => println!("{}", url),
                    Err(e) => {
                        failed += 1;
                        error!(file = %file.display(), error = %e, "Upload failed");
                    }
                }
            }
            info!(
                total,
                failed,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Upload finished"
            );
            if failed > 0 {
                anyhow::bail!("{} of {} uploads failed", failed, total);
            }
        }

        Commands::Download {
            object_name,
            output,
            folder,
            format,
        } => {
            let format = format.unwrap_or(default_format);
            storage
                .download_and_decompress(&object_name, &output, &folder, &format)
                .await?;
            println!("{}", output.display());
        }

        Commands::List { prefix, json } => {
            let objects = storage.list_objects(&prefix).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&objects)?);
            } else {
                for object in objects {
                    println!("{}\t{}", object.size, object.key);
                }
            }
        }

        Commands::Url { key } => {
            println!("{}", storage.object_url(&key));
        }

        Commands::CreateBucket => {
            storage.create_bucket().await?;
            println!("{}", config.storage.bucket);
        }

        Commands::Records { limit } => {
            let metadata = storage
                .metadata()
                .context("METADATA_DATABASE_URL is not configured")?;
            let records = metadata.list_recent(limit).await?;
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
    }

    Ok(())
}
