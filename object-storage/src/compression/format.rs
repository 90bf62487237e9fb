use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ObjectStorageError;

/// Compression formats supported for stored objects.
///
/// The format name doubles as the object key extension, so a file uploaded
/// as `report.json` with [`CompressionFormat::Zstd`] is stored under
/// `report.json.zstd`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionFormat {
    Zstd,
    #[serde(rename = "gz")]
    Gzip,
    #[serde(rename = "bz2")]
    Bzip2,
    Xz,
    Lzma,
    Zlib,
}

impl CompressionFormat {
    pub const ALL: [CompressionFormat; 6] = [
        CompressionFormat::Zstd,
        CompressionFormat::Gzip,
        CompressionFormat::Bzip2,
        CompressionFormat::Xz,
        CompressionFormat::Lzma,
        CompressionFormat::Zlib,
    ];

    pub fn extension(&self) -> &'static str {
        match self {
            CompressionFormat::Zstd => "zstd",
            CompressionFormat::Gzip => "gz",
            CompressionFormat::Bzip2 => "bz2",
            CompressionFormat::Xz => "xz",
            CompressionFormat::Lzma => "lzma",
            CompressionFormat::Zlib => "zlib",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            CompressionFormat::Zstd => "application/zstd",
            CompressionFormat::Gzip => "application/gzip",
            CompressionFormat::Bzip2 => "application/x-bzip2",
            CompressionFormat::Xz | CompressionFormat::Lzma => "application/x-xz",
            CompressionFormat::Zlib => "application/octet-stream",
        }
    }

    /// Comma separated list of accepted names, used in error messages
    pub fn supported_names() -> String {
        Self::ALL
            .iter()
            .map(|f| f.extension())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl Default for CompressionFormat {
    fn default() -> Self {
        CompressionFormat::Zstd
    }
}

impl fmt::Display for CompressionFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for CompressionFormat {
    type Err = ObjectStorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().trim_start_matches('.').to_ascii_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|format| format.extension() == name)
            .ok_or_else(|| {
                ObjectStorageError::Codec(format!(
                    "Unsupported format '{}'. Choose from: {}",
                    s,
                    Self::supported_names()
                ))
            })
    }
}
