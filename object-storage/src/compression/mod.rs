//! Compression codecs for stored objects
//!
//! Wraps zstd, gzip, bzip2, xz/lzma and zlib behind a single
//! [`FileCompressor`] selected by [`CompressionFormat`].

pub mod compressor;
pub mod format;

pub use compressor::{
    FileCompressor, DEFAULT_COMPRESSION_LEVEL, MAX_COMPRESSION_LEVEL, MIN_COMPRESSION_LEVEL,
};
pub use format::CompressionFormat;
