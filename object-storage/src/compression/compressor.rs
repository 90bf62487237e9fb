/// File compressor backed by the standard codec crates
///
/// Every operation streams from file to file so large inputs are never held
/// in memory. Decompressed output is written to a sibling temp file and only
/// moved into place once the whole payload decoded cleanly.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use tracing::debug;

use super::CompressionFormat;
use crate::error::{ObjectStorageError, Result};

pub const MIN_COMPRESSION_LEVEL: u32 = 1;
pub const MAX_COMPRESSION_LEVEL: u32 = 9;
pub const DEFAULT_COMPRESSION_LEVEL: u32 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileCompressor {
    level: u32,
}

impl FileCompressor {
    /// Create a compressor; `level` must be within 1..=9 (9 compresses hardest)
    pub fn new(level: u32) -> Result<Self> {
        if !(MIN_COMPRESSION_LEVEL..=MAX_COMPRESSION_LEVEL).contains(&level) {
            return Err(ObjectStorageError::InvalidCompressionLevel(level));
        }
        Ok(Self { level })
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    /// Compress `input` into `output`, returning the compressed size in bytes
    pub fn compress(&self, input: &Path, output: &Path, format: CompressionFormat) -> Result<u64> {
        let source = open_input(input)?;
        let mut encoder = self.encoder(BufReader::new(source), format)?;

        let mut writer = BufWriter::new(File::create(output)?);
        let written = io::copy(&mut encoder, &mut writer)
            .map_err(|e| ObjectStorageError::Codec(format!("{} encoding failed: {}", format, e)))?;
        writer.flush()?;

        debug!(
            input = %input.display(),
            output = %output.display(),
            format = %format,
            compressed_bytes = written,
            "File compressed"
        );
        Ok(written)
    }

    /// Decompress `input` into `output`, returning the decompressed size in bytes.
    ///
    /// `output` is left untouched when the payload is corrupt or was written
    /// with a different format.
    pub fn decompress(&self, input: &Path, output: &Path, format: CompressionFormat) -> Result<u64> {
        let source = open_input(input)?;
        let mut decoder = decoder(BufReader::new(source), format)?;

        let parent = match output.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        let mut staged = tempfile::NamedTempFile::new_in(parent)?;

        let written = {
            let mut writer = BufWriter::new(staged.as_file_mut());
            let written = io::copy(&mut decoder, &mut writer).map_err(|e| {
                ObjectStorageError::Codec(format!("{} decoding failed: {}", format, e))
            })?;
            writer.flush()?;
            written
        };

        staged
            .persist(output)
            .map_err(|e| ObjectStorageError::Io(e.error))?;

        debug!(
            input = %input.display(),
            output = %output.display(),
            format = %format,
            decompressed_bytes = written,
            "File decompressed"
        );
        Ok(written)
    }

    pub fn compress_bytes(&self, data: &[u8], format: CompressionFormat) -> Result<Vec<u8>> {
        let mut encoder = self.encoder(data, format)?;
        let mut compressed = Vec::new();
        encoder
            .read_to_end(&mut compressed)
            .map_err(|e| ObjectStorageError::Codec(format!("{} encoding failed: {}", format, e)))?;
        Ok(compressed)
    }

    pub fn decompress_bytes(&self, data: &[u8], format: CompressionFormat) -> Result<Vec<u8>> {
        let mut decoder = decoder(data, format)?;
        let mut decompressed = Vec::new();
        decoder
            .read_to_end(&mut decompressed)
            .map_err(|e| ObjectStorageError::Codec(format!("{} decoding failed: {}", format, e)))?;
        Ok(decompressed)
    }

    /// Original size divided by compressed size
    pub fn compression_ratio(&self, original: &Path, compressed: &Path) -> Result<f64> {
        let original_size = fs::metadata(original)?.len();
        let compressed_size = fs::metadata(compressed)?.len();
        if compressed_size == 0 {
            return Err(ObjectStorageError::Codec(format!(
                "Compressed file {} is empty",
                compressed.display()
            )));
        }
        Ok(original_size as f64 / compressed_size as f64)
    }

    fn encoder<'a, R: Read + 'a>(
        &self,
        reader: R,
        format: CompressionFormat,
    ) -> Result<Box<dyn Read + 'a>> {
        let level = self.level;
        let encoder: Box<dyn Read + 'a> = match format {
            CompressionFormat::Zstd => Box::new(
                zstd::stream::read::Encoder::new(reader, level as i32)
                    .map_err(|e| ObjectStorageError::Codec(format!("zstd init failed: {}", e)))?,
            ),
            CompressionFormat::Gzip => Box::new(flate2::read::GzEncoder::new(
                reader,
                flate2::Compression::new(level),
            )),
            CompressionFormat::Bzip2 => Box::new(bzip2::read::BzEncoder::new(
                reader,
                bzip2::Compression::new(level),
            )),
            // Both names produce an .xz container
            CompressionFormat::Xz | CompressionFormat::Lzma => {
                Box::new(xz2::read::XzEncoder::new(reader, level))
            }
            CompressionFormat::Zlib => Box::new(flate2::read::ZlibEncoder::new(
                reader,
                flate2::Compression::new(level),
            )),
        };
        Ok(encoder)
    }
}

impl Default for FileCompressor {
    fn default() -> Self {
        Self {
            level: DEFAULT_COMPRESSION_LEVEL,
        }
    }
}

fn decoder<'a, R: Read + 'a>(reader: R, format: CompressionFormat) -> Result<Box<dyn Read + 'a>> {
    let decoder: Box<dyn Read + 'a> = match format {
        CompressionFormat::Zstd => Box::new(
            zstd::stream::read::Decoder::new(reader)
                .map_err(|e| ObjectStorageError::Codec(format!("zstd init failed: {}", e)))?,
        ),
        CompressionFormat::Gzip => Box::new(flate2::read::MultiGzDecoder::new(reader)),
        CompressionFormat::Bzip2 => Box::new(bzip2::read::MultiBzDecoder::new(reader)),
        CompressionFormat::Xz | CompressionFormat::Lzma => {
            Box::new(xz2::read::XzDecoder::new_multi_decoder(reader))
        }
        CompressionFormat::Zlib => Box::new(flate2::read::ZlibDecoder::new(reader)),
    };
    Ok(decoder)
}

fn open_input(path: &Path) -> Result<File> {
    File::open(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => ObjectStorageError::InputNotFound(path.to_path_buf()),
        _ => ObjectStorageError::Io(e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_text() -> Vec<u8> {
        "The quick brown fox jumps over the lazy dog. "
            .repeat(200)
            .into_bytes()
    }

    #[test]
    fn test_level_bounds() {
        assert!(FileCompressor::new(1).is_ok());
        assert!(FileCompressor::new(9).is_ok());
        assert!(matches!(
            FileCompressor::new(0),
            Err(ObjectStorageError::InvalidCompressionLevel(0))
        ));
        assert!(matches!(
            FileCompressor::new(10),
            Err(ObjectStorageError::InvalidCompressionLevel(10))
        ));
        assert_eq!(FileCompressor::default().level(), 6);
    }

    #[test]
    fn test_bytes_roundtrip_all_formats() {
        let compressor = FileCompressor::default();
        let data = sample_text();

        for format in CompressionFormat::ALL {
            let compressed = compressor.compress_bytes(&data, format).unwrap();
            assert!(compressed.len() < data.len(), "{} did not shrink input", format);
            let restored = compressor.decompress_bytes(&compressed, format).unwrap();
            assert_eq!(restored, data);
        }
    }

    #[test]
    fn test_file_roundtrip_and_ratio() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("input.txt");
        let packed = dir.path().join("input.txt.gz");
        let restored = dir.path().join("restored.txt");
        fs::write(&input, sample_text()).unwrap();

        let compressor = FileCompressor::new(9).unwrap();
        let compressed_size = compressor
            .compress(&input, &packed, CompressionFormat::Gzip)
            .unwrap();
        assert_eq!(compressed_size, fs::metadata(&packed).unwrap().len());

        let restored_size = compressor
            .decompress(&packed, &restored, CompressionFormat::Gzip)
            .unwrap();
        assert_eq!(restored_size, sample_text().len() as u64);
        assert_eq!(fs::read(&restored).unwrap(), sample_text());

        let ratio = compressor.compression_ratio(&input, &packed).unwrap();
        assert!(ratio > 1.0);
    }

    #[test]
    fn test_missing_input() {
        let dir = tempfile::tempdir().unwrap();
        let compressor = FileCompressor::default();
        let result = compressor.compress(
            &dir.path().join("nope.txt"),
            &dir.path().join("nope.txt.zstd"),
            CompressionFormat::Zstd,
        );
        assert!(matches!(result, Err(ObjectStorageError::InputNotFound(_))));
    }

    #[test]
    fn test_mismatched_format_leaves_output_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let packed = dir.path().join("data.bz2");
        let output = dir.path().join("data.txt");

        let compressor = FileCompressor::default();
        fs::write(&packed, compressor.compress_bytes(&sample_text(), CompressionFormat::Bzip2).unwrap())
            .unwrap();

        let result = compressor.decompress(&packed, &output, CompressionFormat::Zstd);
        assert!(matches!(result, Err(ObjectStorageError::Codec(_))));
        assert!(!output.exists());
    }

    #[test]
    fn test_xz_and_lzma_share_container() {
        let compressor = FileCompressor::default();
        let data = sample_text();
        let packed = compressor.compress_bytes(&data, CompressionFormat::Lzma).unwrap();
        let restored = compressor.decompress_bytes(&packed, CompressionFormat::Xz).unwrap();
        assert_eq!(restored, data);
    }

    #[test]
    fn test_empty_compressed_file_ratio() {
        let dir = tempfile::tempdir().unwrap();
        let original = dir.path().join("a.txt");
        let empty = dir.path().join("a.txt.zstd");
        fs::write(&original, b"abc").unwrap();
        fs::write(&empty, b"").unwrap();

        let result = FileCompressor::default().compression_ratio(&original, &empty);
        assert!(matches!(result, Err(ObjectStorageError::Codec(_))));
    }
}
