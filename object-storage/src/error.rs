//! Error types for compression and object storage operations

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ObjectStorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Input file not found: {}", .0.display())]
    InputNotFound(PathBuf),

    #[error("Codec error: {0}")]
    Codec(String),

    #[error("Compression level must be between 1 and 9, got {0}")]
    InvalidCompressionLevel(u32),

    #[error("Upload error: {0}")]
    Upload(String),

    #[error("Download error: {0}")]
    Download(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Metadata error: {0}")]
    Metadata(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for ObjectStorageError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ObjectStorageError::NotFound("Record not found".to_string()),
            _ => ObjectStorageError::Metadata(err.to_string()),
        }
    }
}

impl From<tokio::task::JoinError> for ObjectStorageError {
    fn from(err: tokio::task::JoinError) -> Self {
        ObjectStorageError::Internal(format!("Background task failed: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, ObjectStorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        let err: ObjectStorageError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, ObjectStorageError::NotFound(_)));
    }

    #[test]
    fn test_display_messages() {
        let err = ObjectStorageError::InputNotFound(PathBuf::from("/tmp/missing.txt"));
        assert_eq!(err.to_string(), "Input file not found: /tmp/missing.txt");

        let err = ObjectStorageError::InvalidCompressionLevel(0);
        assert_eq!(err.to_string(), "Compression level must be between 1 and 9, got 0");
    }
}
