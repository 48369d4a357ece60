//! Error types for archivio.
//!
//! All fallible operations return [`Result`]. The error taxonomy follows the
//! failure modes of the processing pipeline:
//!
//! - `Io` - File system errors; always bubble up unchanged via `?`
//! - `ImageRead` - The source image cannot be read or decoded
//! - `Recognition` - The OCR engine failed
//! - `SourceMissing` - The source file vanished between upload and processing
//! - `Cache` - Artifact cache store failures (eviction never errors; per-file
//!   eviction failures are logged and skipped)
//! - `Validation` - Invalid configuration or parameters
//! - `Processing` - Lifecycle failures that are none of the above (for
//!   example an aborted worker)
//!
//! Preprocessing and recognition failures abort the current `process`
//! invocation and drive the document to `Error` with the cause attached.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using [`ArchivioError`].
pub type Result<T> = std::result::Result<T, ArchivioError>;

/// Main error type for all archivio operations.
#[derive(Debug, Error)]
pub enum ArchivioError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image read error: {message}")]
    ImageRead {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Recognition error: {message}")]
    Recognition {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Source image missing: {}", path.display())]
    SourceMissing { path: PathBuf },

    #[error("Cache error: {message}")]
    Cache {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Processing error: {message}")]
    Processing { message: String },
}

impl ArchivioError {
    /// Create an ImageRead error.
    pub fn image_read<S: Into<String>>(message: S) -> Self {
        Self::ImageRead {
            message: message.into(),
            source: None,
        }
    }

    /// Create an ImageRead error with source.
    pub fn image_read_with_source<S, E>(message: S, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::ImageRead {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a Recognition error.
    pub fn recognition<S: Into<String>>(message: S) -> Self {
        Self::Recognition {
            message: message.into(),
            source: None,
        }
    }

    /// Create a Recognition error with source.
    pub fn recognition_with_source<S, E>(message: S, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Recognition {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a Cache error.
    pub fn cache<S: Into<String>>(message: S) -> Self {
        Self::Cache {
            message: message.into(),
            source: None,
        }
    }

    /// Create a Cache error with source.
    pub fn cache_with_source<S, E>(message: S, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Cache {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a Validation error.
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a Processing error.
    pub fn processing<S: Into<String>>(message: S) -> Self {
        Self::Processing {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_bubbles_unchanged() {
        fn read_file() -> Result<String> {
            let content = std::fs::read_to_string("/nonexistent/file.txt")?;
            Ok(content)
        }

        let result = read_file();
        assert!(matches!(result.unwrap_err(), ArchivioError::Io(_)));
    }

    #[test]
    fn test_image_read_error() {
        let err = ArchivioError::image_read("corrupt header");
        assert_eq!(err.to_string(), "Image read error: corrupt header");
    }

    #[test]
    fn test_image_read_error_with_source() {
        let source = std::io::Error::new(std::io::ErrorKind::InvalidData, "bad data");
        let err = ArchivioError::image_read_with_source("corrupt header", source);
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_recognition_error() {
        let err = ArchivioError::recognition("engine init failed");
        assert_eq!(err.to_string(), "Recognition error: engine init failed");
    }

    #[test]
    fn test_source_missing_error() {
        let err = ArchivioError::SourceMissing {
            path: PathBuf::from("/uploads/page_01.png"),
        };
        assert_eq!(err.to_string(), "Source image missing: /uploads/page_01.png");
    }

    #[test]
    fn test_cache_error_with_source() {
        let source = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "cannot write");
        let err = ArchivioError::cache_with_source("cache write failed", source);
        assert_eq!(err.to_string(), "Cache error: cache write failed");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_validation_error() {
        let err = ArchivioError::validation("empty language code");
        assert_eq!(err.to_string(), "Validation error: empty language code");
    }
}
