//! Configuration loading and management.
//!
//! All tunables of the pipeline live here and are constructor-supplied to the
//! components that use them; there is no process-wide mutable state. Configs
//! can be created programmatically or loaded from a TOML file.
//!
//! # Example
//!
//! ```rust
//! use archivio::config::CoreConfig;
//!
//! let config = CoreConfig::default();
//! assert_eq!(config.ocr.language, "ita");
//! ```

use crate::{ArchivioError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration for the processing core.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoreConfig {
    /// OCR engine configuration
    #[serde(default)]
    pub ocr: OcrConfig,

    /// Image enhancement pipeline constants
    #[serde(default)]
    pub preprocess: PreprocessConfig,

    /// Artifact cache configuration
    #[serde(default)]
    pub cache: CacheConfig,
}

impl CoreConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| ArchivioError::validation(format!("Invalid TOML config: {}", e)))
    }
}

/// OCR engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrConfig {
    /// Tesseract language model to restrict recognition to
    #[serde(default = "default_language")]
    pub language: String,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            language: default_language(),
        }
    }
}

/// Image enhancement constants, applied in the fixed stage order of
/// [`crate::preprocess::Preprocessor`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreprocessConfig {
    /// Denoise filter strength; higher removes more grain at the cost of detail
    #[serde(default = "default_denoise_strength")]
    pub denoise_strength: f32,

    /// CLAHE contrast clip limit
    #[serde(default = "default_clahe_clip_limit")]
    pub clahe_clip_limit: f32,

    /// CLAHE tile grid size (grid is N x N)
    #[serde(default = "default_clahe_tile_grid")]
    pub clahe_tile_grid: u32,

    /// Adaptive binarization neighborhood size (odd)
    #[serde(default = "default_binarize_block_size")]
    pub binarize_block_size: u32,

    /// Adaptive binarization offset subtracted from the neighborhood mean
    #[serde(default = "default_binarize_offset")]
    pub binarize_offset: i16,

    /// Minimum page height; shorter images are upscaled to this
    #[serde(default = "default_min_height")]
    pub min_height: u32,

    /// Skew estimates at or below this magnitude (degrees) are not corrected
    #[serde(default = "default_deskew_threshold")]
    pub deskew_threshold_degrees: f32,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            denoise_strength: default_denoise_strength(),
            clahe_clip_limit: default_clahe_clip_limit(),
            clahe_tile_grid: default_clahe_tile_grid(),
            binarize_block_size: default_binarize_block_size(),
            binarize_offset: default_binarize_offset(),
            min_height: default_min_height(),
            deskew_threshold_degrees: default_deskew_threshold(),
        }
    }
}

impl PreprocessConfig {
    pub fn validate(&self) -> Result<()> {
        if self.binarize_block_size % 2 == 0 || self.binarize_block_size < 3 {
            return Err(ArchivioError::validation(format!(
                "binarize_block_size must be odd and >= 3, got {}",
                self.binarize_block_size
            )));
        }
        if self.clahe_tile_grid == 0 {
            return Err(ArchivioError::validation("clahe_tile_grid must be non-zero"));
        }
        if self.denoise_strength <= 0.0 {
            return Err(ArchivioError::validation(format!(
                "denoise_strength must be positive, got {}",
                self.denoise_strength
            )));
        }
        Ok(())
    }
}

/// Artifact cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Directory for preprocessed artifacts; None uses `.archivio/artifacts`
    /// under the current directory
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,

    /// Age in seconds below which `evict(keep_recent = true)` spares an
    /// artifact; protects artifacts still being read by in-flight extractions
    #[serde(default = "default_retention_secs")]
    pub retention_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            retention_secs: default_retention_secs(),
        }
    }
}

fn default_language() -> String {
    "ita".to_string()
}

fn default_denoise_strength() -> f32 {
    15.0
}

fn default_clahe_clip_limit() -> f32 {
    2.0
}

fn default_clahe_tile_grid() -> u32 {
    8
}

fn default_binarize_block_size() -> u32 {
    31
}

fn default_binarize_offset() -> i16 {
    15
}

fn default_min_height() -> u32 {
    1000
}

fn default_deskew_threshold() -> f32 {
    0.5
}

fn default_retention_secs() -> u64 {
    300
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CoreConfig::default();
        assert_eq!(config.ocr.language, "ita");
        assert_eq!(config.preprocess.denoise_strength, 15.0);
        assert_eq!(config.preprocess.clahe_clip_limit, 2.0);
        assert_eq!(config.preprocess.clahe_tile_grid, 8);
        assert_eq!(config.preprocess.binarize_block_size, 31);
        assert_eq!(config.preprocess.binarize_offset, 15);
        assert_eq!(config.preprocess.min_height, 1000);
        assert_eq!(config.preprocess.deskew_threshold_degrees, 0.5);
        assert_eq!(config.cache.retention_secs, 300);
        assert!(config.cache.cache_dir.is_none());
    }

    #[test]
    fn test_from_toml_str() {
        let toml = r#"
            [ocr]
            language = "eng"

            [preprocess]
            min_height = 1200

            [cache]
            retention_secs = 60
        "#;

        let config = CoreConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.ocr.language, "eng");
        assert_eq!(config.preprocess.min_height, 1200);
        // Unspecified fields keep their defaults
        assert_eq!(config.preprocess.binarize_block_size, 31);
        assert_eq!(config.cache.retention_secs, 60);
    }

    #[test]
    fn test_from_toml_str_invalid() {
        let result = CoreConfig::from_toml_str("not [valid toml");
        assert!(matches!(result.unwrap_err(), ArchivioError::Validation { .. }));
    }

    #[test]
    fn test_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("archivio.toml");
        std::fs::write(&path, "[ocr]\nlanguage = \"lat\"\n").unwrap();

        let config = CoreConfig::from_toml_file(&path).unwrap();
        assert_eq!(config.ocr.language, "lat");
    }

    #[test]
    fn test_preprocess_validate_even_block_size() {
        let config = PreprocessConfig {
            binarize_block_size: 30,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_preprocess_validate_zero_tile_grid() {
        let config = PreprocessConfig {
            clahe_tile_grid: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_preprocess_validate_defaults_ok() {
        assert!(PreprocessConfig::default().validate().is_ok());
    }
}
