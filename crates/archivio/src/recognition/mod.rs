//! Text recognition over preprocessed artifacts.
//!
//! Wraps an [`OcrEngine`] with language validation, confidence aggregation,
//! and text normalization tuned for typewritten Italian documents.

mod engine;
#[cfg(feature = "tesseract")]
mod tesseract;

pub use engine::{LayoutMode, OcrEngine, RawRecognition};
#[cfg(feature = "tesseract")]
pub use tesseract::TesseractEngine;

use crate::config::OcrConfig;
use crate::types::{ExtractionResult, PreprocessedArtifact};
use crate::{ArchivioError, Result};
use image::GrayImage;
use std::sync::Arc;

/// Glyph confusions common in typewritten-document OCR output.
const SUBSTITUTIONS: &[(char, char)] = &[('|', 'I'), ('¦', 'I'), ('ſ', 's')];

/// Runs an [`OcrEngine`] over artifacts and post-processes its output.
#[derive(Clone)]
pub struct RecognitionEngine {
    engine: Arc<dyn OcrEngine>,
    config: OcrConfig,
}

impl RecognitionEngine {
    /// Wrap an engine, validating the configured language code.
    pub fn new(engine: Arc<dyn OcrEngine>, config: OcrConfig) -> Result<Self> {
        validate_language(&config.language)?;
        Ok(Self { engine, config })
    }

    /// Recognize the text in a stored artifact.
    pub fn recognize(&self, artifact: &PreprocessedArtifact) -> Result<ExtractionResult> {
        let image = image::open(&artifact.path)
            .map_err(|e| {
                ArchivioError::recognition_with_source(
                    format!("Cannot read artifact '{}'", artifact.path.display()),
                    e,
                )
            })?
            .to_luma8();
        self.recognize_image(&image, artifact)
    }

    fn recognize_image(
        &self,
        image: &GrayImage,
        artifact: &PreprocessedArtifact,
    ) -> Result<ExtractionResult> {
        let raw = self
            .engine
            .recognize(image, &self.config.language, LayoutMode::default())?;
        let confidence = aggregate_confidence(&raw.word_confidences);
        let text = normalize_text(&raw.text);

        tracing::debug!(
            artifact = %artifact.fingerprint,
            confidence,
            words = raw.word_confidences.len(),
            "recognition complete"
        );

        Ok(ExtractionResult {
            text,
            raw_text: raw.text,
            confidence,
            word_confidences: raw.word_confidences,
            artifact_path: artifact.path.clone(),
        })
    }
}

fn validate_language(language: &str) -> Result<()> {
    if language.trim().is_empty() {
        return Err(ArchivioError::validation("OCR language cannot be empty"));
    }
    if !language
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '+')
    {
        return Err(ArchivioError::validation(format!(
            "Invalid OCR language code '{}'; expected Tesseract codes like 'ita' or 'ita+lat'",
            language
        )));
    }
    Ok(())
}

/// Mean of the non-negative word confidences on a 0.0 - 100.0 scale.
///
/// Returns 0.0 when nothing was confidently recognized; a blank page is a
/// valid extraction, not an error.
pub fn aggregate_confidence(word_confidences: &[i32]) -> f64 {
    let mut sum = 0.0;
    let mut count = 0usize;
    for &confidence in word_confidences {
        if confidence >= 0 {
            sum += confidence as f64;
            count += 1;
        }
    }
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// Substitute known glyph confusions and collapse all whitespace runs to
/// single spaces.
pub fn normalize_text(raw: &str) -> String {
    let substituted: String = raw
        .chars()
        .map(|c| {
            SUBSTITUTIONS
                .iter()
                .find(|(from, _)| *from == c)
                .map_or(c, |(_, to)| *to)
        })
        .collect();
    substituted.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheConfig;
    use image::Luma;
    use std::path::Path;

    struct FixedEngine {
        raw: RawRecognition,
    }

    impl OcrEngine for FixedEngine {
        fn recognize(
            &self,
            _image: &GrayImage,
            _language: &str,
            _layout: LayoutMode,
        ) -> Result<RawRecognition> {
            Ok(self.raw.clone())
        }
    }

    fn stored_artifact(dir: &Path) -> PreprocessedArtifact {
        let cache = crate::cache::ArtifactCache::new(&CacheConfig {
            cache_dir: Some(dir.to_path_buf()),
            retention_secs: 300,
        })
        .unwrap();
        cache
            .store(
                Path::new("/uploads/page.png"),
                &GrayImage::from_pixel(10, 10, Luma([255])),
            )
            .unwrap()
    }

    fn engine_with(raw: RawRecognition) -> RecognitionEngine {
        RecognitionEngine::new(Arc::new(FixedEngine { raw }), OcrConfig::default()).unwrap()
    }

    #[test]
    fn test_normalize_text_substitutions_and_whitespace() {
        assert_eq!(
            normalize_text("REG|A   MAR¦NA\n\n ſtoria "),
            "REGIA MARINA storia"
        );
    }

    #[test]
    fn test_normalize_text_empty() {
        assert_eq!(normalize_text(""), "");
        assert_eq!(normalize_text("  \n\t "), "");
    }

    #[test]
    fn test_aggregate_confidence_ignores_unscored_tokens() {
        assert_eq!(aggregate_confidence(&[90, -1, 80, -1]), 85.0);
    }

    #[test]
    fn test_aggregate_confidence_empty_is_zero() {
        assert_eq!(aggregate_confidence(&[]), 0.0);
        assert_eq!(aggregate_confidence(&[-1, -1]), 0.0);
    }

    #[test]
    fn test_recognize_blank_page_yields_zero_confidence() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = stored_artifact(dir.path());
        let engine = engine_with(RawRecognition::default());

        let result = engine.recognize(&artifact).unwrap();
        assert_eq!(result.text, "");
        assert_eq!(result.confidence, 0.0);
        assert!(result.word_confidences.is_empty());
    }

    #[test]
    fn test_recognize_normalizes_and_keeps_raw_text() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = stored_artifact(dir.path());
        let engine = engine_with(RawRecognition {
            text: "C|ao  mondo\n".to_string(),
            word_confidences: vec![91, 84],
        });

        let result = engine.recognize(&artifact).unwrap();
        assert_eq!(result.text, "CIao mondo");
        assert_eq!(result.raw_text, "C|ao  mondo\n");
        assert_eq!(result.confidence, 87.5);
        assert_eq!(result.artifact_path, artifact.path);
    }

    #[test]
    fn test_recognize_missing_artifact_errors() {
        let dir = tempfile::tempdir().unwrap();
        let mut artifact = stored_artifact(dir.path());
        std::fs::remove_file(&artifact.path).unwrap();
        artifact.path = dir.path().join("gone.png");

        let engine = engine_with(RawRecognition::default());
        let err = engine.recognize(&artifact).unwrap_err();
        assert!(matches!(err, ArchivioError::Recognition { .. }));
    }

    #[test]
    fn test_language_validation() {
        let engine: Arc<dyn OcrEngine> = Arc::new(FixedEngine {
            raw: RawRecognition::default(),
        });

        for language in ["ita", "eng", "ita+lat", "ita_old"] {
            let config = OcrConfig {
                language: language.to_string(),
            };
            assert!(RecognitionEngine::new(engine.clone(), config).is_ok());
        }
        for language in ["", "  ", "ITA", "ita; rm -rf /"] {
            let config = OcrConfig {
                language: language.to_string(),
            };
            assert!(RecognitionEngine::new(engine.clone(), config).is_err());
        }
    }
}
