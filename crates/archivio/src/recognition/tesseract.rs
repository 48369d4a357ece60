//! Tesseract-backed [`OcrEngine`] implementation.

use super::engine::{LayoutMode, OcrEngine, RawRecognition};
use crate::{ArchivioError, Result};
use image::GrayImage;
use kreuzberg_tesseract::{TessPageSegMode, TesseractAPI};
use std::path::Path;

/// OCR engine backed by a bundled Tesseract.
///
/// Each `recognize` call creates a fresh API handle; Tesseract handles are
/// not thread safe, and per-call initialization keeps the engine `Sync`
/// without a handle pool.
pub struct TesseractEngine {
    tessdata_path: String,
}

impl TesseractEngine {
    /// Create an engine resolving tessdata from `TESSDATA_PREFIX` or common
    /// install locations.
    pub fn new() -> Self {
        Self {
            tessdata_path: resolve_tessdata_path(),
        }
    }

    /// Create an engine with an explicit tessdata directory.
    pub fn with_tessdata_path(path: impl Into<String>) -> Self {
        Self {
            tessdata_path: path.into(),
        }
    }
}

impl Default for TesseractEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn resolve_tessdata_path() -> String {
    if let Ok(path) = std::env::var("TESSDATA_PREFIX") {
        if !path.is_empty() {
            return path;
        }
    }
    const FALLBACK_PATHS: [&str; 5] = [
        "/usr/share/tesseract-ocr/5/tessdata",
        "/usr/share/tesseract-ocr/4.00/tessdata",
        "/usr/share/tessdata",
        "/usr/local/share/tessdata",
        "/opt/homebrew/share/tessdata",
    ];
    FALLBACK_PATHS
        .iter()
        .find(|path| Path::new(path).exists())
        .map(|path| (*path).to_string())
        .unwrap_or_default()
}

impl OcrEngine for TesseractEngine {
    fn recognize(
        &self,
        image: &GrayImage,
        language: &str,
        layout: LayoutMode,
    ) -> Result<RawRecognition> {
        let api = TesseractAPI::new();
        api.init(&self.tessdata_path, language).map_err(|e| {
            ArchivioError::recognition_with_source(
                format!("Failed to initialize Tesseract for language '{}'", language),
                e,
            )
        })?;
        api.set_page_seg_mode(TessPageSegMode::from_int(layout.as_psm()))
            .map_err(|e| {
                ArchivioError::recognition_with_source("Failed to set page segmentation mode", e)
            })?;

        let (width, height) = image.dimensions();
        api.set_image(image.as_raw(), width as i32, height as i32, 1, width as i32)
            .map_err(|e| ArchivioError::recognition_with_source("Failed to set image", e))?;
        api.recognize()
            .map_err(|e| ArchivioError::recognition_with_source("Recognition failed", e))?;

        let text = api
            .get_utf8_text()
            .map_err(|e| ArchivioError::recognition_with_source("Failed to extract text", e))?;
        let word_confidences = api.get_word_confidences().map_err(|e| {
            ArchivioError::recognition_with_source("Failed to extract word confidences", e)
        })?;

        Ok(RawRecognition {
            text,
            word_confidences,
        })
    }
}
