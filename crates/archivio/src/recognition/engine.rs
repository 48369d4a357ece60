//! The OCR engine seam.
//!
//! Recognition is pluggable: the pipeline consumes anything implementing
//! [`OcrEngine`], the real Tesseract backend lives behind the `tesseract`
//! feature, and tests supply mocks.

use crate::Result;
use image::GrayImage;
use serde::{Deserialize, Serialize};

/// Page layout hint passed to the engine. Variants map to Tesseract page
/// segmentation modes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutMode {
    /// Fully automatic layout analysis
    Auto,
    /// Single column of variable-height text
    SingleColumn,
    /// A single uniform block of text; the right default for the
    /// typewritten single-column pages this pipeline targets
    #[default]
    SingleBlock,
    /// One line of text
    SingleLine,
}

impl LayoutMode {
    /// Tesseract PSM value for this layout.
    pub fn as_psm(self) -> i32 {
        match self {
            LayoutMode::Auto => 3,
            LayoutMode::SingleColumn => 4,
            LayoutMode::SingleBlock => 6,
            LayoutMode::SingleLine => 7,
        }
    }
}

/// Engine output before normalization and confidence aggregation.
#[derive(Debug, Clone, Default)]
pub struct RawRecognition {
    /// Text exactly as the engine produced it
    pub text: String,
    /// Per-word confidences (0-100); -1 marks a token the engine could not
    /// score
    pub word_confidences: Vec<i32>,
}

/// An OCR capability over preprocessed grayscale page images.
///
/// Implementations must be safe to call from multiple worker threads.
pub trait OcrEngine: Send + Sync {
    /// Recognize text in `image` using the given language model and layout
    /// hint.
    fn recognize(&self, image: &GrayImage, language: &str, layout: LayoutMode)
        -> Result<RawRecognition>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_mode_psm_values() {
        assert_eq!(LayoutMode::Auto.as_psm(), 3);
        assert_eq!(LayoutMode::SingleColumn.as_psm(), 4);
        assert_eq!(LayoutMode::SingleBlock.as_psm(), 6);
        assert_eq!(LayoutMode::SingleLine.as_psm(), 7);
    }

    #[test]
    fn test_layout_mode_default_is_single_block() {
        assert_eq!(LayoutMode::default(), LayoutMode::SingleBlock);
    }
}
