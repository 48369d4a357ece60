//! Image enhancement pipeline.
//!
//! Turns a raw scan into an OCR-ready page image through a fixed stage
//! order: grayscale, denoise, local contrast (CLAHE), adaptive
//! binarization, sharpen, upscale, deskew. The order is part of the
//! contract; binarizing before contrast recovery, for example, destroys
//! faded strokes that CLAHE would have rescued. The pipeline is
//! deterministic: the same input bytes and configuration always produce the
//! same output pixels.

mod deskew;
mod filters;

pub use deskew::estimate_skew;

use crate::config::PreprocessConfig;
use crate::{ArchivioError, Result};
use image::GrayImage;
use std::path::Path;

/// Runs the enhancement pipeline over source images.
#[derive(Debug, Clone)]
pub struct Preprocessor {
    config: PreprocessConfig,
}

impl Preprocessor {
    /// Create a preprocessor, validating the stage constants.
    pub fn new(config: PreprocessConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Decode a source image from disk and run all enhancement stages.
    pub fn enhance(&self, source: &Path) -> Result<GrayImage> {
        let decoded = image::open(source).map_err(|e| {
            ArchivioError::image_read_with_source(
                format!("Cannot decode source image '{}'", source.display()),
                e,
            )
        })?;
        Ok(self.enhance_image(&decoded.to_luma8()))
    }

    /// Run all enhancement stages over an already-decoded grayscale image.
    pub fn enhance_image(&self, gray: &GrayImage) -> GrayImage {
        let denoised = filters::denoise(gray, self.config.denoise_strength);
        let contrasted = filters::clahe(
            &denoised,
            self.config.clahe_tile_grid,
            self.config.clahe_clip_limit,
        );
        let binary = filters::binarize_adaptive(
            &contrasted,
            self.config.binarize_block_size,
            self.config.binarize_offset,
        );
        let sharpened = filters::sharpen(&binary);
        let upscaled = filters::upscale_to_height(&sharpened, self.config.min_height);
        deskew::deskew(&upscaled, self.config.deskew_threshold_degrees)
    }
}
