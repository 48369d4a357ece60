//! # Archivio
//!
//! Digitization core for scanned historical documents.
//!
//! Archivio turns raw scans of typewritten archive pages into searchable
//! text. It covers the three CPU-bound stages of a digitization service and
//! leaves upload handling, storage, and transport to the embedding
//! application:
//!
//! - **Preprocessing** ([`preprocess`]): a deterministic enhancement
//!   pipeline (grayscale, denoise, CLAHE, adaptive binarization, sharpen,
//!   upscale, deskew) tuned for aged, unevenly lit, slightly rotated pages.
//! - **Recognition** ([`recognition`]): OCR over the enhanced image through
//!   the pluggable [`OcrEngine`] seam, with confidence aggregation and text
//!   normalization. The Tesseract backend lives behind the `tesseract`
//!   feature.
//! - **Lifecycle** ([`document`]): the `Uploaded -> Processing ->
//!   Completed | Error` state machine, with statuses and results persisted
//!   through the [`StatusStore`] seam.
//!
//! Intermediate page images are held in a time-evicted artifact cache
//! ([`cache`]) so a failed recognition can be retried without re-running the
//! filters.
//!
//! ## Example
//!
//! ```rust,no_run
//! use archivio::{CoreConfig, Document, DocumentPipeline, InMemoryStatusStore};
//! use std::sync::Arc;
//!
//! # struct MyEngine;
//! # impl archivio::OcrEngine for MyEngine {
//! #     fn recognize(&self, _: &image::GrayImage, _: &str, _: archivio::LayoutMode)
//! #         -> archivio::Result<archivio::RawRecognition> { Ok(Default::default()) }
//! # }
//! # fn main() -> archivio::Result<()> {
//! let config = CoreConfig::default();
//! let store = Arc::new(InMemoryStatusStore::new());
//! let pipeline = DocumentPipeline::new(&config, Arc::new(MyEngine), store)?;
//!
//! let mut document = Document::new("/uploads/page_01.png");
//! let extraction = pipeline.process(&mut document, false)?;
//! println!("{} ({:.1}%)", extraction.text, extraction.confidence);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]

pub mod cache;
pub mod config;
pub mod document;
pub mod error;
pub mod preprocess;
pub mod recognition;
pub mod types;

pub use cache::ArtifactCache;
pub use config::{CacheConfig, CoreConfig, OcrConfig, PreprocessConfig};
pub use document::{
    BatchOutcome, Document, DocumentPipeline, DocumentStatus, InMemoryStatusStore, StatusStore,
};
pub use error::{ArchivioError, Result};
pub use preprocess::Preprocessor;
pub use recognition::{LayoutMode, OcrEngine, RawRecognition, RecognitionEngine};
#[cfg(feature = "tesseract")]
pub use recognition::TesseractEngine;
pub use types::{ExtractionResult, PreprocessedArtifact};
