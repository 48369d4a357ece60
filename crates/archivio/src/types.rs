//! Core data types shared across the pipeline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::SystemTime;

/// A preprocessed page image held by the artifact cache.
///
/// Artifacts are immutable after creation; they are only ever replaced (by a
/// fresh store) or deleted (by eviction). The fingerprint uniquely identifies
/// one artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreprocessedArtifact {
    /// Cache key; hash of (source path, wall-clock time, sequence)
    pub fingerprint: String,
    /// Location of the encoded artifact on disk
    pub path: PathBuf,
    /// Wall-clock time the artifact was written
    pub created_at: SystemTime,
    /// The original upload this artifact was derived from
    pub source_path: PathBuf,
}

/// The outcome of one recognition pass over an artifact.
///
/// Created once per extraction call and immutable thereafter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// Normalized text (whitespace collapsed, OCR confusions substituted)
    pub text: String,
    /// Engine output before normalization
    pub raw_text: String,
    /// Mean of the non-negative word confidences, 0.0 when none (0.0 - 100.0)
    pub confidence: f64,
    /// Per-word engine confidences; -1 means no recognized token
    pub word_confidences: Vec<i32>,
    /// The artifact the text was extracted from
    pub artifact_path: PathBuf,
}
