//! Document lifecycle and pipeline orchestration.
//!
//! A document moves `Uploaded -> Processing -> Completed | Error`. Both
//! terminal states are re-drivable: an errored document can be retried, a
//! completed one reprocessed with `force_reprocess`. Every `process` call
//! leaves the document in a terminal state; no failure path may strand a
//! document in `Processing`.
//!
//! Known gap: a hard process crash between the `Processing` and terminal
//! transitions leaves the persisted status stuck in `Processing`. The core
//! does not time such documents out; an external reconciliation sweep owns
//! that.

mod store;

pub use store::{InMemoryStatusStore, StatusStore};

use crate::cache::ArtifactCache;
use crate::config::CoreConfig;
use crate::preprocess::Preprocessor;
use crate::recognition::{OcrEngine, RecognitionEngine};
use crate::types::{ExtractionResult, PreprocessedArtifact};
use crate::{ArchivioError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

/// Processing lifecycle state of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Uploaded,
    Processing,
    Completed,
    Error,
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DocumentStatus::Uploaded => "uploaded",
            DocumentStatus::Processing => "processing",
            DocumentStatus::Completed => "completed",
            DocumentStatus::Error => "error",
        };
        f.write_str(name)
    }
}

/// A scanned document tracked through the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub source_path: PathBuf,
    pub status: DocumentStatus,
}

impl Document {
    /// Register a freshly uploaded document.
    pub fn new(source_path: impl Into<PathBuf>) -> Self {
        Self {
            id: Uuid::new_v4(),
            source_path: source_path.into(),
            status: DocumentStatus::Uploaded,
        }
    }
}

/// Per-document outcome of a batch run.
#[derive(Debug)]
pub struct BatchOutcome {
    pub document: Document,
    pub result: Result<ExtractionResult>,
}

/// Drives documents through preprocessing, caching, and recognition.
///
/// Cloning is cheap; all components are shared. The pipeline is safe to use
/// from multiple worker threads.
#[derive(Clone)]
pub struct DocumentPipeline {
    preprocessor: Arc<Preprocessor>,
    recognizer: Arc<RecognitionEngine>,
    cache: Arc<ArtifactCache>,
    store: Arc<dyn StatusStore>,
}

impl DocumentPipeline {
    /// Build a pipeline from configuration.
    ///
    /// Sweeps the artifact cache unconditionally: anything on disk at
    /// startup was orphaned by a previous run.
    pub fn new(
        config: &CoreConfig,
        engine: Arc<dyn OcrEngine>,
        store: Arc<dyn StatusStore>,
    ) -> Result<Self> {
        let cache = Arc::new(ArtifactCache::new(&config.cache)?);
        let orphaned = cache.evict(false);
        if orphaned > 0 {
            tracing::info!(count = orphaned, "removed artifacts orphaned by a previous run");
        }

        Ok(Self {
            preprocessor: Arc::new(Preprocessor::new(config.preprocess.clone())?),
            recognizer: Arc::new(RecognitionEngine::new(engine, config.ocr.clone())?),
            cache,
            store,
        })
    }

    /// Enhance a source image and write the result through the cache.
    pub fn preprocess(&self, source: &Path) -> Result<PreprocessedArtifact> {
        let enhanced = self.preprocessor.enhance(source)?;
        self.cache.store(source, &enhanced)
    }

    /// Recognize the text in a stored artifact.
    pub fn recognize(&self, artifact: &PreprocessedArtifact) -> Result<ExtractionResult> {
        self.recognizer.recognize(artifact)
    }

    /// Evict cached artifacts; see [`ArtifactCache::evict`].
    pub fn evict_cache(&self, keep_recent: bool) -> usize {
        self.cache.evict(keep_recent)
    }

    /// Run the full pipeline over one document.
    ///
    /// The source file is verified before entering `Processing`; a vanished
    /// upload drives the document straight to `Error` without ever claiming
    /// work has started. A completed document is only rerun with
    /// `force_reprocess`, and rerunning replaces the stored result rather
    /// than adding a second one.
    pub fn process(
        &self,
        document: &mut Document,
        force_reprocess: bool,
    ) -> Result<ExtractionResult> {
        if document.status == DocumentStatus::Completed && !force_reprocess {
            return Err(ArchivioError::validation(format!(
                "Document {} is already completed; pass force_reprocess to run it again",
                document.id
            )));
        }

        if !document.source_path.exists() {
            return Err(self.fail(
                document,
                ArchivioError::SourceMissing {
                    path: document.source_path.clone(),
                },
            ));
        }

        if let Err(e) = self.transition(document, DocumentStatus::Processing) {
            return Err(self.fail(document, e));
        }
        tracing::info!(document = %document.id, source = %document.source_path.display(), "processing document");

        let result = match self.run(document) {
            Ok(result) => result,
            Err(e) => return Err(self.fail(document, e)),
        };

        if let Err(e) = self.store.replace_result(document.id, &result) {
            return Err(self.fail(document, e));
        }
        if let Err(e) = self.transition(document, DocumentStatus::Completed) {
            return Err(self.fail(document, e));
        }

        let evicted = self.cache.evict(true);
        tracing::info!(
            document = %document.id,
            confidence = result.confidence,
            evicted,
            "document completed"
        );
        Ok(result)
    }

    /// Process documents in parallel. Outcomes are returned in input order;
    /// one document failing does not abort the others.
    pub fn process_batch(&self, documents: Vec<Document>, force_reprocess: bool) -> Vec<BatchOutcome> {
        use rayon::prelude::*;

        documents
            .into_par_iter()
            .map(|mut document| {
                let result = self.process(&mut document, force_reprocess);
                BatchOutcome { document, result }
            })
            .collect()
    }

    fn run(&self, document: &Document) -> Result<ExtractionResult> {
        let artifact = self.preprocess(&document.source_path)?;
        self.recognizer.recognize(&artifact)
    }

    fn transition(&self, document: &mut Document, status: DocumentStatus) -> Result<()> {
        self.store.record_status(document.id, status)?;
        document.status = status;
        Ok(())
    }

    // Drive the document to Error and hand back the original cause. A store
    // failure while recording the error must not mask the cause; the
    // in-memory view still goes terminal.
    fn fail(&self, document: &mut Document, cause: ArchivioError) -> ArchivioError {
        if let Err(store_err) = self.transition(document, DocumentStatus::Error) {
            tracing::error!(
                document = %document.id,
                error = %store_err,
                "failed to record error status"
            );
            document.status = DocumentStatus::Error;
        }
        tracing::warn!(document = %document.id, error = %cause, "document failed");
        cause
    }
}

#[cfg(feature = "tokio-runtime")]
impl DocumentPipeline {
    /// Run [`process`](Self::process) on the blocking thread pool.
    ///
    /// The filters and OCR are CPU bound and must not run on an async
    /// request thread. If the worker panics or is aborted mid-pipeline, the
    /// document is still driven to `Error` rather than left in `Processing`.
    pub async fn process_async(
        &self,
        document: Document,
        force_reprocess: bool,
    ) -> (Document, Result<ExtractionResult>) {
        let pipeline = self.clone();
        let id = document.id;
        let source_path = document.source_path.clone();
        let mut document = document;

        match tokio::task::spawn_blocking(move || {
            let result = pipeline.process(&mut document, force_reprocess);
            (document, result)
        })
        .await
        {
            Ok(outcome) => outcome,
            Err(join_err) => {
                if let Err(e) = self.store.record_status(id, DocumentStatus::Error) {
                    tracing::error!(
                        document = %id,
                        error = %e,
                        "failed to record error status after aborted worker"
                    );
                }
                let document = Document {
                    id,
                    source_path,
                    status: DocumentStatus::Error,
                };
                let cause = ArchivioError::processing(format!(
                    "Processing worker terminated abnormally: {}",
                    join_err
                ));
                (document, Err(cause))
            }
        }
    }
}
