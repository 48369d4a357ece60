//! Filesystem-backed cache for preprocessed page artifacts.
//!
//! Artifacts are encoded PNG files named by fingerprint, written atomically
//! (temp file then rename) so readers never observe a half-written image.
//! Eviction is time based: `evict(keep_recent = true)` spares artifacts
//! younger than the retention window, `evict(false)` clears everything, as
//! done on startup to sweep artifacts orphaned by a crash.

use crate::config::CacheConfig;
use crate::types::PreprocessedArtifact;
use crate::{ArchivioError, Result};
use image::GrayImage;
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

const ARTIFACT_EXTENSION: &str = "png";

/// Compute a 16-hex-digit fingerprint of the input string.
fn compute_hash(data: &str) -> String {
    let mut hasher = ahash::AHasher::default();
    data.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

/// On-disk store of preprocessed artifacts with time-based eviction.
pub struct ArtifactCache {
    cache_dir: PathBuf,
    retention: Duration,
    sequence: AtomicU64,
}

impl ArtifactCache {
    /// Open (and create if needed) the cache directory.
    pub fn new(config: &CacheConfig) -> Result<Self> {
        let cache_dir = match &config.cache_dir {
            Some(dir) => dir.clone(),
            None => std::env::current_dir()
                .unwrap_or_else(|_| PathBuf::from("."))
                .join(".archivio")
                .join("artifacts"),
        };
        fs::create_dir_all(&cache_dir).map_err(|e| {
            ArchivioError::cache_with_source(
                format!("Failed to create cache directory '{}'", cache_dir.display()),
                e,
            )
        })?;
        Ok(Self {
            cache_dir,
            retention: Duration::from_secs(config.retention_secs),
            sequence: AtomicU64::new(0),
        })
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Encode a preprocessed page as PNG and store it under a fresh
    /// fingerprint, returning the artifact record.
    ///
    /// The fingerprint is salted with the wall clock plus a process-local
    /// sequence counter (to break same-tick ties), so repeated stores of the
    /// same source never resolve to a stale artifact. Freshness is traded
    /// against deduplication on purpose: a forced reprocess must never serve
    /// yesterday's pixels.
    pub fn store(&self, source_path: &Path, image: &GrayImage) -> Result<PreprocessedArtifact> {
        let created_at = SystemTime::now();
        let nanos = created_at
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        let fingerprint = compute_hash(&format!(
            "source={}&ts={}&seq={}",
            source_path.display(),
            nanos,
            sequence
        ));
        let path = self
            .cache_dir
            .join(format!("{}.{}", fingerprint, ARTIFACT_EXTENSION));

        let mut encoded = Vec::new();
        image::DynamicImage::ImageLuma8(image.clone())
            .write_to(&mut std::io::Cursor::new(&mut encoded), image::ImageFormat::Png)
            .map_err(|e| {
                ArchivioError::cache_with_source(
                    format!("Failed to encode artifact for '{}'", source_path.display()),
                    e,
                )
            })?;

        // Write-then-rename so a concurrent evict or reader never sees a
        // partial file
        let temp_path = self
            .cache_dir
            .join(format!("{}.tmp.{}", fingerprint, std::process::id()));
        fs::write(&temp_path, &encoded).map_err(|e| {
            ArchivioError::cache_with_source(
                format!("Failed to write artifact '{}'", temp_path.display()),
                e,
            )
        })?;
        if let Err(e) = fs::rename(&temp_path, &path) {
            let _ = fs::remove_file(&temp_path);
            return Err(ArchivioError::cache_with_source(
                format!("Failed to finalize artifact '{}'", path.display()),
                e,
            ));
        }

        tracing::debug!(
            fingerprint = %fingerprint,
            source = %source_path.display(),
            "stored preprocessed artifact"
        );

        Ok(PreprocessedArtifact {
            fingerprint,
            path,
            created_at,
            source_path: source_path.to_path_buf(),
        })
    }

    /// Delete stored artifacts, returning how many were removed.
    ///
    /// With `keep_recent`, artifacts younger than the retention window are
    /// spared since an in-flight extraction may still be reading them.
    /// Eviction never fails the caller: per-file failures (and an unreadable
    /// cache directory) are logged and skipped.
    pub fn evict(&self, keep_recent: bool) -> usize {
        let entries = match fs::read_dir(&self.cache_dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(
                    cache_dir = %self.cache_dir.display(),
                    error = %e,
                    "cannot read cache directory, skipping eviction"
                );
                return 0;
            }
        };

        let now = SystemTime::now();
        let mut removed = 0;
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(ARTIFACT_EXTENSION) {
                continue;
            }
            if keep_recent && self.is_recent(&entry, now) {
                continue;
            }
            match fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "failed to evict artifact, skipping"
                    );
                }
            }
        }
        if removed > 0 {
            tracing::debug!(removed, keep_recent, "evicted artifacts");
        }
        removed
    }

    /// Number of artifacts currently on disk.
    pub fn artifact_count(&self) -> usize {
        fs::read_dir(&self.cache_dir)
            .map(|entries| {
                entries
                    .flatten()
                    .filter(|e| {
                        e.path().extension().and_then(|ext| ext.to_str()) == Some(ARTIFACT_EXTENSION)
                    })
                    .count()
            })
            .unwrap_or(0)
    }

    // Unknown ages (metadata failures, future mtimes) count as recent so an
    // in-use artifact is never deleted by a clock anomaly.
    fn is_recent(&self, entry: &fs::DirEntry, now: SystemTime) -> bool {
        let Ok(metadata) = entry.metadata() else {
            return true;
        };
        let Ok(modified) = metadata.modified() else {
            return true;
        };
        match now.duration_since(modified) {
            Ok(age) => age < self.retention,
            Err(_) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use filetime::FileTime;
    use image::Luma;

    fn test_cache(dir: &Path, retention_secs: u64) -> ArtifactCache {
        ArtifactCache::new(&CacheConfig {
            cache_dir: Some(dir.to_path_buf()),
            retention_secs,
        })
        .unwrap()
    }

    fn page() -> GrayImage {
        GrayImage::from_pixel(20, 30, Luma([128]))
    }

    fn backdate(path: &Path, secs: i64) {
        let past = FileTime::from_unix_time(FileTime::now().unix_seconds() - secs, 0);
        filetime::set_file_mtime(path, past).unwrap();
    }

    #[test]
    fn test_compute_hash_format() {
        let hash = compute_hash("source=/uploads/a.png&ts=1&seq=0");
        assert_eq!(hash.len(), 16);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_compute_hash_deterministic() {
        assert_eq!(compute_hash("abc"), compute_hash("abc"));
        assert_ne!(compute_hash("abc"), compute_hash("abd"));
    }

    #[test]
    fn test_store_writes_decodable_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let cache = test_cache(dir.path(), 300);

        let artifact = cache.store(Path::new("/uploads/page.png"), &page()).unwrap();

        assert!(artifact.path.exists());
        assert_eq!(artifact.fingerprint.len(), 16);
        assert_eq!(artifact.source_path, Path::new("/uploads/page.png"));
        let decoded = image::open(&artifact.path).unwrap().to_luma8();
        assert_eq!(decoded.dimensions(), (20, 30));
    }

    #[test]
    fn test_store_same_source_twice_yields_distinct_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let cache = test_cache(dir.path(), 300);
        let source = Path::new("/uploads/page.png");

        let first = cache.store(source, &page()).unwrap();
        let second = cache.store(source, &page()).unwrap();

        assert_ne!(first.fingerprint, second.fingerprint);
        assert!(first.path.exists());
        assert!(second.path.exists());
        assert_eq!(cache.artifact_count(), 2);
    }

    #[test]
    fn test_evict_all() {
        let dir = tempfile::tempdir().unwrap();
        let cache = test_cache(dir.path(), 300);
        cache.store(Path::new("/a.png"), &page()).unwrap();
        cache.store(Path::new("/b.png"), &page()).unwrap();

        let removed = cache.evict(false);
        assert_eq!(removed, 2);
        assert_eq!(cache.artifact_count(), 0);
    }

    #[test]
    fn test_evict_keep_recent_spares_fresh_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let cache = test_cache(dir.path(), 300);
        let artifact = cache.store(Path::new("/a.png"), &page()).unwrap();

        let removed = cache.evict(true);
        assert_eq!(removed, 0);
        assert!(artifact.path.exists());
    }

    #[test]
    fn test_evict_keep_recent_removes_expired_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let cache = test_cache(dir.path(), 300);
        let old = cache.store(Path::new("/old.png"), &page()).unwrap();
        let fresh = cache.store(Path::new("/fresh.png"), &page()).unwrap();
        backdate(&old.path, 600);

        let removed = cache.evict(true);
        assert_eq!(removed, 1);
        assert!(!old.path.exists());
        assert!(fresh.path.exists());
    }

    #[test]
    fn test_evict_ignores_foreign_files() {
        let dir = tempfile::tempdir().unwrap();
        let cache = test_cache(dir.path(), 300);
        let foreign = dir.path().join("notes.txt");
        fs::write(&foreign, "keep me").unwrap();

        let removed = cache.evict(false);
        assert_eq!(removed, 0);
        assert!(foreign.exists());
    }

    #[test]
    fn test_evict_missing_directory_returns_zero() {
        let dir = tempfile::tempdir().unwrap();
        let cache = test_cache(&dir.path().join("gone"), 300);
        fs::remove_dir(dir.path().join("gone")).unwrap();

        assert_eq!(cache.evict(false), 0);
    }

    #[test]
    fn test_new_creates_nested_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let cache = test_cache(&nested, 300);
        assert!(cache.cache_dir().exists());
    }
}
