//! Memoization of analysis results.
//!
//! Provides the `AnalysisStore` trait and two implementations:
//! - `MemoryStore`: process-local, computes each fingerprint at most once
//! - `FileStore`: content-addressed JSON files, first complete write wins
//!
//! Analyses are pure functions of their input, so a content fingerprint of
//! the input is a sufficient cache key.

mod file;
mod memory;

pub use file::{FileStore, FileStoreConfig};
pub use memory::MemoryStore;

use rivalmap_model::{AnalysisError, AnalysisInput, AnalysisResult};
use rivalmap_rank::analyze;
use sha2::{Digest, Sha256};
use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),
}

impl StoreError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Bumped whenever the serialized input or result layout changes.
const FINGERPRINT_DOMAIN: &[u8] = b"rivalmap-analysis-v1\n";

/// Content hash of an analysis input (hex-encoded SHA-256).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Fingerprint an input.
    ///
    /// Coverage and weight overrides serialize in sorted key order and the
    /// catalog in catalog order, so equal inputs always hash equally.
    pub fn of(input: &AnalysisInput) -> Result<Self, StoreError> {
        let canonical = serde_json::to_vec(input)?;

        let mut hasher = Sha256::new();
        hasher.update(FINGERPRINT_DOMAIN);
        hasher.update(&canonical);
        let digest = hasher.finalize();

        Ok(Self(format!("{digest:x}")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Key-value store for analysis results.
///
/// `put` must be atomic per key: a concurrent `get` sees either nothing or
/// a complete result.
pub trait AnalysisStore {
    /// Look up a stored result.
    fn get(
        &self,
        key: &Fingerprint,
    ) -> impl Future<Output = Result<Option<AnalysisResult>, StoreError>> + Send;

    /// Store a result. An existing entry for the key is kept.
    fn put(
        &self,
        key: &Fingerprint,
        result: &AnalysisResult,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Get the store name for logging.
    fn name(&self) -> &'static str;
}

/// Whether a cached analysis was reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
}

/// Analyze through a store: reuse a stored result or compute and store it.
///
/// Invalid input fails before anything is stored.
pub async fn analyze_cached<S: AnalysisStore>(
    store: &S,
    input: &AnalysisInput,
) -> Result<(AnalysisResult, CacheStatus), StoreError> {
    let key = Fingerprint::of(input)?;

    if let Some(result) = store.get(&key).await? {
        tracing::info!(store = store.name(), key = %key, "Analysis cache hit");
        return Ok((result, CacheStatus::Hit));
    }

    let result = analyze(input)?;
    store.put(&key, &result).await?;
    tracing::info!(store = store.name(), key = %key, "Analysis cache miss, result stored");

    Ok((result, CacheStatus::Miss))
}
