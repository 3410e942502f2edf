use crate::{AnalysisStore, Fingerprint, StoreError};
use rivalmap_model::AnalysisResult;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

static TMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// File store configuration.
#[derive(Debug, Clone)]
pub struct FileStoreConfig {
    /// Directory holding one `<fingerprint>.json` per result
    pub root: PathBuf,
}

impl Default for FileStoreConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(".rivalmap/cache"),
        }
    }
}

/// Content-addressed store of JSON-serialized results.
///
/// Results are written to a temporary file in the same directory and then
/// hard-linked into place, so readers never observe a partial file. A key
/// that already has a file is never rewritten, even by racing writers.
#[derive(Debug, Clone)]
pub struct FileStore {
    config: FileStoreConfig,
}

impl FileStore {
    /// Open a store, creating the root directory if needed.
    pub async fn open(config: FileStoreConfig) -> Result<Self, StoreError> {
        tokio::fs::create_dir_all(&config.root)
            .await
            .map_err(|e| StoreError::io(&config.root, e))?;
        Ok(Self { config })
    }

    pub fn root(&self) -> &Path {
        &self.config.root
    }

    fn path_for(&self, key: &Fingerprint) -> PathBuf {
        self.config.root.join(format!("{}.json", key))
    }

    fn tmp_path_for(&self, key: &Fingerprint) -> PathBuf {
        let seq = TMP_SEQ.fetch_add(1, Ordering::Relaxed);
        self.config
            .root
            .join(format!(".{}.{}.{}.tmp", key, std::process::id(), seq))
    }

    /// Write `bytes` under the key's final name unless a file is already
    /// there. Returns whether this call published the file.
    async fn publish(&self, key: &Fingerprint, bytes: &[u8]) -> Result<bool, StoreError> {
        let path = self.path_for(key);
        let tmp = self.tmp_path_for(key);

        tokio::fs::write(&tmp, bytes)
            .await
            .map_err(|e| StoreError::io(&tmp, e))?;

        // A link never replaces an existing name, unlike rename
        let linked = tokio::fs::hard_link(&tmp, &path).await;
        let _ = tokio::fs::remove_file(&tmp).await;
        match linked {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(StoreError::io(&path, e)),
        }
    }
}

impl AnalysisStore for FileStore {
    async fn get(&self, key: &Fingerprint) -> Result<Option<AnalysisResult>, StoreError> {
        let path = self.path_for(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::io(&path, e)),
        }
    }

    async fn put(&self, key: &Fingerprint, result: &AnalysisResult) -> Result<(), StoreError> {
        let path = self.path_for(key);

        let exists = tokio::fs::try_exists(&path)
            .await
            .map_err(|e| StoreError::io(&path, e))?;
        if exists {
            tracing::debug!(path = %path.display(), "Result already stored, keeping first");
            return Ok(());
        }

        let bytes = serde_json::to_vec_pretty(result)?;
        if self.publish(key, &bytes).await? {
            tracing::debug!(path = %path.display(), bytes = bytes.len(), "Stored analysis result");
        } else {
            tracing::debug!(path = %path.display(), "Lost write race, keeping first");
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "file"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::scenario_input;
    use crate::{analyze_cached, CacheStatus};
    use pretty_assertions::assert_eq;
    use rivalmap_rank::analyze;

    async fn open_temp() -> (tempfile::TempDir, FileStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(FileStoreConfig {
            root: dir.path().join("cache"),
        })
        .await
        .unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn test_round_trip_through_disk() {
        let (_dir, store) = open_temp().await;
        let input = scenario_input();
        let key = Fingerprint::of(&input).unwrap();

        assert_eq!(store.get(&key).await.unwrap(), None);

        let result = analyze(&input).unwrap();
        store.put(&key, &result).await.unwrap();

        assert!(store.root().join(format!("{}.json", key)).exists());
        assert_eq!(store.get(&key).await.unwrap(), Some(result));
    }

    #[tokio::test]
    async fn test_existing_entry_kept() {
        let (_dir, store) = open_temp().await;
        let input = scenario_input();
        let key = Fingerprint::of(&input).unwrap();

        let first = analyze(&input).unwrap();
        let mut second = first.clone();
        second.main_product = "Beta".into();

        store.put(&key, &first).await.unwrap();
        store.put(&key, &second).await.unwrap();
        assert_eq!(store.get(&key).await.unwrap().map(|r| r.main_product), Some("Acme".to_string()));
    }

    #[tokio::test]
    async fn test_no_temp_files_left() {
        let (_dir, store) = open_temp().await;
        let input = scenario_input();

        let (_, status) = analyze_cached(&store, &input).await.unwrap();
        assert_eq!(status, CacheStatus::Miss);
        let (_, status) = analyze_cached(&store, &input).await.unwrap();
        assert_eq!(status, CacheStatus::Hit);

        let names: Vec<String> = std::fs::read_dir(store.root())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 1);
        assert!(names[0].ends_with(".json"));
    }

    #[tokio::test]
    async fn test_racing_writers_keep_first() {
        let (_dir, store) = open_temp().await;
        let input = scenario_input();
        let key = Fingerprint::of(&input).unwrap();

        let first = analyze(&input).unwrap();
        let mut second = first.clone();
        second.main_product = "Beta".into();

        store.put(&key, &first).await.unwrap();

        // A writer that passed the existence check before the first landed
        let bytes = serde_json::to_vec_pretty(&second).unwrap();
        assert!(!store.publish(&key, &bytes).await.unwrap());

        let stored = store.get(&key).await.unwrap().unwrap();
        assert_eq!(stored.main_product, "Acme");

        let entries = std::fs::read_dir(store.root()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let (_dir, store) = open_temp().await;
        let key = Fingerprint::of(&scenario_input()).unwrap();
        std::fs::write(store.root().join(format!("{}.json", key)), b"{truncated").unwrap();

        assert!(matches!(store.get(&key).await, Err(StoreError::Serialization(_))));
    }
}
