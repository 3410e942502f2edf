use crate::{AnalysisStore, Fingerprint, StoreError};
use rivalmap_model::{AnalysisError, AnalysisResult};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::OnceCell;

type Slot = Arc<OnceCell<AnalysisResult>>;

/// In-process store with compute-once-per-key semantics.
///
/// Each fingerprint owns a once-cell. Concurrent `get_or_compute` callers
/// for the same key wait on the one running computation. The map lock is
/// only held to find or create a cell, never across an await.
#[derive(Debug, Default)]
pub struct MemoryStore {
    slots: Mutex<HashMap<Fingerprint, Slot>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, key: &Fingerprint) -> Slot {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.entry(key.clone()).or_default().clone()
    }

    fn lookup(&self, key: &Fingerprint) -> Option<AnalysisResult> {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.get(key).and_then(|slot| slot.get().cloned())
    }

    /// Return the stored result, running `compute` only if no caller has
    /// produced one yet. A failed computation stores nothing and leaves no
    /// slot behind.
    pub async fn get_or_compute<F>(
        &self,
        key: &Fingerprint,
        compute: F,
    ) -> Result<AnalysisResult, AnalysisError>
    where
        F: FnOnce() -> Result<AnalysisResult, AnalysisError>,
    {
        let slot = self.slot(key);
        let result = slot
            .get_or_try_init(|| async move { compute() })
            .await
            .cloned();
        if result.is_err() {
            self.discard_empty(key, &slot);
        }
        result
    }

    /// Drop a key's slot if it is still `slot` and holds nothing.
    fn discard_empty(&self, key: &Fingerprint, slot: &Slot) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        let stale = slots
            .get(key)
            .is_some_and(|current| Arc::ptr_eq(current, slot) && !current.initialized());
        if stale {
            slots.remove(key);
        }
    }

    /// Number of stored results.
    pub fn len(&self) -> usize {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.values().filter(|slot| slot.initialized()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AnalysisStore for MemoryStore {
    async fn get(&self, key: &Fingerprint) -> Result<Option<AnalysisResult>, StoreError> {
        Ok(self.lookup(key))
    }

    async fn put(&self, key: &Fingerprint, result: &AnalysisResult) -> Result<(), StoreError> {
        if self.slot(key).set(result.clone()).is_err() {
            tracing::debug!(key = %key, "Result already stored, keeping first");
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::scenario_input;
    use pretty_assertions::assert_eq;
    use rivalmap_rank::analyze;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_get_put() {
        let store = MemoryStore::new();
        let input = scenario_input();
        let key = Fingerprint::of(&input).unwrap();

        assert_eq!(store.get(&key).await.unwrap(), None);
        assert!(store.is_empty());

        let result = analyze(&input).unwrap();
        store.put(&key, &result).await.unwrap();
        assert_eq!(store.get(&key).await.unwrap(), Some(result));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_first_put_wins() {
        let store = MemoryStore::new();
        let input = scenario_input();
        let key = Fingerprint::of(&input).unwrap();

        let first = analyze(&input).unwrap();
        let mut second = first.clone();
        second.main_product = "Beta".into();

        store.put(&key, &first).await.unwrap();
        store.put(&key, &second).await.unwrap();
        assert_eq!(store.get(&key).await.unwrap(), Some(first));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_compute_once_per_key() {
        let store = Arc::new(MemoryStore::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let input = scenario_input();
        let key = Fingerprint::of(&input).unwrap();

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = Arc::clone(&store);
                let calls = Arc::clone(&calls);
                let input = input.clone();
                let key = key.clone();
                tokio::spawn(async move {
                    store
                        .get_or_compute(&key, || {
                            calls.fetch_add(1, Ordering::SeqCst);
                            analyze(&input)
                        })
                        .await
                })
            })
            .collect();

        for handle in handles {
            let result = handle.await.unwrap().unwrap();
            assert_eq!(result.scores["Beta"], 100.0);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_compute_stores_nothing() {
        let store = MemoryStore::new();
        let key = Fingerprint::of(&scenario_input()).unwrap();

        let err = store
            .get_or_compute(&key, || Err(AnalysisError::invalid("bad input")))
            .await;
        assert!(err.is_err());
        assert!(store.is_empty());
        assert!(store.slots.lock().unwrap().is_empty());

        let input = scenario_input();
        let ok = store.get_or_compute(&key, || analyze(&input)).await;
        assert!(ok.is_ok());
    }
}
