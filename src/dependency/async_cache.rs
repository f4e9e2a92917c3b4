//! Single-flight memoizing cache.
//!
//! Each key maps to a shared once-cell. The first caller installs the cell
//! and runs the computation; concurrent callers for the same key wait on the
//! same cell and observe the same value, or the same failure. Failures are
//! memoized too: a key that failed once fails for the rest of the run.
//!
//! The map guard is released before the computation is awaited, so a
//! computation may request other keys. It must never (transitively) request
//! its own key.

use dashmap::DashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use tokio::sync::OnceCell;

use crate::core::DepgenError;

type Slot<V, E> = Arc<OnceCell<Result<V, Arc<E>>>>;

/// Memoizing cache guaranteeing one computation per key.
pub struct AsyncCache<K, V, E = DepgenError> {
    entries: DashMap<K, Slot<V, E>>,
}

impl<K, V, E> AsyncCache<K, V, E>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Create an empty cache.
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Return the value for `key`, computing it with `compute` if absent.
    ///
    /// `compute` runs at most once per key for the lifetime of the cache,
    /// no matter how many callers race on the first access.
    pub async fn get_or_put<F, Fut>(&self, key: K, compute: F) -> Result<V, Arc<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let slot = self.entries.entry(key).or_default().clone();
        slot.get_or_init(|| async move { compute().await.map_err(Arc::new) }).await.clone()
    }

    /// Install a precomputed value unless the key is already present.
    ///
    /// Returns `true` when the value was installed.
    pub fn insert_if_absent(&self, key: K, value: V) -> bool {
        let slot = self.entries.entry(key).or_default().clone();
        slot.set(Ok(value)).is_ok()
    }

    /// Completed result for `key`, if any.
    pub fn get(&self, key: &K) -> Option<Result<V, Arc<E>>> {
        self.entries.get(key).and_then(|slot| slot.get().cloned())
    }

    /// Snapshot of all successfully completed values.
    pub fn values(&self) -> Vec<V> {
        self.entries
            .iter()
            .filter_map(|entry| match entry.value().get() {
                Some(Ok(value)) => Some(value.clone()),
                _ => None,
            })
            .collect()
    }

    /// Number of keys ever requested.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no key was ever requested.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K, V, E> Default for AsyncCache<K, V, E>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}
