use moka::{
    policy::EvictionPolicy,
    sync::{Cache, CacheBuilder},
};

use crate::config::global_config;

use super::{ReadableStorage, StorageError};

/// A pool of opened stores keyed by location.
///
/// Concurrent reads of fragments in the same file share one opened store.
/// The least recently used stores are closed when the pool exceeds its capacity.
pub struct StoragePool {
    cache: Cache<String, ReadableStorage>,
}

impl std::fmt::Debug for StoragePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoragePool")
            .field("len", &self.cache.entry_count())
            .finish()
    }
}

impl StoragePool {
    /// Create a new [`StoragePool`] retaining up to `capacity` opened stores.
    #[must_use]
    pub fn new(capacity: u64) -> Self {
        let cache = CacheBuilder::new(capacity)
            .eviction_policy(EvictionPolicy::lru())
            .build();
        Self { cache }
    }

    /// Return the store opened at `location`, opening it with `open` if it is not in the pool.
    ///
    /// # Errors
    /// Returns the [`StorageError`] of `open`. A failed open is not retained.
    pub fn get_or_open<F>(&self, location: &str, open: F) -> Result<ReadableStorage, StorageError>
    where
        F: FnOnce() -> Result<ReadableStorage, StorageError>,
    {
        self.cache
            .try_get_with(location.to_string(), open)
            .map_err(|err| StorageError::Other(err.to_string()))
    }

    /// Return the number of opened stores in the pool.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cache.run_pending_tasks();
        usize::try_from(self.cache.entry_count()).unwrap_or(usize::MAX)
    }

    /// Returns true if the pool holds no opened stores.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Close every opened store.
    pub fn clear(&self) {
        self.cache.invalidate_all();
    }
}

impl Default for StoragePool {
    /// Create a new [`StoragePool`] with the [storage pool capacity](crate::config::Config#storage-pool-capacity) of the global configuration.
    fn default() -> Self {
        Self::new(global_config().storage_pool_capacity())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use crate::storage::store::MemoryStore;

    use super::*;

    #[test]
    fn storage_pool_opens_once() {
        let pool = StoragePool::new(4);
        let opened = AtomicUsize::new(0);
        let open = || {
            opened.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(MemoryStore::new()) as ReadableStorage)
        };
        pool.get_or_open("file:///a.json", open).unwrap();
        pool.get_or_open("file:///a.json", open).unwrap();
        assert_eq!(opened.load(Ordering::SeqCst), 1);
        assert_eq!(pool.len(), 1);

        assert!(pool
            .get_or_open("file:///b.json", || Err(StorageError::from("unreadable")))
            .is_err());
        assert_eq!(pool.len(), 1);
        pool.clear();
        pool.get_or_open("file:///a.json", open).unwrap();
        assert_eq!(opened.load(Ordering::SeqCst), 2);
    }
}
