//! Global configuration options.

use std::{
    num::NonZeroUsize,
    sync::{OnceLock, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

/// Global configuration options for the `cfdm_compressed` crate.
///
/// Retrieve the global [`Config`] with [`global_config`] and modify it with [`global_config_mut`].
///
/// ## Chunk Concurrent Limit
/// > default: [`std::thread::available_parallelism`]`()`
///
/// The maximum number of chunk tasks decompressed concurrently by [`CompressedArray::get`](crate::array::CompressedArray::get) and [`TaskGraph::compute`](crate::array::TaskGraph::compute).
/// Limiting concurrency can reduce memory usage.
/// The concurrent limit is disabled if set to zero.
///
/// ## Auto Chunk Size
/// > default: `134217728` (128 MiB)
///
/// The target size in bytes of a chunk when a [`ChunkSpec::Auto`](crate::chunk_geometry::ChunkSpec::Auto) request is normalised.
///
/// ## Storage Pool Capacity
/// > default: `64`
///
/// The number of opened fragment stores retained by a [`StoragePool`](crate::storage::StoragePool) created with [`StoragePool::default`](crate::storage::StoragePool::default).
#[derive(Debug)]
pub struct Config {
    chunk_concurrent_limit: usize,
    auto_chunk_size: u64,
    storage_pool_capacity: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            chunk_concurrent_limit: std::thread::available_parallelism()
                .map_or(1, NonZeroUsize::get),
            auto_chunk_size: 128 * 1024 * 1024,
            storage_pool_capacity: 64,
        }
    }
}

impl Config {
    /// Get the [chunk concurrent limit](#chunk-concurrent-limit) configuration.
    #[must_use]
    pub fn chunk_concurrent_limit(&self) -> usize {
        self.chunk_concurrent_limit
    }

    /// Set the [chunk concurrent limit](#chunk-concurrent-limit) configuration.
    pub fn set_chunk_concurrent_limit(&mut self, concurrent_limit: usize) {
        self.chunk_concurrent_limit = concurrent_limit;
    }

    /// Get the [auto chunk size](#auto-chunk-size) configuration.
    #[must_use]
    pub fn auto_chunk_size(&self) -> u64 {
        self.auto_chunk_size
    }

    /// Set the [auto chunk size](#auto-chunk-size) configuration.
    pub fn set_auto_chunk_size(&mut self, auto_chunk_size: u64) {
        self.auto_chunk_size = auto_chunk_size;
    }

    /// Get the [storage pool capacity](#storage-pool-capacity) configuration.
    #[must_use]
    pub fn storage_pool_capacity(&self) -> u64 {
        self.storage_pool_capacity
    }

    /// Set the [storage pool capacity](#storage-pool-capacity) configuration.
    pub fn set_storage_pool_capacity(&mut self, capacity: u64) {
        self.storage_pool_capacity = capacity;
    }
}

static CONFIG: OnceLock<RwLock<Config>> = OnceLock::new();

/// Returns a reference to the global configuration.
///
/// # Panics
/// This function panics if the underlying lock has been poisoned and might panic if the global config is already held by the current thread.
pub fn global_config() -> RwLockReadGuard<'static, Config> {
    CONFIG
        .get_or_init(|| RwLock::new(Config::default()))
        .read()
        .unwrap()
}

/// Returns a mutable reference to the global configuration.
///
/// # Panics
/// This function panics if the underlying lock has been poisoned and might panic if the global config is already held by the current thread.
pub fn global_config_mut() -> RwLockWriteGuard<'static, Config> {
    CONFIG
        .get_or_init(|| RwLock::new(Config::default()))
        .write()
        .unwrap()
}
