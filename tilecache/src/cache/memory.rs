//! In-memory tile cache using moka.
//!
//! This backend wraps `moka::future::Cache` to provide an async-safe,
//! lock-free, volatile cache bounded by tile count.
//!
//! # Why moka?
//!
//! - Lock-free reads (common case)
//! - Concurrent writes without blocking
//! - Atomic "insert if absent" through the entry API, which gives us the
//!   non-forced insertion policy without an extra lock
//! - Automatic LRU eviction once the capacity is reached

use std::sync::Arc;

use moka::future::Cache as MokaCache;
use moka::policy::EvictionPolicy;
use tracing::debug;

use super::item::CacheItem;
use super::traits::{BoxFuture, CacheError, TileCache};
use crate::coord::TileId;

/// Composite key of the memory table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct TileKey {
    tileset: Arc<str>,
    tile: TileId,
}

impl TileKey {
    fn new(tileset: &str, tile: TileId) -> Self {
        Self {
            tileset: Arc::from(tileset),
            tile,
        }
    }
}

/// Process-local tile cache.
///
/// The first tier in a typical setup: fast, bounded, and lost on exit.
/// `reinit` is a no-op because there is no OS resource to reacquire.
pub struct MemoryCache {
    cache: MokaCache<TileKey, CacheItem>,
    max_cache_size: u64,
}

impl MemoryCache {
    /// Create a memory cache holding at most `max_cache_size` tiles.
    ///
    /// A capacity of zero produces a disabled cache that the caching source
    /// refuses to register.
    pub fn new(max_cache_size: u64) -> Self {
        let cache = MokaCache::builder()
            .max_capacity(max_cache_size)
            .eviction_policy(EvictionPolicy::lru())
            .build();

        Self {
            cache,
            max_cache_size,
        }
    }

    /// Total number of tiles across all tilesets.
    pub async fn total_count(&self) -> u64 {
        self.cache.run_pending_tasks().await;
        self.cache.entry_count()
    }
}

impl TileCache for MemoryCache {
    fn name(&self) -> &str {
        "memory"
    }

    fn get<'a>(
        &'a self,
        tileset: &'a str,
        tile: TileId,
    ) -> BoxFuture<'a, Result<Option<CacheItem>, CacheError>> {
        let key = TileKey::new(tileset, tile);
        Box::pin(async move { Ok(self.cache.get(&key).await) })
    }

    fn add<'a>(
        &'a self,
        tileset: &'a str,
        tile: TileId,
        item: CacheItem,
        force_insert: bool,
    ) -> BoxFuture<'a, Result<(), CacheError>> {
        let key = TileKey::new(tileset, tile);
        Box::pin(async move {
            if force_insert {
                self.cache.insert(key, item).await;
            } else {
                let entry = self.cache.entry(key).or_insert(item).await;
                if !entry.is_fresh() {
                    debug!(tileset, tile = %tile, "Memory cache kept existing tile");
                }
            }
            Ok(())
        })
    }

    fn clear(&self) -> BoxFuture<'_, Result<(), CacheError>> {
        Box::pin(async move {
            self.cache.invalidate_all();
            self.cache.run_pending_tasks().await;
            Ok(())
        })
    }

    fn reinit(&self) -> BoxFuture<'_, Result<(), CacheError>> {
        Box::pin(async move { Ok(()) })
    }

    fn tile_count<'a>(&'a self, tileset: &'a str) -> BoxFuture<'a, Result<u64, CacheError>> {
        Box::pin(async move {
            self.cache.run_pending_tasks().await;
            let count = self
                .cache
                .iter()
                .filter(|(key, _)| &*key.tileset == tileset)
                .count();
            Ok(count as u64)
        })
    }

    fn max_cache_size(&self) -> u64 {
        self.max_cache_size
    }

    fn dispose(&self) {
        self.cache.invalidate_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tile(x: u32) -> TileId {
        TileId::new(15, x, 12754)
    }

    #[tokio::test]
    async fn test_memory_cache_new() {
        let cache = MemoryCache::new(100);
        assert_eq!(cache.max_cache_size(), 100);
        assert_eq!(cache.total_count().await, 0);
    }

    #[tokio::test]
    async fn test_memory_cache_add_and_get() {
        let cache = MemoryCache::new(100);
        let item = CacheItem::new(vec![1, 2, 3]).with_etag(Some("\"v1\""));

        cache.add("streets", tile(1), item.clone(), true).await.unwrap();

        let found = cache.get("streets", tile(1)).await.unwrap();
        assert_eq!(found, Some(item));
    }

    #[tokio::test]
    async fn test_memory_cache_miss() {
        let cache = MemoryCache::new(100);
        assert!(cache.get("streets", tile(1)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_memory_cache_tilesets_are_separate_keys() {
        let cache = MemoryCache::new(100);
        cache
            .add("streets", tile(1), CacheItem::new(vec![1]), true)
            .await
            .unwrap();

        assert!(cache.get("satellite", tile(1)).await.unwrap().is_none());
        assert_eq!(cache.tile_count("streets").await.unwrap(), 1);
        assert_eq!(cache.tile_count("satellite").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_memory_cache_no_overwrite_without_force() {
        let cache = MemoryCache::new(100);
        cache
            .add("streets", tile(1), CacheItem::new(vec![1, 1]), false)
            .await
            .unwrap();
        cache
            .add("streets", tile(1), CacheItem::new(vec![2, 2]), false)
            .await
            .unwrap();

        let found = cache.get("streets", tile(1)).await.unwrap().unwrap();
        assert_eq!(found.data.as_ref(), &[1, 1]);
        assert_eq!(cache.tile_count("streets").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_memory_cache_forced_overwrite() {
        let cache = MemoryCache::new(100);
        cache
            .add("streets", tile(1), CacheItem::new(vec![1, 1]), true)
            .await
            .unwrap();
        cache
            .add(
                "streets",
                tile(1),
                CacheItem::new(vec![2, 2]).with_etag(Some("\"v2\"")),
                true,
            )
            .await
            .unwrap();

        let found = cache.get("streets", tile(1)).await.unwrap().unwrap();
        assert_eq!(found.data.as_ref(), &[2, 2]);
        assert_eq!(found.etag.as_deref(), Some("\"v2\""));
        assert_eq!(cache.tile_count("streets").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_memory_cache_clear() {
        let cache = MemoryCache::new(100);
        for x in 0..5 {
            cache
                .add("streets", tile(x), CacheItem::new(vec![x as u8]), true)
                .await
                .unwrap();
        }

        cache.clear().await.unwrap();
        cache.reinit().await.unwrap();

        assert_eq!(cache.tile_count("streets").await.unwrap(), 0);

        cache
            .add("streets", tile(9), CacheItem::new(vec![9]), true)
            .await
            .unwrap();
        assert_eq!(cache.tile_count("streets").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_memory_cache_bounded() {
        let cache = MemoryCache::new(10);
        for x in 0..50 {
            cache
                .add("streets", tile(x), CacheItem::new(vec![0u8; 8]), true)
                .await
                .unwrap();
        }

        assert!(cache.total_count().await <= 10);
    }

    #[tokio::test]
    async fn test_memory_cache_dispose_is_idempotent() {
        let cache = MemoryCache::new(10);
        cache.dispose();
        cache.dispose();
        assert_eq!(cache.total_count().await, 0);
    }

    #[tokio::test]
    async fn test_memory_cache_concurrent_access() {
        let cache = Arc::new(MemoryCache::new(10_000));
        let mut handles = Vec::new();

        for i in 0..50u32 {
            let cache = Arc::clone(&cache);
            handles.push(tokio::spawn(async move {
                let item = CacheItem::new(vec![i as u8; 100]);
                cache.add("streets", tile(i), item.clone(), true).await.unwrap();
                let found = cache.get("streets", tile(i)).await.unwrap();
                assert_eq!(found, Some(item));
            }));
        }

        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(cache.tile_count("streets").await.unwrap(), 50);
    }
}
