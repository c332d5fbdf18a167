//! Core trait for tile cache backends.
//!
//! The `TileCache` trait is the contract every storage tier satisfies. The
//! caching source holds an ordered list of `Arc<dyn TileCache>` and consults
//! them front to back.
//!
//! # Design Principles
//!
//! - **Composite keys**: every entry is addressed by `(tileset, TileId)`
//! - **Local only**: no method ever touches the network
//! - **Self-contained locking**: each backend owns its concurrency discipline
//! - **Dyn-compatible**: uses `Pin<Box<dyn Future>>` for trait object support

use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

use super::item::CacheItem;
use crate::coord::TileId;

/// Errors that can occur during cache operations.
#[derive(Debug, Error)]
pub enum CacheError {
    /// SQLite failure in the disk backend.
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// I/O error during cache operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Blocking task panicked or was cancelled.
    #[error("Cache task failed: {0}")]
    Task(String),
}

/// Boxed future type for dyn-compatible async methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A storage tier for tiles.
///
/// # Insertion policy
///
/// `add` with `force_insert == false` never disturbs an existing entry. With
/// `force_insert == true` the entry is replaced unconditionally, including its
/// validators and timestamp.
///
/// # Lifecycle
///
/// `clear` removes every entry. Disk-backed stores additionally release their
/// file on `clear` and need `reinit` before accepting writes again; until then
/// lookups report "not found" rather than failing. `dispose` releases OS
/// resources and may be called any number of times.
pub trait TileCache: Send + Sync {
    /// Short backend name used in logs.
    fn name(&self) -> &str;

    /// Look up a tile. A miss is `Ok(None)`.
    fn get<'a>(
        &'a self,
        tileset: &'a str,
        tile: TileId,
    ) -> BoxFuture<'a, Result<Option<CacheItem>, CacheError>>;

    /// Store a tile, replacing an existing one only when `force_insert` is set.
    fn add<'a>(
        &'a self,
        tileset: &'a str,
        tile: TileId,
        item: CacheItem,
        force_insert: bool,
    ) -> BoxFuture<'a, Result<(), CacheError>>;

    /// Remove every entry.
    fn clear(&self) -> BoxFuture<'_, Result<(), CacheError>>;

    /// Re-establish held resources after `clear`. Idempotent.
    fn reinit(&self) -> BoxFuture<'_, Result<(), CacheError>>;

    /// Number of entries stored for one tileset.
    fn tile_count<'a>(&'a self, tileset: &'a str) -> BoxFuture<'a, Result<u64, CacheError>>;

    /// Configured capacity in tiles. Zero means the backend is disabled.
    fn max_cache_size(&self) -> u64;

    /// Release OS resources. Safe to call repeatedly.
    fn dispose(&self);
}
