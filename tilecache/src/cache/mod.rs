//! Tile cache backends.
//!
//! Each backend implements [`TileCache`] and owns its own locking. The
//! caching source stacks them in registration order, fastest first.
//!
//! # Available Backends
//!
//! - [`MemoryCache`]: volatile, bounded by tile count (moka)
//! - [`SqliteCache`]: persistent single-file store with FIFO pruning
//!
//! ```ignore
//! use tilecache::cache::{MemoryCache, SqliteCache};
//!
//! let memory = MemoryCache::new(500);
//! let disk = SqliteCache::open_in(&cache_dir, "tiles", 3000, 20)?;
//! ```

mod item;
mod memory;
mod sqlite;
mod traits;

pub use item::CacheItem;
pub use memory::MemoryCache;
pub use sqlite::{SqliteCache, DEFAULT_DISK_CACHE_SIZE, DEFAULT_PRUNE_CACHE_DELTA};
pub use traits::{BoxFuture, CacheError, TileCache};

/// Default number of tiles kept in memory.
pub const DEFAULT_MEMORY_CACHE_SIZE: u64 = 500;
