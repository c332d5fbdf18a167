//! TileCache - layered caching for slippy map tiles
//!
//! This library sits between a map renderer and an HTTP tile origin. Tiles are
//! served from a stack of cache backends (memory, then SQLite on disk) and
//! fetched from the network only on a miss. Cached tiles are revalidated in
//! the background with ETag-based HEAD requests.
//!
//! # High-Level API
//!
//! ```ignore
//! use std::sync::Arc;
//! use tilecache::cache::{MemoryCache, SqliteCache};
//! use tilecache::config::ConfigFile;
//! use tilecache::coord::TileId;
//! use tilecache::fetch::{tile_url, CachingTileSource};
//! use tilecache::transport::ReqwestTransport;
//!
//! let config = ConfigFile::load()?;
//! let mut source = CachingTileSource::new(ReqwestTransport::new()?, config.source_config());
//! source
//!     .add_cache(Arc::new(MemoryCache::new(config.cache.memory_tiles)))
//!     .add_cache(Arc::new(SqliteCache::open(
//!         config.database_path(),
//!         config.cache.disk_tiles,
//!         config.cache.prune_delta,
//!     )?));
//!
//! let tile = TileId::new(14, 4823, 6160);
//! let url = tile_url("https://tiles.example.com/{tileset}/{z}/{x}/{y}.pbf", "streets", &tile);
//! let handle = source
//!     .request(&url, |response| println!("{:?}", response.status), config.request_timeout(), tile, "streets")
//!     .await?;
//! handle.wait().await;
//! ```

pub mod cache;
pub mod config;
pub mod coord;
pub mod fetch;
pub mod logging;
pub mod transport;
