//! Default values and constants for all configuration settings.

use std::path::PathBuf;

use super::settings::*;
use crate::cache::{DEFAULT_DISK_CACHE_SIZE, DEFAULT_MEMORY_CACHE_SIZE, DEFAULT_PRUNE_CACHE_DELTA};
use crate::fetch::DEFAULT_REQUEST_TIMEOUT_SECS;

/// Default database name inside the cache directory.
pub const DEFAULT_DATABASE_NAME: &str = "tiles.db";

/// Longest request timeout accepted from the config file.
pub const MAX_TIMEOUT_SECS: u64 = 300;

/// Default cache directory (~/.tilecache/cache).
pub fn default_cache_dir() -> PathBuf {
    super::file::config_directory().join("cache")
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            directory: default_cache_dir(),
            database: DEFAULT_DATABASE_NAME.to_string(),
            memory_tiles: DEFAULT_MEMORY_CACHE_SIZE,
            disk_tiles: DEFAULT_DISK_CACHE_SIZE,
            prune_delta: DEFAULT_PRUNE_CACHE_DELTA,
            auto_refresh: true,
        }
    }
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}
