//! Common types and utilities shared across CLI commands.

use std::sync::Arc;

use tilecache::cache::{MemoryCache, SqliteCache};
use tilecache::config::ConfigFile;
use tilecache::fetch::CachingTileSource;
use tilecache::transport::ReqwestTransport;
use tokio::runtime::Runtime;

use crate::error::CliError;

/// Default URL template when neither the CLI nor the environment provides one.
pub const DEFAULT_URL_TEMPLATE: &str = "https://api.mapbox.com/v4/{tileset}/{z}/{x}/{y}.vector.pbf";

/// Environment variable overriding the tile URL template.
pub const URL_TEMPLATE_ENV: &str = "TILECACHE_URL_TEMPLATE";

/// Create the multi-threaded runtime used by async commands.
pub fn runtime() -> Result<Runtime, CliError> {
    Runtime::new().map_err(|e| CliError::Runtime(e.to_string()))
}

/// Resolve the URL template: CLI first, then environment, then default.
pub fn resolve_url_template(cli_template: Option<String>) -> String {
    cli_template
        .or_else(|| std::env::var(URL_TEMPLATE_ENV).ok())
        .unwrap_or_else(|| DEFAULT_URL_TEMPLATE.to_string())
}

/// Open the disk cache described by the config.
pub fn open_disk_cache(config: &ConfigFile) -> Result<SqliteCache, CliError> {
    Ok(SqliteCache::open(
        config.database_path(),
        config.cache.disk_tiles,
        config.cache.prune_delta,
    )?)
}

/// Build a caching source with the memory and disk tiers from the config.
///
/// Must be called inside a Tokio runtime.
pub fn build_source(config: &ConfigFile) -> Result<CachingTileSource<ReqwestTransport>, CliError> {
    let transport = ReqwestTransport::with_timeout(config.network.timeout)
        .map_err(|e| CliError::Config(format!("Failed to create HTTP client: {}", e)))?;

    let mut source = CachingTileSource::new(transport, config.source_config());
    source.add_cache(Arc::new(MemoryCache::new(config.cache.memory_tiles)));
    if config.cache.disk_tiles > 0 {
        source.add_cache(Arc::new(open_disk_cache(config)?));
    }

    if config.credentials.access_token.is_none() {
        tracing::warn!("No access_token configured; the tile server may reject requests");
    }

    Ok(source)
}
