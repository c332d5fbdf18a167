//! INI serialization logic for converting `ConfigFile` → INI string.

use super::settings::ConfigFile;

/// Convert a `ConfigFile` to a commented INI string for saving.
pub(super) fn to_config_string(config: &ConfigFile) -> String {
    let access_token = config.credentials.access_token.as_deref().unwrap_or("");
    let sku_token = config.credentials.sku_token.as_deref().unwrap_or("");

    format!(
        r#"[cache]
; Directory holding the tile database
directory = {}
; Database file name inside the directory
database = {}
; Tiles kept in memory (0 disables the memory cache)
memory_tiles = {}
; Tiles kept on disk (0 disables the disk cache)
disk_tiles = {}
; Extra tiles allowed on disk before the oldest are pruned
prune_delta = {}
; Check cached tiles against the server in the background (true/false)
auto_refresh = {}

[credentials]
; Access token appended to every tile request
access_token = {}
; SKU token appended to every tile request
sku_token = {}

[network]
; Request timeout in seconds (1-300)
timeout = {}
"#,
        config.cache.directory.to_string_lossy(),
        config.cache.database,
        config.cache.memory_tiles,
        config.cache.disk_tiles,
        config.cache.prune_delta,
        config.cache.auto_refresh,
        access_token,
        sku_token,
        config.network.timeout,
    )
}
