//! Configuration settings structs.
//!
//! One struct per INI section. Defaults live in [`super::defaults`].

use std::path::PathBuf;

/// Parsed contents of `config.ini`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConfigFile {
    pub cache: CacheSettings,
    pub credentials: CredentialSettings,
    pub network: NetworkSettings,
}

/// `[cache]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheSettings {
    /// Directory holding the SQLite database.
    pub directory: PathBuf,
    /// Logical database name, resolved inside `directory`.
    pub database: String,
    /// Tiles kept in memory. Zero disables the memory tier.
    pub memory_tiles: u64,
    /// Tiles kept on disk. Zero disables the disk tier.
    pub disk_tiles: u64,
    /// Rows tolerated above `disk_tiles` before pruning.
    pub prune_delta: u64,
    /// Revalidate cache hits against the origin in the background.
    pub auto_refresh: bool,
}

/// `[credentials]` section.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CredentialSettings {
    pub access_token: Option<String>,
    pub sku_token: Option<String>,
}

/// `[network]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkSettings {
    /// Request timeout in seconds.
    pub timeout: u64,
}
