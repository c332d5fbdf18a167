//! INI parsing logic for converting `Ini` → `ConfigFile`.
//!
//! Starts from the defaults and overlays whatever the file sets. This is the
//! single place where INI key names are mapped to struct fields.

use std::path::PathBuf;

use ini::Ini;

use super::defaults::MAX_TIMEOUT_SECS;
use super::file::ConfigFileError;
use super::settings::ConfigFile;

/// Parse an `Ini` object into a `ConfigFile`.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [cache] section
    if let Some(section) = ini.section(Some("cache")) {
        if let Some(v) = section.get("directory") {
            let v = v.trim();
            if !v.is_empty() {
                config.cache.directory = expand_tilde(v);
            }
        }
        if let Some(v) = section.get("database") {
            let v = v.trim();
            if v.is_empty() || v.contains(['/', '\\']) {
                return Err(invalid(
                    "cache",
                    "database",
                    v,
                    "must be a plain file name such as 'tiles.db'",
                ));
            }
            config.cache.database = v.to_string();
        }
        if let Some(v) = section.get("memory_tiles") {
            config.cache.memory_tiles = parse_count("cache", "memory_tiles", v)?;
        }
        if let Some(v) = section.get("disk_tiles") {
            config.cache.disk_tiles = parse_count("cache", "disk_tiles", v)?;
        }
        if let Some(v) = section.get("prune_delta") {
            config.cache.prune_delta = parse_count("cache", "prune_delta", v)?;
        }
        if let Some(v) = section.get("auto_refresh") {
            config.cache.auto_refresh = parse_bool(v);
        }
    }

    // [credentials] section
    if let Some(section) = ini.section(Some("credentials")) {
        if let Some(v) = section.get("access_token") {
            let v = v.trim();
            if !v.is_empty() {
                config.credentials.access_token = Some(v.to_string());
            }
        }
        if let Some(v) = section.get("sku_token") {
            let v = v.trim();
            if !v.is_empty() {
                config.credentials.sku_token = Some(v.to_string());
            }
        }
    }

    // [network] section
    if let Some(section) = ini.section(Some("network")) {
        if let Some(v) = section.get("timeout") {
            let timeout = parse_count("network", "timeout", v)?;
            if timeout == 0 || timeout > MAX_TIMEOUT_SECS {
                return Err(invalid(
                    "network",
                    "timeout",
                    v,
                    &format!("must be between 1 and {} seconds", MAX_TIMEOUT_SECS),
                ));
            }
            config.network.timeout = timeout;
        }
    }

    Ok(config)
}

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_count(section: &str, key: &str, value: &str) -> Result<u64, ConfigFileError> {
    value
        .trim()
        .parse::<u64>()
        .map_err(|_| invalid(section, key, value, "expected a non-negative whole number"))
}

/// Parse a boolean value leniently.
pub(super) fn parse_bool(value: &str) -> bool {
    let v = value.trim().to_lowercase();
    v == "true" || v == "1" || v == "yes" || v == "on"
}

/// Expand ~ to home directory in paths.
pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{DEFAULT_DISK_CACHE_SIZE, DEFAULT_PRUNE_CACHE_DELTA};

    fn parse(content: &str) -> Result<ConfigFile, ConfigFileError> {
        let ini = Ini::load_from_str(content).unwrap();
        parse_ini(&ini)
    }

    #[test]
    fn test_empty_file_yields_defaults() {
        let config = parse("").unwrap();
        assert_eq!(config, ConfigFile::default());
    }

    #[test]
    fn test_cache_section() {
        let config = parse(
            "[cache]\ndirectory = /var/tiles\ndatabase = maps.db\nmemory_tiles = 0\ndisk_tiles = 100\nprune_delta = 5\nauto_refresh = off\n",
        )
        .unwrap();

        assert_eq!(config.cache.directory, PathBuf::from("/var/tiles"));
        assert_eq!(config.cache.database, "maps.db");
        assert_eq!(config.cache.memory_tiles, 0);
        assert_eq!(config.cache.disk_tiles, 100);
        assert_eq!(config.cache.prune_delta, 5);
        assert!(!config.cache.auto_refresh);
    }

    #[test]
    fn test_partial_cache_section_keeps_defaults() {
        let config = parse("[cache]\nmemory_tiles = 42\n").unwrap();
        assert_eq!(config.cache.memory_tiles, 42);
        assert_eq!(config.cache.disk_tiles, DEFAULT_DISK_CACHE_SIZE);
        assert_eq!(config.cache.prune_delta, DEFAULT_PRUNE_CACHE_DELTA);
    }

    #[test]
    fn test_credentials_blank_values_are_none() {
        let config = parse("[credentials]\naccess_token = pk.abc\nsku_token =\n").unwrap();
        assert_eq!(config.credentials.access_token.as_deref(), Some("pk.abc"));
        assert!(config.credentials.sku_token.is_none());
    }

    #[test]
    fn test_invalid_count() {
        let err = parse("[cache]\ndisk_tiles = lots\n").unwrap_err();
        match err {
            ConfigFileError::InvalidValue { section, key, .. } => {
                assert_eq!(section, "cache");
                assert_eq!(key, "disk_tiles");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_database_must_be_file_name() {
        assert!(parse("[cache]\ndatabase = ../escape.db\n").is_err());
    }

    #[test]
    fn test_timeout_bounds() {
        assert!(parse("[network]\ntimeout = 0\n").is_err());
        assert!(parse("[network]\ntimeout = 301\n").is_err());
        assert_eq!(parse("[network]\ntimeout = 30\n").unwrap().network.timeout, 30);
    }

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("true"));
        assert!(parse_bool(" YES "));
        assert!(parse_bool("1"));
        assert!(!parse_bool("false"));
        assert!(!parse_bool("nope"));
    }
}
