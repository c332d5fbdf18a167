//! Configuration management CLI commands.
//!
//! Provides `config init`, `config show`, and `config path`.

use clap::Subcommand;
use tilecache::config::{config_file_path, ConfigFile};

use crate::error::CliError;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Write a default configuration file if none exists
    Init,

    /// Show the effective configuration
    Show,

    /// Show the configuration file path
    Path,
}

/// Run a config subcommand.
pub fn run(command: ConfigCommands) -> Result<(), CliError> {
    match command {
        ConfigCommands::Init => run_init(),
        ConfigCommands::Show => run_show(),
        ConfigCommands::Path => run_path(),
    }
}

fn run_init() -> Result<(), CliError> {
    let existed = config_file_path().exists();
    let path = ConfigFile::ensure_exists()?;
    if existed {
        println!("Configuration already exists at {}", path.display());
    } else {
        println!("Created {}", path.display());
    }
    Ok(())
}

/// Print settings with tokens masked.
fn run_show() -> Result<(), CliError> {
    let config = ConfigFile::load()?;

    println!("[cache]");
    println!("  directory    = {}", config.cache.directory.display());
    println!("  database     = {}", config.cache.database);
    println!("  memory_tiles = {}", config.cache.memory_tiles);
    println!("  disk_tiles   = {}", config.cache.disk_tiles);
    println!("  prune_delta  = {}", config.cache.prune_delta);
    println!("  auto_refresh = {}", config.cache.auto_refresh);
    println!();
    println!("[credentials]");
    println!("  access_token = {}", mask(config.credentials.access_token.as_deref()));
    println!("  sku_token    = {}", mask(config.credentials.sku_token.as_deref()));
    println!();
    println!("[network]");
    println!("  timeout      = {}", config.network.timeout);

    Ok(())
}

fn run_path() -> Result<(), CliError> {
    println!("{}", config_file_path().display());
    Ok(())
}

fn mask(value: Option<&str>) -> String {
    match value {
        None => "(not set)".to_string(),
        Some(v) if v.len() <= 4 => "****".to_string(),
        Some(v) => format!("{}****", v.chars().take(4).collect::<String>()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask() {
        assert_eq!(mask(None), "(not set)");
        assert_eq!(mask(Some("abc")), "****");
        assert_eq!(mask(Some("pk.eyJ1Ijoi")), "pk.e****");
    }
}
