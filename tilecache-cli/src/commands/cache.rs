//! Cache management CLI commands.

use clap::Subcommand;
use tilecache::cache::TileCache;
use tilecache::config::ConfigFile;

use super::common::{open_disk_cache, runtime};
use crate::error::CliError;

/// Cache action subcommands.
#[derive(Debug, Subcommand)]
pub enum CacheAction {
    /// Delete the disk cache database
    Clear,
    /// Show disk cache statistics
    Stats {
        /// Also count the tiles of these tilesets
        #[arg(long = "tileset")]
        tilesets: Vec<String>,
    },
}

/// Run a cache subcommand.
pub fn run(action: CacheAction) -> Result<(), CliError> {
    let config = ConfigFile::load()?;
    let path = config.database_path();

    match action {
        CacheAction::Clear => {
            println!("Clearing disk cache at: {}", path.display());
            let cache = open_disk_cache(&config)?;
            runtime()?.block_on(cache.clear())?;
            println!("Disk cache cleared");
            Ok(())
        }
        CacheAction::Stats { tilesets } => {
            println!("Disk cache: {}", path.display());
            if !path.exists() {
                println!("  (not created yet)");
                return Ok(());
            }

            let cache = open_disk_cache(&config)?;
            println!("  Tiles:       {}", cache.total_count());
            println!("  Capacity:    {}", cache.max_cache_size());
            println!("  Prune delta: {}", cache.prune_cache_delta());

            let rt = runtime()?;
            for tileset in &tilesets {
                let count = rt.block_on(cache.tile_count(tileset))?;
                println!("  {}: {}", tileset, count);
            }
            Ok(())
        }
    }
}
