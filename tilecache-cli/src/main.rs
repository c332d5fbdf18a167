//! TileCache CLI - Command-line interface
//!
//! Fetches map tiles through the layered cache and manages the on-disk store.

mod commands;
mod error;

use clap::{Parser, Subcommand};
use tilecache::logging::{default_log_dir, default_log_file, init_logging};

use commands::cache::CacheAction;
use commands::config::ConfigCommands;
use commands::fetch::FetchArgs;
use commands::seed::SeedArgs;
use error::CliError;

#[derive(Parser)]
#[command(name = "tilecache")]
#[command(about = "Layered map tile cache with ETag revalidation", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch one tile, serving it from cache when possible
    Fetch(FetchArgs),

    /// Fetch every tile in a bounding box into the cache
    Seed(SeedArgs),

    /// Manage the disk cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

fn main() {
    let cli = Cli::parse();

    let _logging_guard = match init_logging(&default_log_dir(), default_log_file()) {
        Ok(guard) => guard,
        Err(e) => CliError::LoggingInit(e.to_string()).exit(),
    };

    let result = match cli.command {
        Commands::Fetch(args) => commands::fetch::run(args),
        Commands::Seed(args) => commands::seed::run(args),
        Commands::Cache { action } => commands::cache::run(action),
        Commands::Config { command } => commands::config::run(command),
    };

    if let Err(e) = result {
        e.exit();
    }
}
