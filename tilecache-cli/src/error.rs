//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use std::fmt;
use std::process;

use tilecache::cache::CacheError;
use tilecache::config::ConfigFileError;
use tilecache::fetch::FetchError;
use tilecache::transport::TransportError;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Configuration error
    Config(String),
    /// Configuration file could not be read or written
    ConfigFile(ConfigFileError),
    /// Failed to start the async runtime
    Runtime(String),
    /// Tile coordinates could not be resolved
    InvalidTile(String),
    /// Cache backend failure
    Cache(CacheError),
    /// Request was rejected before reaching the network
    Request(FetchError),
    /// Origin returned an error
    Transport(TransportError),
    /// Failed to write output file
    FileWrite { path: String, error: std::io::Error },
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        match self {
            CliError::Transport(TransportError::Status(401 | 403)) => {
                eprintln!();
                eprintln!("The tile server rejected the credentials. Check that:");
                eprintln!("  1. access_token is set in ~/.tilecache/config.ini");
                eprintln!("  2. The token is allowed to read the requested tileset");
            }
            CliError::Cache(CacheError::Sqlite(_)) => {
                eprintln!();
                eprintln!("The disk cache may be corrupt. Remove it with: tilecache cache clear");
            }
            _ => {}
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::ConfigFile(e) => write!(f, "{}", e),
            CliError::Runtime(msg) => write!(f, "Failed to start async runtime: {}", msg),
            CliError::InvalidTile(msg) => write!(f, "Invalid tile: {}", msg),
            CliError::Cache(e) => write!(f, "Cache error: {}", e),
            CliError::Request(e) => write!(f, "Request rejected: {}", e),
            CliError::Transport(e) => write!(f, "Failed to fetch tile: {}", e),
            CliError::FileWrite { path, error } => {
                write!(f, "Failed to write file '{}': {}", path, error)
            }
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::ConfigFile(e) => Some(e),
            CliError::Cache(e) => Some(e),
            CliError::Request(e) => Some(e),
            CliError::Transport(e) => Some(e),
            CliError::FileWrite { error, .. } => Some(error),
            _ => None,
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::ConfigFile(e)
    }
}

impl From<CacheError> for CliError {
    fn from(e: CacheError) -> Self {
        CliError::Cache(e)
    }
}

impl From<FetchError> for CliError {
    fn from(e: FetchError) -> Self {
        CliError::Request(e)
    }
}
