//! User configuration stored as an INI file.
//!
//! # Example
//!
//! ```no_run
//! use tilecache::config::ConfigFile;
//!
//! let config = ConfigFile::load().unwrap_or_default();
//! let source_config = config.source_config();
//! println!("cache database: {}", config.database_path().display());
//! ```

mod defaults;
mod file;
mod parser;
mod settings;
mod writer;

pub use defaults::{default_cache_dir, DEFAULT_DATABASE_NAME, MAX_TIMEOUT_SECS};
pub use file::{config_directory, config_file_path, ConfigFileError};
pub use settings::{CacheSettings, ConfigFile, CredentialSettings, NetworkSettings};
