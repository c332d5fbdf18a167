//! CLI command implementations.
//!
//! Each subcommand has its own module with argument definitions and handlers.
//!
//! # Command Modules
//!
//! - [`cache`] - Disk cache management (clear, stats)
//! - [`config`] - Configuration management (init, show, path)
//! - [`fetch`] - Single tile fetch through the cache
//! - [`seed`] - Cache warm-up for a bounding box

pub mod cache;
pub mod common;
pub mod config;
pub mod fetch;
pub mod seed;
