//! Fetch-or-serve coordination in front of the tile origin.
//!
//! [`CachingTileSource`] is the single entry point: it serves hits from the
//! registered backends, revalidates them with HEAD requests, and fans fresh
//! network results out to every backend.

mod error;
mod handle;
mod source;
mod stats;
mod url;

pub use error::FetchError;
pub use handle::RequestHandle;
pub use source::{CachingTileSource, SourceConfig, DEFAULT_REQUEST_TIMEOUT_SECS};
pub use stats::{FetchStats, FetchStatsSnapshot};
pub use url::{tile_url, Credentials, ACCESS_TOKEN_PARAM, SKU_PARAM};
