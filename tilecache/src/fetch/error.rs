//! Errors raised synchronously by the caching source.
//!
//! Transport failures are not here: they travel to the caller inside the
//! `Response` handed to the callback.

use thiserror::Error;

/// Configuration errors that reject a request before any work starts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Tiles are cached per tileset, so an id is mandatory.
    #[error("A tileset id is required to cache tiles")]
    MissingTilesetId,

    /// The request URL could not be parsed.
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The source was disposed and no longer serves requests.
    #[error("Caching tile source has been disposed")]
    Disposed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_display() {
        assert_eq!(
            FetchError::MissingTilesetId.to_string(),
            "A tileset id is required to cache tiles"
        );

        let err = FetchError::InvalidUrl {
            url: "nope".to_string(),
            reason: "relative URL without a base".to_string(),
        };
        assert!(err.to_string().contains("nope"));
        assert!(err.to_string().contains("relative URL"));
    }
}
