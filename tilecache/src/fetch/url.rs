//! URL construction: template expansion and credential query parameters.

use std::fmt;

use reqwest::Url;

use super::error::FetchError;
use crate::coord::TileId;

/// Query parameter carrying the access token.
pub const ACCESS_TOKEN_PARAM: &str = "access_token";

/// Query parameter carrying the SKU token.
pub const SKU_PARAM: &str = "sku";

/// Credentials appended to every origin request.
///
/// Captured by value when the caching source is built; there is no global
/// token state. Empty tokens are not sent.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    access_token: String,
    sku_token: String,
}

impl Credentials {
    pub fn new(access_token: impl Into<String>, sku_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            sku_token: sku_token.into(),
        }
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn sku_token(&self) -> &str {
        &self.sku_token
    }

    /// Append the token parameters to `url`.
    ///
    /// Existing query parameters are preserved.
    pub fn authorize(&self, url: &str) -> Result<String, FetchError> {
        let mut parsed = Url::parse(url).map_err(|e| FetchError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        {
            let mut query = parsed.query_pairs_mut();
            if !self.access_token.is_empty() {
                query.append_pair(ACCESS_TOKEN_PARAM, &self.access_token);
            }
            if !self.sku_token.is_empty() {
                query.append_pair(SKU_PARAM, &self.sku_token);
            }
        }

        // An empty serializer still leaves a dangling '?'
        if parsed.query() == Some("") {
            parsed.set_query(None);
        }

        Ok(parsed.into())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn redact(token: &str) -> &'static str {
            if token.is_empty() {
                "<unset>"
            } else {
                "<redacted>"
            }
        }
        f.debug_struct("Credentials")
            .field("access_token", &redact(&self.access_token))
            .field("sku_token", &redact(&self.sku_token))
            .finish()
    }
}

/// Expand a tile URL template.
///
/// Recognised placeholders: `{tileset}`, `{z}`, `{x}`, `{y}`.
///
/// ```
/// use tilecache::coord::TileId;
/// use tilecache::fetch::tile_url;
///
/// let url = tile_url(
///     "https://tiles.example.com/v4/{tileset}/{z}/{x}/{y}.vector.pbf",
///     "mapbox.streets",
///     &TileId::new(14, 8185, 5449),
/// );
/// assert_eq!(url, "https://tiles.example.com/v4/mapbox.streets/14/8185/5449.vector.pbf");
/// ```
pub fn tile_url(template: &str, tileset: &str, tile: &TileId) -> String {
    template
        .replace("{tileset}", tileset)
        .replace("{z}", &tile.zoom.to_string())
        .replace("{x}", &tile.x.to_string())
        .replace("{y}", &tile.y.to_string())
}
