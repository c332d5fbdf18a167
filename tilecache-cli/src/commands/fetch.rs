//! Single-tile fetch through the cache stack.

use std::path::PathBuf;

use clap::Args;
use tilecache::config::ConfigFile;
use tilecache::coord::{to_tile_id, TileId};
use tilecache::fetch::tile_url;
use tokio::sync::oneshot;
use tracing::info;

use super::common::{build_source, resolve_url_template, runtime};
use crate::error::CliError;

/// Arguments for `tilecache fetch`.
#[derive(Debug, Args)]
pub struct FetchArgs {
    /// Tileset id, e.g. mapbox.mapbox-streets-v8
    #[arg(long)]
    pub tileset: String,

    /// Tile as z/x/y
    #[arg(long, value_parser = parse_tile, conflicts_with_all = ["lat", "lon"])]
    pub tile: Option<TileId>,

    /// Latitude in decimal degrees
    #[arg(long, requires = "lon", allow_hyphen_values = true)]
    pub lat: Option<f64>,

    /// Longitude in decimal degrees
    #[arg(long, requires = "lat", allow_hyphen_values = true)]
    pub lon: Option<f64>,

    /// Zoom level used with --lat/--lon
    #[arg(long, default_value = "14")]
    pub zoom: u8,

    /// URL template with {tileset}, {z}, {x} and {y} placeholders
    #[arg(long)]
    pub url_template: Option<String>,

    /// Write the tile body to this file
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

/// Parse a `z/x/y` tile argument.
pub fn parse_tile(value: &str) -> Result<TileId, String> {
    let parts: Vec<&str> = value.split('/').collect();
    let [z, x, y] = parts.as_slice() else {
        return Err(format!("expected z/x/y, got '{}'", value));
    };

    let zoom = z.parse::<u8>().map_err(|e| format!("zoom '{}': {}", z, e))?;
    let x = x.parse::<u32>().map_err(|e| format!("x '{}': {}", x, e))?;
    let y = y.parse::<u32>().map_err(|e| format!("y '{}': {}", y, e))?;

    let tile = TileId::new(zoom, x, y);
    if !tile.is_valid() {
        return Err(format!("{} is outside the tile grid", tile));
    }
    Ok(tile)
}

fn resolve_tile(args: &FetchArgs) -> Result<TileId, CliError> {
    match (args.tile, args.lat, args.lon) {
        (Some(tile), _, _) => Ok(tile),
        (None, Some(lat), Some(lon)) => {
            to_tile_id(lat, lon, args.zoom).map_err(|e| CliError::InvalidTile(e.to_string()))
        }
        _ => Err(CliError::InvalidTile(
            "provide either --tile z/x/y or --lat and --lon".to_string(),
        )),
    }
}

/// Run the fetch command.
pub fn run(args: FetchArgs) -> Result<(), CliError> {
    let config = ConfigFile::load()?;
    let tile = resolve_tile(&args)?;
    let template = resolve_url_template(args.url_template.clone());
    let url = tile_url(&template, &args.tileset, &tile);

    let response = runtime()?.block_on(async {
        let source = build_source(&config)?;
        let (tx, rx) = oneshot::channel();
        let handle = source
            .request(
                &url,
                move |response| {
                    let _ = tx.send(response);
                },
                config.request_timeout(),
                tile,
                &args.tileset,
            )
            .await?;
        handle.wait().await;

        info!(stats = %source.stats(), "Fetch complete");
        rx.await
            .map_err(|_| CliError::Runtime("request finished without a response".to_string()))
    })?;

    if let Some(error) = &response.error {
        return Err(CliError::Transport(error.clone()));
    }

    let data = response.data.clone().unwrap_or_default();
    let origin = if response.is_from_cache() {
        "cache"
    } else {
        "network"
    };
    println!("Tile {} ({}): {} bytes from {}", tile, args.tileset, data.len(), origin);
    if let Some(etag) = response.etag() {
        println!("  ETag: {}", etag);
    }

    if let Some(path) = args.output {
        std::fs::write(&path, &data).map_err(|error| CliError::FileWrite {
            path: path.display().to_string(),
            error,
        })?;
        println!("  Saved to {}", path.display());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tile() {
        assert_eq!(parse_tile("14/4823/6160").unwrap(), TileId::new(14, 4823, 6160));
    }

    #[test]
    fn test_parse_tile_rejects_bad_input() {
        assert!(parse_tile("14/4823").is_err());
        assert!(parse_tile("a/b/c").is_err());
        assert!(parse_tile("1/2/0").is_err());
    }
}
