//! Warm the cache for every tile in a bounding box.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use clap::Args;
use tilecache::config::ConfigFile;
use tilecache::coord::{bbox_tile_count, tiles_in_bbox, BoundingBox, TileId};
use tilecache::fetch::{tile_url, FetchStatsSnapshot};
use tracing::{info, warn};

use super::common::{build_source, resolve_url_template, runtime};
use crate::error::CliError;

/// Refuse to queue more than this many tiles in one run.
const MAX_SEED_TILES: u64 = 10_000;

/// Arguments for `tilecache seed`.
#[derive(Debug, Args)]
pub struct SeedArgs {
    /// Tileset id, e.g. mapbox.mapbox-streets-v8
    #[arg(long)]
    pub tileset: String,

    /// Southern edge in decimal degrees
    #[arg(long, allow_hyphen_values = true)]
    pub south: f64,

    /// Western edge in decimal degrees
    #[arg(long, allow_hyphen_values = true)]
    pub west: f64,

    /// Northern edge in decimal degrees
    #[arg(long, allow_hyphen_values = true)]
    pub north: f64,

    /// Eastern edge in decimal degrees
    #[arg(long, allow_hyphen_values = true)]
    pub east: f64,

    /// Zoom level
    #[arg(long, default_value = "14")]
    pub zoom: u8,

    /// URL template with {tileset}, {z}, {x} and {y} placeholders
    #[arg(long)]
    pub url_template: Option<String>,
}

/// Run the seed command.
pub fn run(args: SeedArgs) -> Result<(), CliError> {
    let config = ConfigFile::load()?;
    let bbox = BoundingBox::new(args.south, args.west, args.north, args.east);
    let tiles = plan_tiles(&bbox, args.zoom)?;
    let template = resolve_url_template(args.url_template.clone());

    println!(
        "Seeding {} tiles of {} at zoom {}",
        tiles.len(),
        args.tileset,
        args.zoom
    );

    let (stats, failed) = runtime()?.block_on(async {
        let source = build_source(&config)?;
        let failed = Arc::new(AtomicU64::new(0));

        let mut handles = Vec::with_capacity(tiles.len());
        for tile in &tiles {
            let url = tile_url(&template, &args.tileset, tile);
            let tile = *tile;
            let failed = Arc::clone(&failed);
            let handle = source
                .request(
                    &url,
                    move |response| {
                        if let Some(error) = response.error {
                            failed.fetch_add(1, Ordering::Relaxed);
                            warn!(tile = %tile, error = %error, "Tile fetch failed");
                        }
                    },
                    config.request_timeout(),
                    tile,
                    &args.tileset,
                )
                .await?;
            handles.push(handle);
        }
        for handle in handles {
            handle.wait().await;
        }

        Ok::<_, CliError>((source.stats(), failed.load(Ordering::Relaxed)))
    })?;

    info!(stats = %stats, "Seed complete");
    println!("{}", summary(&stats, failed));
    Ok(())
}

/// Tiles covering the area, refusing oversized requests before they are built.
fn plan_tiles(bbox: &BoundingBox, zoom: u8) -> Result<Vec<TileId>, CliError> {
    let count = bbox_tile_count(bbox, zoom).map_err(|e| CliError::InvalidTile(e.to_string()))?;
    if count > MAX_SEED_TILES {
        return Err(CliError::InvalidTile(format!(
            "{} tiles requested, limit is {}; use a smaller area or zoom",
            count, MAX_SEED_TILES
        )));
    }
    tiles_in_bbox(bbox, zoom).map_err(|e| CliError::InvalidTile(e.to_string()))
}

/// Final report line. `failed` counts only the callbacks that saw an error;
/// background revalidation failures stay in the fetch stats.
fn summary(stats: &FetchStatsSnapshot, failed: u64) -> String {
    format!(
        "Done: {} already cached, {} fetched, {} failed",
        stats.cache_hits,
        stats.cache_misses.saturating_sub(failed),
        failed
    )
}
