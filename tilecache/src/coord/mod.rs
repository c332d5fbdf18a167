//! Coordinate conversion module
//!
//! Provides conversions between geographic coordinates (latitude/longitude)
//! and slippy map tile ids, plus enumeration of the tiles covering an area.

mod types;

pub use types::{
    BoundingBox, CoordError, TileId, MAX_LAT, MAX_LON, MAX_ZOOM, MIN_LAT, MIN_LON, MIN_ZOOM,
};

use std::f64::consts::PI;

/// Converts geographic coordinates to a tile id.
///
/// # Arguments
///
/// * `lat` - Latitude in degrees (-85.05112878 to 85.05112878)
/// * `lon` - Longitude in degrees (-180.0 to 180.0)
/// * `zoom` - Zoom level (0 to 22)
#[inline]
pub fn to_tile_id(lat: f64, lon: f64, zoom: u8) -> Result<TileId, CoordError> {
    if !(MIN_LAT..=MAX_LAT).contains(&lat) {
        return Err(CoordError::InvalidLatitude(lat));
    }
    if !(MIN_LON..=MAX_LON).contains(&lon) {
        return Err(CoordError::InvalidLongitude(lon));
    }
    if zoom > MAX_ZOOM {
        return Err(CoordError::InvalidZoom(zoom));
    }

    let n = 2.0_f64.powi(zoom as i32);
    let max_index = (n as u32).saturating_sub(1);

    // lon == 180.0 lands one past the last column
    let x = (((lon + 180.0) / 360.0 * n) as u32).min(max_index);

    let lat_rad = lat * PI / 180.0;
    let y = (((1.0 - lat_rad.tan().asinh() / PI) / 2.0 * n) as u32).min(max_index);

    Ok(TileId { zoom, x, y })
}

/// Converts a tile id back to geographic coordinates.
///
/// Returns the latitude/longitude of the tile's northwest corner.
#[inline]
pub fn tile_to_lat_lon(tile: &TileId) -> (f64, f64) {
    let n = 2.0_f64.powi(tile.zoom as i32);

    let lon = tile.x as f64 / n * 360.0 - 180.0;

    let y = tile.y as f64 / n;
    let lat_rad = (PI * (1.0 - 2.0 * y)).sinh().atan();
    let lat = lat_rad * 180.0 / PI;

    (lat, lon)
}

/// Largest tile list `tiles_in_bbox` will build.
pub const MAX_BBOX_TILES: u64 = 1 << 20;

/// North-west and south-east corner tiles of a bounding box.
fn bbox_corners(bbox: &BoundingBox, zoom: u8) -> Result<(TileId, TileId), CoordError> {
    if bbox.south > bbox.north || bbox.west > bbox.east {
        return Err(CoordError::InvalidBounds(*bbox));
    }

    let north_west = to_tile_id(bbox.north, bbox.west, zoom)?;
    let south_east = to_tile_id(bbox.south, bbox.east, zoom)?;
    Ok((north_west, south_east))
}

/// Number of tiles at `zoom` intersecting the bounding box, without
/// enumerating them.
pub fn bbox_tile_count(bbox: &BoundingBox, zoom: u8) -> Result<u64, CoordError> {
    let (north_west, south_east) = bbox_corners(bbox, zoom)?;
    let columns = u64::from(south_east.x - north_west.x) + 1;
    let rows = u64::from(south_east.y - north_west.y) + 1;
    // At most 2^22 per axis, so the product fits in u64
    Ok(columns * rows)
}

/// Enumerates every tile at `zoom` intersecting the bounding box.
///
/// Tiles are returned in row-major order (north to south, west to east).
/// Fails with [`CoordError::TooManyTiles`] above [`MAX_BBOX_TILES`].
pub fn tiles_in_bbox(bbox: &BoundingBox, zoom: u8) -> Result<Vec<TileId>, CoordError> {
    let count = bbox_tile_count(bbox, zoom)?;
    if count > MAX_BBOX_TILES {
        return Err(CoordError::TooManyTiles {
            count,
            limit: MAX_BBOX_TILES,
        });
    }
    let (north_west, south_east) = bbox_corners(bbox, zoom)?;

    let mut tiles = Vec::with_capacity(count as usize);
    for y in north_west.y..=south_east.y {
        for x in north_west.x..=south_east.x {
            tiles.push(TileId { zoom, x, y });
        }
    }

    Ok(tiles)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_york_city_at_zoom_16() {
        // New York City: 40.7128°N, 74.0060°W
        let tile = to_tile_id(40.7128, -74.0060, 16).unwrap();
        assert_eq!(tile.x, 19295);
        assert_eq!(tile.y, 24640);
        assert_eq!(tile.zoom, 16);
    }

    #[test]
    fn test_invalid_latitude() {
        let result = to_tile_id(90.0, 0.0, 10);
        assert!(matches!(result, Err(CoordError::InvalidLatitude(_))));
    }

    #[test]
    fn test_invalid_zoom() {
        let result = to_tile_id(0.0, 0.0, 23);
        assert!(matches!(result, Err(CoordError::InvalidZoom(23))));
    }

    #[test]
    fn test_antimeridian_clamps_to_last_column() {
        let tile = to_tile_id(0.0, 180.0, 3).unwrap();
        assert_eq!(tile.x, 7);
        assert!(tile.is_valid());
    }

    #[test]
    fn test_tile_to_lat_lon_at_equator() {
        let tile = TileId::new(10, 512, 512);
        let (lat, lon) = tile_to_lat_lon(&tile);

        assert!(lat.abs() < 1.0, "Should be near equator");
        assert!(lon.abs() < 1.0, "Should be near prime meridian");
    }

    #[test]
    fn test_display_is_z_x_y() {
        assert_eq!(TileId::new(15, 5279, 12754).to_string(), "15/5279/12754");
    }

    #[test]
    fn test_tiles_in_bbox_single_tile() {
        let bbox = BoundingBox::new(40.71, -74.01, 40.712, -74.008);
        let tiles = tiles_in_bbox(&bbox, 10).unwrap();
        assert_eq!(tiles.len(), 1);
        assert_eq!(tiles[0], to_tile_id(40.71, -74.01, 10).unwrap());
    }

    #[test]
    fn test_tiles_in_bbox_whole_world_zoom_2() {
        let bbox = BoundingBox::new(MIN_LAT, MIN_LON, MAX_LAT, MAX_LON);
        let tiles = tiles_in_bbox(&bbox, 2).unwrap();
        assert_eq!(tiles.len(), 16);
        assert_eq!(tiles.first(), Some(&TileId::new(2, 0, 0)));
        assert_eq!(tiles.last(), Some(&TileId::new(2, 3, 3)));
    }

    #[test]
    fn test_whole_world_at_max_zoom_is_counted_not_built() {
        let bbox = BoundingBox::new(MIN_LAT, MIN_LON, MAX_LAT, MAX_LON);

        assert_eq!(bbox_tile_count(&bbox, MAX_ZOOM).unwrap(), 1u64 << 44);
        assert_eq!(
            tiles_in_bbox(&bbox, MAX_ZOOM),
            Err(CoordError::TooManyTiles {
                count: 1u64 << 44,
                limit: MAX_BBOX_TILES,
            })
        );
        assert!(tiles_in_bbox(&bbox, 17).is_err());
    }

    #[test]
    fn test_tiles_in_bbox_at_limit() {
        // 1024 x 1024 tiles at zoom 10
        let bbox = BoundingBox::new(MIN_LAT, MIN_LON, MAX_LAT, MAX_LON);
        assert_eq!(bbox_tile_count(&bbox, 10).unwrap(), MAX_BBOX_TILES);
        assert_eq!(tiles_in_bbox(&bbox, 10).unwrap().len() as u64, MAX_BBOX_TILES);
    }

    #[test]
    fn test_tiles_in_bbox_rejects_inverted_bounds() {
        let bbox = BoundingBox::new(50.0, 0.0, 40.0, 1.0);
        assert!(matches!(
            tiles_in_bbox(&bbox, 5),
            Err(CoordError::InvalidBounds(_))
        ));
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_roundtrip_property(
                lat in -85.05..85.05_f64,
                lon in -180.0..180.0_f64,
                zoom in 0u8..=18
            ) {
                let tile = to_tile_id(lat, lon, zoom)?;
                let (converted_lat, converted_lon) = tile_to_lat_lon(&tile);

                let tile_size = 360.0 / (2.0_f64.powi(zoom as i32));

                prop_assert!((converted_lat - lat).abs() < tile_size);
                prop_assert!((converted_lon - lon).abs() < tile_size);
            }

            #[test]
            fn test_bbox_tiles_are_unique_and_valid(
                south in -60.0..59.0_f64,
                west in -170.0..169.0_f64,
                height in 0.0..1.0_f64,
                width in 0.0..1.0_f64,
                zoom in 0u8..=10
            ) {
                let bbox = BoundingBox::new(south, west, south + height, west + width);
                let tiles = tiles_in_bbox(&bbox, zoom)?;

                prop_assert!(!tiles.is_empty());
                let mut sorted = tiles.clone();
                sorted.sort();
                sorted.dedup();
                prop_assert_eq!(sorted.len(), tiles.len());
                prop_assert!(tiles.iter().all(TileId::is_valid));
            }
        }
    }
}
