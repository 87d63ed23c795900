//! Quadkey coordinate module
//!
//! Provides conversions between geographic coordinates (latitude/longitude)
//! and the Web Mercator quadtree addressing used by the cluster tile
//! dataset, plus the tile-cover computation that turns a service area's
//! bounding rectangle into the initial set of quadkeys.

mod types;

pub use types::{
    GeoBounds, Quadkey, QuadkeyError, TileCoord, MAX_DEPTH, MAX_LAT, MAX_LON, MIN_LAT, MIN_LON,
};

use std::f64::consts::PI;

/// Converts geographic coordinates to tile coordinates.
///
/// # Arguments
///
/// * `lat` - Latitude in degrees (-85.05112878 to 85.05112878)
/// * `lon` - Longitude in degrees (-180.0 to 180.0)
/// * `zoom` - Zoom level (0 to 23)
///
/// # Returns
///
/// A `Result` containing the tile coordinates or an error if inputs are invalid.
#[inline]
pub fn to_tile_coords(lat: f64, lon: f64, zoom: u8) -> Result<TileCoord, QuadkeyError> {
    // Validate inputs
    if !(MIN_LAT..=MAX_LAT).contains(&lat) {
        return Err(QuadkeyError::InvalidLatitude(lat));
    }
    if !(MIN_LON..=MAX_LON).contains(&lon) {
        return Err(QuadkeyError::InvalidLongitude(lon));
    }
    if zoom as usize > MAX_DEPTH {
        return Err(QuadkeyError::InvalidZoom(zoom));
    }

    // Calculate number of tiles at this zoom level
    let n = 2.0_f64.powi(zoom as i32);
    let max_index = (n as u32).saturating_sub(1);

    // Convert longitude to tile X coordinate; the eastern edge (lon = 180)
    // folds into the last column rather than one past it.
    let col = (((lon + 180.0) / 360.0 * n) as u32).min(max_index);

    // Convert latitude to tile Y coordinate using Web Mercator projection
    let lat_rad = lat * PI / 180.0;
    let row = ((((1.0 - lat_rad.tan().asinh() / PI) / 2.0) * n) as u32).min(max_index);

    Ok(TileCoord { row, col, zoom })
}

/// Quadkeys of every tile at `zoom` covering the bounding rectangle.
///
/// Latitudes and longitudes outside the Web Mercator range are clamped to
/// it first, so a service area touching the antimeridian or the poles still
/// produces a cover.
pub fn tile_cover(bounds: &GeoBounds, zoom: u8) -> Result<Vec<Quadkey>, QuadkeyError> {
    let clamp = |lat: f64, lon: f64| {
        (
            lat.clamp(MIN_LAT, MAX_LAT),
            lon.clamp(MIN_LON, MAX_LON),
        )
    };

    // Northwest corner has the smallest row and column indices.
    let (nw_lat, nw_lon) = clamp(bounds.max_lat, bounds.min_lon);
    let (se_lat, se_lon) = clamp(bounds.min_lat, bounds.max_lon);
    let northwest = to_tile_coords(nw_lat, nw_lon, zoom)?;
    let southeast = to_tile_coords(se_lat, se_lon, zoom)?;

    let mut cover = Vec::new();
    for row in northwest.row..=southeast.row {
        for col in northwest.col..=southeast.col {
            cover.push(TileCoord { row, col, zoom }.quadkey());
        }
    }
    Ok(cover)
}
