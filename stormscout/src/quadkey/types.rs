//! Quadkey and tile coordinate type definitions

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Web Mercator valid latitude range
pub const MIN_LAT: f64 = -85.05112878;
pub const MAX_LAT: f64 = 85.05112878;

/// Valid longitude range
pub const MIN_LON: f64 = -180.0;
pub const MAX_LON: f64 = 180.0;

/// Deepest quadkey the tile coordinate types can represent.
pub const MAX_DEPTH: usize = 23;

/// Errors that can occur constructing keys or converting coordinates.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QuadkeyError {
    /// Quadkey contains a character outside `0`-`3`.
    #[error("invalid quadkey digit '{digit}' in '{key}' (only 0-3 allowed)")]
    InvalidDigit { key: String, digit: char },
    /// Quadkey is longer than the deepest representable zoom level.
    #[error("quadkey '{0}' exceeds the maximum supported depth")]
    TooDeep(String),
    /// Latitude is outside the Web Mercator range.
    #[error("invalid latitude: {0} (must be between -85.05112878 and 85.05112878)")]
    InvalidLatitude(f64),
    /// Longitude is outside the valid range.
    #[error("invalid longitude: {0} (must be between -180.0 and 180.0)")]
    InvalidLongitude(f64),
    /// Zoom level is deeper than the maximum supported depth.
    #[error("invalid zoom level: {0} (must be at most 23)")]
    InvalidZoom(u8),
}

/// Quadkey identifying one node of the Web Mercator quadtree.
///
/// Each character selects one of four children, so the key's length is the
/// tile's zoom level. The empty key addresses the root tile. Keys contain
/// only the digits `0`-`3`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Quadkey(String);

impl Quadkey {
    /// Zoom level of the tile this key addresses.
    #[inline]
    pub fn depth(&self) -> usize {
        self.0.len()
    }

    /// The key's digit path.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The four child keys one zoom level deeper.
    pub fn children(&self) -> [Quadkey; 4] {
        ['0', '1', '2', '3'].map(|digit| {
            let mut path = String::with_capacity(self.0.len() + 1);
            path.push_str(&self.0);
            path.push(digit);
            Quadkey(path)
        })
    }

    /// The reversed last three digits of the key.
    ///
    /// Some tile URL templates substitute this as `{qkh}`, spreading
    /// neighboring tiles across storage prefixes.
    pub fn suffix_key(&self) -> String {
        self.0.chars().rev().take(3).collect()
    }

    /// Tile coordinates of the tile this key addresses.
    pub fn to_tile(&self) -> TileCoord {
        let mut row = 0u32;
        let mut col = 0u32;
        for digit in self.0.chars() {
            row <<= 1;
            col <<= 1;
            match digit {
                '0' => {}
                '1' => col |= 1,
                '2' => row |= 1,
                // Constructor guarantees the only remaining digit is '3'.
                _ => {
                    row |= 1;
                    col |= 1;
                }
            }
        }
        TileCoord {
            row,
            col,
            zoom: self.0.len() as u8,
        }
    }
}

impl FromStr for Quadkey {
    type Err = QuadkeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() > MAX_DEPTH {
            return Err(QuadkeyError::TooDeep(s.to_string()));
        }
        if let Some(digit) = s.chars().find(|c| !('0'..='3').contains(c)) {
            return Err(QuadkeyError::InvalidDigit {
                key: s.to_string(),
                digit,
            });
        }
        Ok(Quadkey(s.to_string()))
    }
}

impl fmt::Display for Quadkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Tile coordinates in the Web Mercator / Slippy Map system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileCoord {
    /// Y coordinate (north-south), 0 at north
    pub row: u32,
    /// X coordinate (east-west), 0 at west
    pub col: u32,
    /// Zoom level
    pub zoom: u8,
}

impl TileCoord {
    /// The quadkey addressing this tile.
    ///
    /// Interleaves the column and row bits from most to least significant,
    /// one digit per zoom level.
    pub fn quadkey(&self) -> Quadkey {
        let mut path = String::with_capacity(self.zoom as usize);
        for i in (1..=self.zoom).rev() {
            let col_bit = (self.col >> (i - 1)) & 1;
            let row_bit = (self.row >> (i - 1)) & 1;
            let digit = col_bit | (row_bit << 1);
            path.push(char::from(b'0' + digit as u8));
        }
        Quadkey(path)
    }
}

/// Geographic bounding rectangle accumulated from a set of points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoBounds {
    pub min_lat: f64,
    pub min_lon: f64,
    pub max_lat: f64,
    pub max_lon: f64,
}

impl GeoBounds {
    /// The bounding rectangle of all `(lat, lon)` points.
    ///
    /// Returns `None` for an empty point set.
    pub fn from_points(points: &[(f64, f64)]) -> Option<GeoBounds> {
        let (&(first_lat, first_lon), rest) = points.split_first()?;
        let mut bounds = GeoBounds {
            min_lat: first_lat,
            min_lon: first_lon,
            max_lat: first_lat,
            max_lon: first_lon,
        };
        for &(lat, lon) in rest {
            bounds.min_lat = bounds.min_lat.min(lat);
            bounds.min_lon = bounds.min_lon.min(lon);
            bounds.max_lat = bounds.max_lat.max(lat);
            bounds.max_lon = bounds.max_lon.max(lon);
        }
        Some(bounds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quadkey_parse_accepts_valid_digits() {
        let key: Quadkey = "0123".parse().unwrap();
        assert_eq!(key.as_str(), "0123");
        assert_eq!(key.depth(), 4);
    }

    #[test]
    fn test_quadkey_parse_accepts_root() {
        let key: Quadkey = "".parse().unwrap();
        assert_eq!(key.depth(), 0);
    }

    #[test]
    fn test_quadkey_parse_rejects_other_digits() {
        let result = "0124".parse::<Quadkey>();
        assert!(matches!(
            result,
            Err(QuadkeyError::InvalidDigit { digit: '4', .. })
        ));
    }

    #[test]
    fn test_quadkey_parse_rejects_excess_depth() {
        let too_deep = "0".repeat(MAX_DEPTH + 1);
        assert!(matches!(
            too_deep.parse::<Quadkey>(),
            Err(QuadkeyError::TooDeep(_))
        ));
    }

    #[test]
    fn test_children_extend_by_one_digit() {
        let key: Quadkey = "13".parse().unwrap();
        let children = key.children();
        let paths: Vec<&str> = children.iter().map(Quadkey::as_str).collect();
        assert_eq!(paths, vec!["130", "131", "132", "133"]);
        assert!(children.iter().all(|child| child.depth() == 3));
    }

    #[test]
    fn test_suffix_key_reverses_last_three_digits() {
        let key: Quadkey = "012310".parse().unwrap();
        assert_eq!(key.suffix_key(), "013");
    }

    #[test]
    fn test_suffix_key_of_short_key() {
        let key: Quadkey = "21".parse().unwrap();
        assert_eq!(key.suffix_key(), "12");
    }

    #[test]
    fn test_tile_quadkey_roundtrip() {
        let tile = TileCoord {
            row: 24640,
            col: 19295,
            zoom: 16,
        };
        let key = tile.quadkey();
        assert_eq!(key.depth(), 16);
        assert_eq!(key.to_tile(), tile);
    }

    #[test]
    fn test_known_quadkey_digits() {
        // Bing's documented example: tile (3, 5) at zoom 3 is "213".
        let tile = TileCoord {
            row: 5,
            col: 3,
            zoom: 3,
        };
        assert_eq!(tile.quadkey().as_str(), "213");
    }

    #[test]
    fn test_bounds_from_points() {
        let points = [(40.0, -74.0), (41.5, -72.5), (39.2, -75.1)];
        let bounds = GeoBounds::from_points(&points).unwrap();
        assert_eq!(bounds.min_lat, 39.2);
        assert_eq!(bounds.max_lat, 41.5);
        assert_eq!(bounds.min_lon, -75.1);
        assert_eq!(bounds.max_lon, -72.5);
    }

    #[test]
    fn test_bounds_of_empty_set() {
        assert!(GeoBounds::from_points(&[]).is_none());
    }
}
