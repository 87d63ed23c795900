//! Compact encoded-polyline codec.
//!
//! Storm Center tiles publish polygon rings and points in the encoded
//! polyline format (5 decimal digits of precision): each coordinate is
//! delta-encoded against the previous one, zigzag-signed, and written as
//! base-64-ish chunks of 5 bits offset by 63. Coordinates decode as
//! `(latitude, longitude)` pairs.

use thiserror::Error;

/// Scale factor for 5-decimal-digit precision.
const PRECISION: f64 = 1e5;

/// Chunk continuation bit.
const CONTINUATION: i64 = 0x20;

/// Errors that can occur decoding an encoded polyline.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PolylineError {
    /// The string ends in the middle of a coordinate chunk.
    #[error("truncated polyline: chunk starting at byte {0} has no terminator")]
    Truncated(usize),
    /// A byte outside the printable encoding range.
    #[error("invalid polyline byte {byte:#04x} at offset {offset}")]
    InvalidByte { byte: u8, offset: usize },
}

/// Decodes an encoded polyline into `(lat, lon)` pairs.
pub fn decode(encoded: &str) -> Result<Vec<(f64, f64)>, PolylineError> {
    let bytes = encoded.as_bytes();
    let mut points = Vec::new();
    let mut index = 0;
    let mut lat = 0i64;
    let mut lon = 0i64;

    while index < bytes.len() {
        let (delta_lat, next) = decode_value(bytes, index)?;
        let (delta_lon, next) = decode_value(bytes, next)?;
        lat += delta_lat;
        lon += delta_lon;
        index = next;
        points.push((lat as f64 / PRECISION, lon as f64 / PRECISION));
    }

    Ok(points)
}

/// Encodes `(lat, lon)` pairs as an encoded polyline.
pub fn encode(points: &[(f64, f64)]) -> String {
    let mut encoded = String::new();
    let mut prev_lat = 0i64;
    let mut prev_lon = 0i64;

    for &(lat, lon) in points {
        let lat_e5 = (lat * PRECISION).round() as i64;
        let lon_e5 = (lon * PRECISION).round() as i64;
        encode_value(lat_e5 - prev_lat, &mut encoded);
        encode_value(lon_e5 - prev_lon, &mut encoded);
        prev_lat = lat_e5;
        prev_lon = lon_e5;
    }

    encoded
}

/// Decodes one zigzag-signed delta starting at `start`.
fn decode_value(bytes: &[u8], start: usize) -> Result<(i64, usize), PolylineError> {
    let mut accumulator = 0i64;
    let mut shift = 0u32;
    let mut index = start;

    loop {
        let byte = *bytes.get(index).ok_or(PolylineError::Truncated(start))?;
        if !(63..=126).contains(&byte) || shift > 60 {
            return Err(PolylineError::InvalidByte {
                byte,
                offset: index,
            });
        }
        let chunk = (byte - 63) as i64;
        accumulator |= (chunk & 0x1f) << shift;
        index += 1;
        if chunk & CONTINUATION == 0 {
            break;
        }
        shift += 5;
    }

    let value = if accumulator & 1 != 0 {
        !(accumulator >> 1)
    } else {
        accumulator >> 1
    };
    Ok((value, index))
}

/// Appends one zigzag-signed delta to `out`.
fn encode_value(value: i64, out: &mut String) {
    let mut zigzag = if value < 0 { !(value << 1) } else { value << 1 };
    while zigzag >= CONTINUATION {
        out.push(((CONTINUATION | (zigzag & 0x1f)) + 63) as u8 as char);
        zigzag >>= 5;
    }
    out.push((zigzag + 63) as u8 as char);
}
