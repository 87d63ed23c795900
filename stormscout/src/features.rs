//! GeoJSON feature encoding for collected outage records.
//!
//! Each record becomes one feature: the geometry payload is decoded from
//! its compact line encoding and every coordinate pair is reversed from the
//! encoded `(lat, lon)` order into GeoJSON's `(lon, lat)`; all remaining
//! fields, including the provenance `source` URL, become the feature's
//! properties.

use geojson::{Feature, FeatureCollection, Geometry, Value};
use serde_json::Value as Json;
use thiserror::Error;

use crate::outage::{GeometryPayload, SourcedRecord};
use crate::polyline::{self, PolylineError};

/// Errors that can occur encoding records as features.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// A geometry payload did not decode.
    #[error("record from {url} has an undecodable geometry: {source}")]
    Geometry {
        url: String,
        #[source]
        source: PolylineError,
    },
    /// A point payload decoded to zero points.
    #[error("record from {url} has an empty point payload")]
    EmptyPoint { url: String },
    /// The record's properties could not be serialized.
    #[error("record from {url} could not be serialized: {source}")]
    Properties {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Encodes collected records as a GeoJSON feature collection.
pub fn to_feature_collection(
    records: &[SourcedRecord],
) -> Result<FeatureCollection, EncodeError> {
    let features = records
        .iter()
        .map(to_feature)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    })
}

/// Encodes one record as a GeoJSON feature.
pub fn to_feature(record: &SourcedRecord) -> Result<Feature, EncodeError> {
    let geometry = decode_geometry(record)?;
    let properties = properties_without_geometry(record)?;

    Ok(Feature {
        bbox: None,
        geometry: Some(Geometry::new(geometry)),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    })
}

fn decode_geometry(record: &SourcedRecord) -> Result<Value, EncodeError> {
    let decode_ring = |ring: &str| {
        polyline::decode(ring).map_err(|source| EncodeError::Geometry {
            url: record.source.clone(),
            source,
        })
    };

    match &record.record.geom {
        GeometryPayload::Polygon { rings } => {
            let rings = rings
                .iter()
                .map(|ring| Ok(decode_ring(ring)?.into_iter().map(flip).collect()))
                .collect::<Result<Vec<Vec<Vec<f64>>>, EncodeError>>()?;
            Ok(Value::Polygon(rings))
        }
        GeometryPayload::Point { points } => {
            let encoded = points.first().ok_or_else(|| EncodeError::EmptyPoint {
                url: record.source.clone(),
            })?;
            let point = decode_ring(encoded)?
                .into_iter()
                .next()
                .ok_or_else(|| EncodeError::EmptyPoint {
                    url: record.source.clone(),
                })?;
            Ok(Value::Point(flip(point)))
        }
    }
}

/// Everything but the geometry payload, flattened beside `source`.
fn properties_without_geometry(
    record: &SourcedRecord,
) -> Result<geojson::JsonObject, EncodeError> {
    let serialized =
        serde_json::to_value(record).map_err(|source| EncodeError::Properties {
            url: record.source.clone(),
            source,
        })?;
    match serialized {
        Json::Object(mut properties) => {
            properties.remove("geom");
            Ok(properties)
        }
        // SourcedRecord is a struct; it always serializes to an object.
        _ => unreachable!("record serialization produced a non-object"),
    }
}

/// Encoded coordinates are (lat, lon); GeoJSON positions are (lon, lat).
#[inline]
fn flip((lat, lon): (f64, f64)) -> Vec<f64> {
    vec![lon, lat]
}
