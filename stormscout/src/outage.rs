//! Outage tile payload model.
//!
//! These are our own types, decoupled from the wire format only as far as
//! naming goes: records round-trip through serde unchanged, so raw output
//! reproduces exactly what the dataset published (plus provenance).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Geometry payload of one outage record.
///
/// A record covers either an area (one or more compact-encoded rings under
/// `a`) or a single encoded point under `p`. Records carrying both are
/// treated as polygons.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GeometryPayload {
    Polygon {
        #[serde(rename = "a")]
        rings: Vec<String>,
    },
    Point {
        #[serde(rename = "p")]
        points: Vec<String>,
    },
}

/// Description block carried by every outage record.
///
/// `cluster` marks an aggregated group of outages that must be refined by
/// descending one zoom level; every other description field passes through
/// untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutageDesc {
    pub cluster: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One outage entry from a tile's `file_data` array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutageRecord {
    pub desc: OutageDesc,
    pub geom: GeometryPayload,
    #[serde(flatten)]
    pub properties: Map<String, Value>,
}

impl OutageRecord {
    /// True when this record is an unresolved cluster aggregate.
    #[inline]
    pub fn is_cluster(&self) -> bool {
        self.desc.cluster
    }
}

/// Decoded payload of one cluster tile.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TileContent {
    #[serde(rename = "file_data")]
    pub records: Vec<OutageRecord>,
}

impl TileContent {
    /// True when any record still represents an unresolved cluster
    /// aggregate rather than a resolved outage.
    pub fn has_cluster(&self) -> bool {
        self.records.iter().any(OutageRecord::is_cluster)
    }
}

/// An outage record tagged with the URL of the tile it was finalized from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourcedRecord {
    pub source: String,
    #[serde(flatten)]
    pub record: OutageRecord,
}
