//! Stormscout - adaptive scraping of Storm Center outage maps
//!
//! This library collects power-outage data from Storm Center deployments,
//! which publish outage clusters as a quadkey-indexed tile dataset. Tiles at
//! coarse zoom levels aggregate nearby outages into clusters; the descent
//! engine refines resolution only where clusters remain, bounding the number
//! of requests by the density of the data itself.
//!
//! # High-Level API
//!
//! For most use cases, the [`service`] module provides a simplified facade:
//!
//! ```ignore
//! use stormscout::service::{OutageService, ServiceConfig};
//!
//! let service = OutageService::new(ServiceConfig::default())?;
//! let records = service.scrape("instance-id", "view-id").await?;
//! let collection = stormscout::features::to_feature_collection(&records)?;
//! ```
//!
//! The pieces compose individually as well: [`stormcenter`] discovers the
//! deployment configuration, [`quadkey`] computes the service-area tile
//! cover, [`descent`] runs the adaptive traversal over a [`fetch`] fetcher,
//! and [`features`] encodes the result as GeoJSON.

pub mod descent;
pub mod features;
pub mod fetch;
pub mod outage;
pub mod polyline;
pub mod quadkey;
pub mod service;
pub mod stormcenter;

/// Version of the stormscout library and CLI.
///
/// This is synchronized across all components in the workspace.
/// The version is defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
