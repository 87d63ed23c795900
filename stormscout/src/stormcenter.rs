//! Storm Center configuration discovery.
//!
//! A Storm Center view serves its outage map from a deployment whose data
//! paths rotate; this module resolves the deployment a view currently
//! points at: the cluster-layer tile URL template, the expected-outage
//! summary, and the service-area polygon from which the initial tile cover
//! is computed. All of these run sequentially at startup, before any
//! descent begins, and every failure here is fatal.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::fetch::UrlTemplate;
use crate::polyline::{self, PolylineError};
use crate::quadkey::{self, GeoBounds, Quadkey, QuadkeyError};

/// Default Storm Center API host.
pub const DEFAULT_BASE_URL: &str = "https://kubra.io";

/// Layer type prefix identifying the cluster tile dataset.
const CLUSTER_LAYER_PREFIX: &str = "CLUSTER_LAYER";

/// Errors that can occur resolving a deployment's configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Request could not be sent or its body not read.
    #[error("configuration request to {url} failed: {message}")]
    Http { url: String, message: String },
    /// Any non-2xx response status.
    #[error("configuration request to {url} returned HTTP status {status}")]
    Status { url: String, status: u16 },
    /// The document was missing expected fields or was not JSON at all.
    #[error("configuration document at {url} is malformed: {source}")]
    Document {
        url: String,
        #[source]
        source: serde_json::Error,
    },
    /// The deployment configuration lists no cluster layer.
    #[error("no CLUSTER_LAYER entry in the deployment configuration")]
    NoClusterLayer,
    /// The state document has no usable `datastatic` region entry.
    #[error("state document has no usable datastatic region entry")]
    NoRegion,
    /// The service-area document contains no region polygon.
    #[error("service area document contains no region polygon")]
    NoServiceArea,
    /// A service-area ring did not decode.
    #[error("service area ring is undecodable: {0}")]
    ServiceArea(#[from] PolylineError),
    /// The summary document has no totals entry.
    #[error("summary document has no totals entry")]
    NoTotals,
    /// The service-area bounds did not produce a tile cover.
    #[error("invalid service area bounds: {0}")]
    Cover(#[from] QuadkeyError),
}

/// Current deployment state of a Storm Center view.
#[derive(Debug, Clone, Deserialize)]
pub struct CurrentState {
    #[serde(rename = "stormcenterDeploymentId")]
    pub deployment_id: String,
    pub data: StateData,
    /// Region-keyed static data paths; the first entry locates the
    /// service-area document.
    pub datastatic: serde_json::Map<String, Value>,
}

/// Interval-generation data paths of the current deployment.
#[derive(Debug, Clone, Deserialize)]
pub struct StateData {
    /// Path fragment of the cluster tile dataset.
    #[serde(rename = "cluster_interval_generation_data")]
    pub cluster_interval_data: String,
    /// Path fragment of the summary dataset.
    #[serde(rename = "interval_generation_data")]
    pub interval_data: String,
}

#[derive(Debug, Deserialize)]
struct ConfigurationDoc {
    config: ConfigSection,
}

#[derive(Debug, Deserialize)]
struct ConfigSection {
    layers: LayersSection,
}

#[derive(Debug, Deserialize)]
struct LayersSection {
    data: LayerData,
}

#[derive(Debug, Deserialize)]
struct LayerData {
    interval_generation_data: Vec<LayerEntry>,
}

#[derive(Debug, Deserialize)]
struct LayerEntry {
    id: String,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct SummaryDoc {
    #[serde(rename = "summaryFileData")]
    summary_file_data: SummaryFileData,
}

#[derive(Debug, Deserialize)]
struct SummaryFileData {
    totals: Vec<SummaryTotals>,
}

#[derive(Debug, Deserialize)]
struct SummaryTotals {
    total_outages: u64,
}

#[derive(Debug, Deserialize)]
struct ServiceAreaDoc {
    file_data: Vec<ServiceArea>,
}

#[derive(Debug, Deserialize)]
struct ServiceArea {
    geom: ServiceAreaGeometry,
}

#[derive(Debug, Deserialize)]
struct ServiceAreaGeometry {
    #[serde(rename = "a")]
    rings: Vec<String>,
}

/// Client for the Storm Center configuration API.
///
/// Uses a reusable `reqwest::Client` with connection pooling; all lookups
/// are plain JSON GETs against the configured host.
pub struct StormCenterClient {
    http: reqwest::Client,
    base_url: String,
}

impl StormCenterClient {
    /// Creates a client sharing an existing HTTP client.
    pub fn with_client(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, ConfigError> {
        let response = self.http.get(url).send().await.map_err(|e| {
            ConfigError::Http {
                url: url.to_string(),
                message: e.to_string(),
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ConfigError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await.map_err(|e| ConfigError::Http {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        serde_json::from_slice(&bytes).map_err(|source| ConfigError::Document {
            url: url.to_string(),
            source,
        })
    }

    /// Fetches the view's current deployment state.
    pub async fn current_state(
        &self,
        instance_id: &str,
        view_id: &str,
    ) -> Result<CurrentState, ConfigError> {
        let url = format!(
            "{}/stormcenter/api/v1/stormcenters/{}/views/{}/currentState?preview=false",
            self.base_url, instance_id, view_id
        );
        let state: CurrentState = self.get_json(&url).await?;
        debug!(
            deployment_id = %state.deployment_id,
            "current state fetched"
        );
        Ok(state)
    }

    /// Resolves the cluster tile URL template for the current deployment.
    ///
    /// Selects the first `CLUSTER_LAYER*` entry of the deployment
    /// configuration and renders the template its tiles are served under.
    pub async fn cluster_url_template(
        &self,
        state: &CurrentState,
        instance_id: &str,
        view_id: &str,
    ) -> Result<UrlTemplate, ConfigError> {
        let url = format!(
            "{}/stormcenter/api/v1/stormcenters/{}/views/{}/configuration/{}?preview=false",
            self.base_url, instance_id, view_id, state.deployment_id
        );
        let configuration: ConfigurationDoc = self.get_json(&url).await?;

        let layer = configuration
            .config
            .layers
            .data
            .interval_generation_data
            .into_iter()
            .find(|layer| layer.kind.starts_with(CLUSTER_LAYER_PREFIX))
            .ok_or(ConfigError::NoClusterLayer)?;

        debug!(layer_id = %layer.id, layer_type = %layer.kind, "cluster layer selected");
        Ok(UrlTemplate::new(format!(
            "{}/{}/public/{}/{{quadkey}}.json",
            self.base_url, state.data.cluster_interval_data, layer.id
        )))
    }

    /// Total outages the deployment's summary currently reports.
    pub async fn expected_outages(&self, state: &CurrentState) -> Result<u64, ConfigError> {
        let url = format!(
            "{}/{}/public/summary-1/data.json",
            self.base_url, state.data.interval_data
        );
        let summary: SummaryDoc = self.get_json(&url).await?;
        summary
            .summary_file_data
            .totals
            .first()
            .map(|totals| totals.total_outages)
            .ok_or(ConfigError::NoTotals)
    }

    /// Quadkeys at `zoom` covering the view's service area.
    ///
    /// Decodes the service-area polygon rings, takes the bounding rectangle
    /// of every vertex, and covers it with tiles at the requested zoom.
    pub async fn service_area_quadkeys(
        &self,
        state: &CurrentState,
        zoom: u8,
    ) -> Result<Vec<Quadkey>, ConfigError> {
        let (region_key, region_path) = state
            .datastatic
            .iter()
            .find_map(|(key, value)| value.as_str().map(|path| (key.as_str(), path)))
            .ok_or(ConfigError::NoRegion)?;

        let url = format!("{}/{}/{}/serviceareas.json", self.base_url, region_path, region_key);
        let document: ServiceAreaDoc = self.get_json(&url).await?;

        let rings = document
            .file_data
            .into_iter()
            .next()
            .map(|area| area.geom.rings)
            .ok_or(ConfigError::NoServiceArea)?;

        let mut points = Vec::new();
        for ring in &rings {
            points.extend(polyline::decode(ring)?);
        }
        let bounds = GeoBounds::from_points(&points).ok_or(ConfigError::NoServiceArea)?;
        debug!(
            min_lat = bounds.min_lat,
            min_lon = bounds.min_lon,
            max_lat = bounds.max_lat,
            max_lon = bounds.max_lon,
            "service area bounds computed"
        );

        let cover = quadkey::tile_cover(&bounds, zoom)?;
        debug!(tiles = cover.len(), zoom, "service area tile cover computed");
        Ok(cover)
    }
}
