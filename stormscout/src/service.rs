//! High-level scraping facade.
//!
//! [`OutageService`] wires the pieces together for the common case: resolve
//! the deployment configuration, compute the service-area tile cover, run
//! the adaptive descent, and hand back the flat record set.

use thiserror::Error;
use tracing::{debug, info};

use crate::descent::{DescentEngine, DescentError, DEFAULT_MAX_IN_FLIGHT};
use crate::fetch::{HttpTileFetcher, DEFAULT_FETCH_TIMEOUT};
use crate::outage::SourcedRecord;
use crate::stormcenter::{ConfigError, StormCenterClient, DEFAULT_BASE_URL};

/// Coarsest zoom level the cluster dataset publishes; the service-area
/// cover is computed here.
pub const DEFAULT_MIN_ZOOM: u8 = 7;

/// Finest zoom level the cluster dataset publishes; descent never goes
/// deeper, even if clusters remain.
pub const DEFAULT_MAX_ZOOM: u8 = 14;

/// Errors from a scrape run.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Descent(#[from] DescentError),
    /// The shared HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

/// Tuning knobs for a scrape run.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Storm Center API host.
    pub base_url: String,
    /// Zoom level of the initial service-area tile cover.
    pub min_zoom: u8,
    /// Depth at which descent stops even if clusters remain.
    pub max_zoom: u8,
    /// Cap on simultaneously in-flight tile requests.
    pub max_in_flight: usize,
    /// Per-request HTTP timeout.
    pub http_timeout: std::time::Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            min_zoom: DEFAULT_MIN_ZOOM,
            max_zoom: DEFAULT_MAX_ZOOM,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            http_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }
}

/// Facade wiring configuration discovery, tile cover, and descent.
pub struct OutageService {
    client: StormCenterClient,
    http: reqwest::Client,
    config: ServiceConfig,
}

impl OutageService {
    /// Creates a service with a shared connection-pooled HTTP client.
    pub fn new(config: ServiceConfig) -> Result<Self, ServiceError> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()
            .map_err(|e| ServiceError::Client(e.to_string()))?;
        let client = StormCenterClient::with_client(http.clone(), config.base_url.clone());
        Ok(Self {
            client,
            http,
            config,
        })
    }

    /// Scrapes every finalized outage record for one Storm Center view.
    ///
    /// All-or-nothing: a fatal error anywhere in discovery or descent is
    /// returned and no partial record set is produced.
    pub async fn scrape(
        &self,
        instance_id: &str,
        view_id: &str,
    ) -> Result<Vec<SourcedRecord>, ServiceError> {
        let state = self.client.current_state(instance_id, view_id).await?;
        let template = self
            .client
            .cluster_url_template(&state, instance_id, view_id)
            .await?;
        debug!(template = template.as_str(), "cluster tile template resolved");

        // Informational only; the summary dataset can lag the cluster one.
        match self.client.expected_outages(&state).await {
            Ok(expected) => info!(expected_outages = expected, "deployment summary fetched"),
            Err(err) => debug!(error = %err, "expected-outage summary unavailable"),
        }

        let roots = self
            .client
            .service_area_quadkeys(&state, self.config.min_zoom)
            .await?;
        info!(
            tiles = roots.len(),
            zoom = self.config.min_zoom,
            "starting descent over service area"
        );

        let fetcher = HttpTileFetcher::with_client(self.http.clone(), template);
        let engine = DescentEngine::with_max_in_flight(
            fetcher,
            self.config.max_zoom as usize,
            self.config.max_in_flight,
        );
        let records = engine.collect(roots).await?;
        info!(records = records.len(), "descent complete");
        Ok(records)
    }
}
