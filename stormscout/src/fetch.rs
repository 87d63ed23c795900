//! Tile fetching abstraction.
//!
//! [`TileFetcher`] decouples the descent engine from the network, allowing
//! stub fetchers in tests. [`HttpTileFetcher`] is the production
//! implementation over a shared `reqwest::Client`.
//!
//! A missing tile (HTTP 404) is a normal outcome of the dataset - sparse
//! regions publish no tile at all - so it is modeled as
//! [`FetchOutcome::NotFound`] rather than an error. Every other failure is
//! fatal to the traversal that requested it.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, trace};

use crate::outage::TileContent;
use crate::quadkey::Quadkey;

/// Default timeout for a single tile request.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors from a tile fetch. No retries are attempted.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    /// Request could not be sent or the response body could not be read.
    #[error("request failed: {0}")]
    Transport(String),
    /// Any non-2xx status other than 404.
    #[error("unexpected HTTP status {status}")]
    Status { status: u16 },
    /// The body was not a decodable tile payload.
    #[error("malformed tile payload: {0}")]
    Payload(String),
}

/// Result of fetching one tile.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// The tile exists; its decoded payload.
    Content(TileContent),
    /// The dataset publishes no tile at this key. Callers must treat this
    /// as an empty subtree: zero records, no further descent.
    NotFound,
}

/// Trait for components that resolve and fetch cluster tiles.
pub trait TileFetcher: Send + Sync {
    /// Resolved resource URL for the given quadkey.
    fn tile_url(&self, key: &Quadkey) -> String;

    /// Fetches and decodes the tile at `key`.
    fn fetch(&self, key: &Quadkey)
        -> impl Future<Output = Result<FetchOutcome, FetchError>> + Send;
}

/// URL template mapping quadkeys to tile resources.
///
/// `{quadkey}` is substituted with the full digit path. Some deployments
/// additionally use `{qkh}`, the reversed last three digits of the key; it
/// is substituted only when the template contains it.
#[derive(Debug, Clone, PartialEq)]
pub struct UrlTemplate(String);

impl UrlTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self(template.into())
    }

    /// Renders the template for one quadkey.
    pub fn render(&self, key: &Quadkey) -> String {
        self.0
            .replace("{quadkey}", key.as_str())
            .replace("{qkh}", &key.suffix_key())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Production tile fetcher over HTTP.
pub struct HttpTileFetcher {
    http: reqwest::Client,
    template: UrlTemplate,
}

impl HttpTileFetcher {
    /// Creates a fetcher with its own connection-pooled client.
    pub fn new(template: UrlTemplate) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_FETCH_TIMEOUT)
            .build()
            .map_err(|e| FetchError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { http, template })
    }

    /// Creates a fetcher that shares an existing client.
    ///
    /// Preferred when the caller already holds a client, so tile requests
    /// reuse its connection pool.
    pub fn with_client(http: reqwest::Client, template: UrlTemplate) -> Self {
        Self { http, template }
    }
}

impl TileFetcher for HttpTileFetcher {
    fn tile_url(&self, key: &Quadkey) -> String {
        self.template.render(key)
    }

    async fn fetch(&self, key: &Quadkey) -> Result<FetchOutcome, FetchError> {
        let url = self.tile_url(key);
        trace!(quadkey = key.as_str(), url = %url, "tile request starting");

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            debug!(quadkey = key.as_str(), "tile not published");
            return Ok(FetchOutcome::NotFound);
        }
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        let content: TileContent =
            serde_json::from_slice(&bytes).map_err(|e| FetchError::Payload(e.to_string()))?;

        trace!(
            quadkey = key.as_str(),
            records = content.records.len(),
            "tile decoded"
        );
        Ok(FetchOutcome::Content(content))
    }
}
