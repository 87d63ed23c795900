//! Descent engine implementation.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::fetch::{FetchError, FetchOutcome, TileFetcher};
use crate::outage::SourcedRecord;
use crate::quadkey::Quadkey;

/// Default cap on simultaneously in-flight tile requests.
pub const DEFAULT_MAX_IN_FLIGHT: usize = 64;

/// Errors that abort a traversal.
#[derive(Debug, Error)]
pub enum DescentError {
    /// A tile fetch failed fatally.
    #[error("failed to fetch tile '{quadkey}' from {url}: {source}")]
    Fetch {
        quadkey: Quadkey,
        url: String,
        #[source]
        source: FetchError,
    },
    /// The branch unwound after another branch failed.
    #[error("descent cancelled after another branch failed")]
    Cancelled,
}

/// Concurrent adaptive-refinement engine over a [`TileFetcher`].
///
/// One engine owns a fetcher, a depth limit, and an in-flight request cap;
/// it can run any number of traversals, each with its own cancellation
/// scope. Traversals are all-or-nothing: either every reachable branch
/// finalized and the full record set is returned, or the first fatal error
/// is surfaced with the offending quadkey and URL.
pub struct DescentEngine<F> {
    shared: Arc<Shared<F>>,
}

struct Shared<F> {
    fetcher: F,
    max_depth: usize,
    permits: Semaphore,
}

impl<F: TileFetcher + 'static> DescentEngine<F> {
    /// Creates an engine with the default in-flight request cap.
    pub fn new(fetcher: F, max_depth: usize) -> Self {
        Self::with_max_in_flight(fetcher, max_depth, DEFAULT_MAX_IN_FLIGHT)
    }

    /// Creates an engine capping simultaneous tile requests at
    /// `max_in_flight`.
    pub fn with_max_in_flight(fetcher: F, max_depth: usize, max_in_flight: usize) -> Self {
        Self {
            shared: Arc::new(Shared {
                fetcher,
                max_depth,
                permits: Semaphore::new(max_in_flight),
            }),
        }
    }

    /// Runs the traversal from `roots` and aggregates every finalized
    /// record, tagged with the URL of the tile it came from. Record order
    /// is unspecified.
    pub async fn collect(&self, roots: Vec<Quadkey>) -> Result<Vec<SourcedRecord>, DescentError> {
        let cancel = CancellationToken::new();
        let mut branches = JoinSet::new();
        for key in roots {
            branches.spawn(descend(Arc::clone(&self.shared), key, cancel.clone()));
        }
        join_branches(&mut branches).await
    }
}

/// One branch of the traversal: fetch the tile, then either finalize its
/// records or fan out into the four children.
///
/// Boxed because the future recurses through `JoinSet::spawn`.
fn descend<F: TileFetcher + 'static>(
    shared: Arc<Shared<F>>,
    key: Quadkey,
    cancel: CancellationToken,
) -> Pin<Box<dyn Future<Output = Result<Vec<SourcedRecord>, DescentError>> + Send>> {
    Box::pin(async move {
        if cancel.is_cancelled() {
            return Err(DescentError::Cancelled);
        }

        // The permit is held for the duration of the fetch only. Holding it
        // across the child joins would deadlock: parents would sit on
        // permits their own children are waiting for.
        let fetched = {
            let _permit = shared
                .permits
                .acquire()
                .await
                .map_err(|_| DescentError::Cancelled)?;
            tokio::select! {
                _ = cancel.cancelled() => return Err(DescentError::Cancelled),
                outcome = shared.fetcher.fetch(&key) => outcome,
            }
        };

        let content = match fetched {
            Ok(FetchOutcome::Content(content)) => content,
            Ok(FetchOutcome::NotFound) => {
                trace!(quadkey = key.as_str(), "no tile published, empty subtree");
                return Ok(Vec::new());
            }
            Err(source) => {
                let url = shared.fetcher.tile_url(&key);
                warn!(
                    quadkey = key.as_str(),
                    url = %url,
                    error = %source,
                    "tile fetch failed, aborting traversal"
                );
                cancel.cancel();
                return Err(DescentError::Fetch {
                    quadkey: key,
                    url,
                    source,
                });
            }
        };

        if !content.has_cluster() || key.depth() >= shared.max_depth {
            let url = shared.fetcher.tile_url(&key);
            trace!(
                quadkey = key.as_str(),
                records = content.records.len(),
                depth = key.depth(),
                "terminal tile"
            );
            return Ok(content
                .records
                .into_iter()
                .map(|record| SourcedRecord {
                    source: url.clone(),
                    record,
                })
                .collect());
        }

        debug!(quadkey = key.as_str(), "cluster tile, refining one zoom level");
        let mut branches = JoinSet::new();
        for child in key.children() {
            branches.spawn(descend(Arc::clone(&shared), child, cancel.clone()));
        }
        join_branches(&mut branches).await
    })
}

/// Awaits every branch in the set, concatenating their contributions.
///
/// The first real error wins; `Cancelled` results from siblings unwinding
/// are surfaced only when no branch reported the underlying failure.
async fn join_branches(
    branches: &mut JoinSet<Result<Vec<SourcedRecord>, DescentError>>,
) -> Result<Vec<SourcedRecord>, DescentError> {
    let mut records = Vec::new();
    let mut failure: Option<DescentError> = None;

    while let Some(joined) = branches.join_next().await {
        let outcome = match joined {
            Ok(outcome) => outcome,
            Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
            Err(_) => Err(DescentError::Cancelled),
        };
        match outcome {
            Ok(mut contribution) => records.append(&mut contribution),
            Err(err) => match failure {
                None => failure = Some(err),
                Some(DescentError::Cancelled) if !matches!(err, DescentError::Cancelled) => {
                    failure = Some(err)
                }
                Some(_) => {}
            },
        }
    }

    match failure {
        Some(err) => Err(err),
        None => Ok(records),
    }
}
