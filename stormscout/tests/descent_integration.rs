//! Integration tests for the adaptive descent engine.
//!
//! These tests drive the engine against an in-memory stub fetcher and
//! verify the traversal's observable contract:
//! - termination on cluster-free tiles (no children fetched)
//! - the maximum-depth cutoff
//! - NotFound short-circuiting
//! - fatal error propagation (all-or-nothing)
//! - aggregation completeness with URL provenance
//! - idempotence across repeated traversals

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

use stormscout::descent::{DescentEngine, DescentError};
use stormscout::fetch::{FetchError, FetchOutcome, TileFetcher, UrlTemplate};
use stormscout::outage::{OutageRecord, SourcedRecord, TileContent};
use stormscout::quadkey::Quadkey;

// =============================================================================
// Test Helpers
// =============================================================================

/// Behavior of the stub for one quadkey. Keys without an entry are missing.
#[derive(Clone)]
enum StubTile {
    Records(Vec<OutageRecord>),
    Broken,
}

/// In-memory fetcher that records which keys were requested.
///
/// The request log is shared so tests can keep a handle to it after the
/// engine takes ownership of the fetcher.
struct StubFetcher {
    tiles: HashMap<String, StubTile>,
    template: UrlTemplate,
    requested: Arc<Mutex<Vec<String>>>,
}

impl StubFetcher {
    fn new(tiles: Vec<(&str, StubTile)>) -> Self {
        Self {
            tiles: tiles
                .into_iter()
                .map(|(key, tile)| (key.to_string(), tile))
                .collect(),
            template: UrlTemplate::new("https://tiles.test/{quadkey}.json"),
            requested: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn request_log(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.requested)
    }
}

impl TileFetcher for StubFetcher {
    fn tile_url(&self, key: &Quadkey) -> String {
        self.template.render(key)
    }

    async fn fetch(&self, key: &Quadkey) -> Result<FetchOutcome, FetchError> {
        self.requested
            .lock()
            .unwrap()
            .push(key.as_str().to_string());
        match self.tiles.get(key.as_str()) {
            Some(StubTile::Records(records)) => Ok(FetchOutcome::Content(TileContent {
                records: records.clone(),
            })),
            Some(StubTile::Broken) => Err(FetchError::Transport("connection reset".to_string())),
            None => Ok(FetchOutcome::NotFound),
        }
    }
}

fn cluster_record(id: &str) -> OutageRecord {
    record(true, id)
}

fn outage_record(id: &str) -> OutageRecord {
    record(false, id)
}

fn record(cluster: bool, id: &str) -> OutageRecord {
    serde_json::from_value(serde_json::json!({
        "desc": { "cluster": cluster, "cust_a": { "val": 12 } },
        "geom": { "p": ["o}seGznxoO"] },
        "id": id,
    }))
    .expect("record fixture should deserialize")
}

fn key(path: &str) -> Quadkey {
    path.parse().expect("fixture quadkeys are valid")
}

/// Order-independent view of a result set for equality assertions.
fn as_set(records: &[SourcedRecord]) -> BTreeSet<String> {
    records
        .iter()
        .map(|record| serde_json::to_string(record).unwrap())
        .collect()
}

// =============================================================================
// Termination and short-circuiting
// =============================================================================

#[tokio::test]
async fn terminal_tile_contributes_without_descending() {
    let fetcher = StubFetcher::new(vec![(
        "1",
        StubTile::Records(vec![outage_record("a"), outage_record("b")]),
    )]);
    let log = fetcher.request_log();
    let engine = DescentEngine::new(fetcher, 14);

    let records = engine.collect(vec![key("1")]).await.unwrap();

    assert_eq!(records.len(), 2);
    assert!(records
        .iter()
        .all(|r| r.source == "https://tiles.test/1.json"));
    assert_eq!(*log.lock().unwrap(), vec!["1"]);
}

#[tokio::test]
async fn cluster_free_tile_fetches_no_children() {
    let fetcher = StubFetcher::new(vec![
        ("3", StubTile::Records(vec![outage_record("solo")])),
        // A child exists in the stub but must never be requested.
        ("30", StubTile::Records(vec![outage_record("hidden")])),
    ]);
    let log = fetcher.request_log();
    let engine = DescentEngine::new(fetcher, 14);

    let records = engine.collect(vec![key("3")]).await.unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].source, "https://tiles.test/3.json");
    assert_eq!(*log.lock().unwrap(), vec!["3"]);
}

#[tokio::test]
async fn max_depth_tile_is_terminal_even_when_all_records_cluster() {
    let deep = "01230123012301";
    assert_eq!(deep.len(), 14);
    let fetcher = StubFetcher::new(vec![(
        deep,
        StubTile::Records(vec![cluster_record("c1"), cluster_record("c2")]),
    )]);
    let log = fetcher.request_log();
    let engine = DescentEngine::new(fetcher, 14);

    let records = engine.collect(vec![key(deep)]).await.unwrap();

    assert_eq!(records.len(), 2, "depth cutoff finalizes cluster records");
    assert_eq!(*log.lock().unwrap(), vec![deep]);
}

#[tokio::test]
async fn missing_tile_contributes_nothing_and_fetches_no_children() {
    let fetcher = StubFetcher::new(vec![]);
    let log = fetcher.request_log();
    let engine = DescentEngine::new(fetcher, 14);

    let records = engine.collect(vec![key("2")]).await.unwrap();

    assert!(records.is_empty());
    assert_eq!(*log.lock().unwrap(), vec!["2"]);
}

// =============================================================================
// Failure propagation
// =============================================================================

#[tokio::test]
async fn fatal_error_anywhere_fails_the_whole_traversal() {
    let fetcher = StubFetcher::new(vec![
        ("0", StubTile::Records(vec![cluster_record("root")])),
        ("00", StubTile::Records(vec![outage_record("fine")])),
        ("01", StubTile::Broken),
        ("02", StubTile::Records(vec![outage_record("also-fine")])),
    ]);
    let engine = DescentEngine::new(fetcher, 14);

    let err = engine.collect(vec![key("0")]).await.unwrap_err();

    match err {
        DescentError::Fetch { quadkey, url, .. } => {
            assert_eq!(quadkey.as_str(), "01");
            assert_eq!(url, "https://tiles.test/01.json");
        }
        other => panic!("expected the fetch failure to surface, got {other:?}"),
    }
}

#[tokio::test]
async fn fatal_error_in_one_root_fails_a_multi_root_traversal() {
    let fetcher = StubFetcher::new(vec![
        ("1", StubTile::Records(vec![outage_record("left")])),
        ("2", StubTile::Broken),
    ]);
    let engine = DescentEngine::new(fetcher, 14);

    let result = engine.collect(vec![key("1"), key("2")]).await;

    assert!(
        matches!(result, Err(DescentError::Fetch { .. })),
        "no partial result may survive a fatal branch"
    );
}

// =============================================================================
// Aggregation
// =============================================================================

#[tokio::test]
async fn aggregation_is_complete_and_tagged_with_child_urls() {
    // Root is a cluster; exactly one child is terminal with three records,
    // the other three children are missing.
    let fetcher = StubFetcher::new(vec![
        ("1", StubTile::Records(vec![cluster_record("agg")])),
        (
            "12",
            StubTile::Records(vec![
                outage_record("r1"),
                outage_record("r2"),
                outage_record("r3"),
            ]),
        ),
    ]);
    let engine = DescentEngine::new(fetcher, 14);

    let records = engine.collect(vec![key("1")]).await.unwrap();

    assert_eq!(records.len(), 3);
    assert!(records
        .iter()
        .all(|r| r.source == "https://tiles.test/12.json"));
}

#[tokio::test]
async fn end_to_end_single_resolved_outage() {
    // The dataset's own refinement semantics end to end: the root tile "1"
    // aggregates one cluster; of its children, only "12" resolves, holding
    // a single non-cluster point record.
    let fetcher = StubFetcher::new(vec![
        ("1", StubTile::Records(vec![cluster_record("agg")])),
        ("12", StubTile::Records(vec![outage_record("resolved")])),
    ]);
    let log = fetcher.request_log();
    let engine = DescentEngine::new(fetcher, 14);

    let records = engine.collect(vec![key("1")]).await.unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].source, "https://tiles.test/12.json");
    assert!(!records[0].record.is_cluster());

    let mut requested = log.lock().unwrap().clone();
    requested.sort();
    assert_eq!(requested, vec!["1", "10", "11", "12", "13"]);
}

#[tokio::test]
async fn multi_level_descent_aggregates_across_depths() {
    let fetcher = StubFetcher::new(vec![
        ("2", StubTile::Records(vec![cluster_record("top")])),
        ("20", StubTile::Records(vec![outage_record("shallow")])),
        ("23", StubTile::Records(vec![cluster_record("mid")])),
        ("231", StubTile::Records(vec![outage_record("deep-1")])),
        ("233", StubTile::Records(vec![outage_record("deep-2")])),
    ]);
    let engine = DescentEngine::new(fetcher, 14);

    let records = engine.collect(vec![key("2")]).await.unwrap();

    let sources: BTreeSet<&str> = records.iter().map(|r| r.source.as_str()).collect();
    assert_eq!(records.len(), 3);
    assert_eq!(
        sources,
        BTreeSet::from([
            "https://tiles.test/20.json",
            "https://tiles.test/231.json",
            "https://tiles.test/233.json",
        ])
    );
}

// =============================================================================
// Idempotence
// =============================================================================

#[tokio::test]
async fn repeated_traversals_yield_the_same_record_set() {
    let fetcher = StubFetcher::new(vec![
        ("1", StubTile::Records(vec![cluster_record("agg")])),
        ("10", StubTile::Records(vec![outage_record("a")])),
        (
            "12",
            StubTile::Records(vec![outage_record("b"), outage_record("c")]),
        ),
    ]);
    let engine = DescentEngine::new(fetcher, 14);

    let first = engine.collect(vec![key("1")]).await.unwrap();
    let second = engine.collect(vec![key("1")]).await.unwrap();

    assert_eq!(as_set(&first), as_set(&second));
    assert_eq!(first.len(), 3);
}
