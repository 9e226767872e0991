//! # Activation Scenarios
//!
//! 1. Timestamp → consumer height over a live REST indexer
//! 2. Activation timestamp → activated height through the gadget
//! 3. Recorder writes once; later runs and the accessor keep the first value

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use fp_01_chain_clients::IndexerClient;
use fp_02_block_store::{FinalityDb, StoreBackend, StoreConfig};
use fp_03_finality_gadget::{FinalityGadgetApi, RecorderExit};
use fp_04_consumer_controller::{block_height_by_timestamp, BlockSource, ControllerError, IndexerBlockSource};
use serde_json::{json, Value};
use shared_types::mocks::delegation;
use shared_types::ActivationTimestampStore;
use tokio::sync::watch;

use super::{btc_time, fp, gadget_fixture};

const NAMESPACE: &str = "op-test";
const HEAD: u64 = 1000;
const BLOCK_TIME: u64 = 2;

/// Consumer chain whose block 500 carries the fixtures' activation time.
fn consumer_time(height: u64) -> u64 {
    btc_time(100) - 500 * BLOCK_TIME + height * BLOCK_TIME
}

#[derive(Clone, Default)]
struct IndexerState {
    block_requests: Arc<AtomicUsize>,
}

fn envelope(height: u64) -> Json<Value> {
    Json(json!({
        "data": {
            "height": height,
            "hash": format!("0x{height:064x}"),
            "timestamp": consumer_time(height),
        },
        "error": "",
    }))
}

async fn get_block(State(state): State<IndexerState>, Query(q): Query<HashMap<String, String>>) -> Json<Value> {
    state.block_requests.fetch_add(1, Ordering::SeqCst);
    match q.get("height").and_then(|h| h.parse::<u64>().ok()) {
        Some(h) if (1..=HEAD).contains(&h) => envelope(h),
        _ => Json(json!({"data": null, "error": "block not found"})),
    }
}

/// Serves `HEAD` blocks under `NAMESPACE` and returns a client for them.
async fn start_indexer() -> (IndexerClient, IndexerState) {
    let state = IndexerState::default();
    let router = Router::new()
        .route("/v1/api/get-block", get(get_block))
        .route("/v1/api/latest-block", get(|| async { envelope(HEAD) }))
        .route("/v1/api/finalized-block", get(|| async { envelope(HEAD - 10) }))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    let client = IndexerClient::new(&format!("http://{addr}"), NAMESPACE, Duration::from_secs(5)).unwrap();
    (client, state)
}

#[tokio::test]
async fn test_exact_match_short_circuits() {
    let (indexer, state) = start_indexer().await;

    let height = block_height_by_timestamp(&indexer, consumer_time(500)).await.unwrap();

    assert_eq!(height, 500);
    // Block 1 for the lower bound, then the first midpoint hits.
    assert_eq!(state.block_requests.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_locator_bounds_over_http() {
    let (indexer, _state) = start_indexer().await;

    assert_eq!(block_height_by_timestamp(&indexer, 0).await.unwrap(), 1);
    assert_eq!(block_height_by_timestamp(&indexer, consumer_time(737) - 1).await.unwrap(), 737);
    assert_eq!(block_height_by_timestamp(&indexer, consumer_time(HEAD)).await.unwrap(), HEAD);
    assert_eq!(
        block_height_by_timestamp(&indexer, consumer_time(HEAD) + 1).await,
        Err(ControllerError::TimestampInFuture {
            target: consumer_time(HEAD) + 1,
            latest: consumer_time(HEAD),
        })
    );
}

#[tokio::test]
async fn test_activated_height_from_gadget() {
    let (indexer, _state) = start_indexer().await;
    let fixture = gadget_fixture(&[100, 100, 100], Arc::new(FinalityDb::in_memory()));
    let source = IndexerBlockSource::new(indexer, Arc::new(fixture.gadget));

    assert_eq!(source.activated_height().await.unwrap(), 500);
    assert_eq!(source.latest_block_height().await.unwrap(), HEAD - 10);
    assert_eq!(source.latest_finalized_block().await.unwrap().unwrap().height, HEAD - 10);
}

#[tokio::test(start_paused = true)]
async fn test_recorder_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let store_config = StoreConfig {
        backend: StoreBackend::File,
        path: dir.path().to_path_buf(),
    };
    let db = Arc::new(FinalityDb::open(&store_config).unwrap());
    let fixture = gadget_fixture(&[100, 100, 100], db.clone());
    let (_tx, rx) = watch::channel(false);

    let first = fixture.gadget.run_activation_recorder(rx.clone()).await;
    assert_eq!(first, RecorderExit::Recorded(btc_time(100)));

    // An earlier delegation appears; recomputation would now move the
    // activation back, the stored value must not.
    fixture
        .babylon
        .add_delegations(fp(1), vec![delegation(40, 2, 2, 2, false)]);
    assert_eq!(fixture.gadget.compute_activation_timestamp().await.unwrap(), btc_time(40));

    let second = fixture.gadget.run_activation_recorder(rx).await;
    assert_eq!(second, RecorderExit::AlreadyRecorded(btc_time(100)));
    assert_eq!(
        fixture.gadget.query_btc_staking_activated_timestamp().await.unwrap(),
        btc_time(100)
    );

    drop(fixture);
    drop(db);
    let reopened = FinalityDb::open(&store_config).unwrap();
    assert_eq!(reopened.get_activated_timestamp().unwrap(), Some(btc_time(100)));
}

#[tokio::test(start_paused = true)]
async fn test_recorder_waits_for_activation() {
    let db = Arc::new(FinalityDb::in_memory());
    // No registered providers: staking never activates.
    let fixture = gadget_fixture(&[], db.clone());
    let (tx, rx) = watch::channel(false);
    let recorder = tokio::spawn(async move { fixture.gadget.run_activation_recorder(rx).await });

    tokio::time::sleep(Duration::from_secs(95)).await;
    tx.send(true).unwrap();

    assert_eq!(recorder.await.unwrap(), RecorderExit::Cancelled);
    assert_eq!(db.get_activated_timestamp().unwrap(), None);
}
