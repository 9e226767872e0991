//! # Consumer Controller Scenarios
//!
//! 1. Mismatched batch inputs fail before anything reaches the network
//! 2. Blocks committed through the finality SDK are what the store-backed
//!    controller serves
//! 3. A malformed commit never reaches the store

use std::sync::Arc;

use async_trait::async_trait;
use fp_02_block_store::FinalityDb;
use fp_03_finality_gadget::FinalityGadgetApi;
use fp_04_consumer_controller::{
    new_consumer_controller, BabylonConsumerController, ConsumerController, ContractConsumerController,
    ControllerConfig, ControllerDeps, ControllerError, StoreBlockSource,
};
use fp_05_finality_sdk::{BlockVerifier, FinalitySdk, FinalitySdkApi, SdkError};
use serde_json::json;
use shared_types::mocks::{MemoryActivationStore, MockBabylonClient, MockWasmClient, RecordingSender};
use shared_types::{BlockInfo, ClientError};

use super::{btc_time, fp, gadget_fixture};

fn three_blocks() -> Vec<BlockInfo> {
    (10..13).map(|h| BlockInfo::new(h, vec![h as u8; 32])).collect()
}

async fn submit_three_blocks_two_sigs(cc: &dyn ConsumerController) -> Result<(), ControllerError> {
    let blocks = three_blocks();
    cc.submit_batch_finality_sigs(
        &fp(1),
        &blocks,
        &vec![vec![1; 32]; 3],
        &vec![vec![2; 8]; 3],
        &vec![vec![3; 64]; 2],
    )
    .await
    .map(|_| ())
}

fn mismatch() -> ControllerError {
    ControllerError::CardinalityMismatch {
        what: "finality signatures",
        blocks: 3,
        actual: 2,
    }
}

#[tokio::test]
async fn test_batch_mismatch_babylon_backend() {
    let babylon = Arc::new(MockBabylonClient::new());
    babylon.fail_with(ClientError::Transport("must not be called".into()));
    let sender = Arc::new(RecordingSender::new("bbn1fp"));
    let cc = BabylonConsumerController::new(babylon, sender.clone());

    assert_eq!(submit_three_blocks_two_sigs(&cc).await, Err(mismatch()));
    assert_eq!(sender.send_count(), 0);
}

#[tokio::test]
async fn test_batch_mismatch_contract_backend() {
    let wasm = Arc::new(MockWasmClient::new());
    let sender = Arc::new(RecordingSender::new("bbn1fp"));
    let cc = ContractConsumerController::new(
        StoreBlockSource::new(Arc::new(FinalityDb::in_memory())),
        Arc::new(MockBabylonClient::new()),
        wasm.clone(),
        sender.clone(),
        "bbn1finality",
    );

    assert_eq!(submit_three_blocks_two_sigs(&cc).await, Err(mismatch()));
    assert_eq!(sender.send_count(), 0);
    assert!(wasm.queries().is_empty());
}

struct AcceptAll;

#[async_trait]
impl BlockVerifier for AcceptAll {
    async fn verify_block(&self, _height: u64, _hash: &str, _timestamp: u64) -> Result<bool, ClientError> {
        Ok(true)
    }
}

fn hash(height: u64) -> String {
    format!("0x{height:064x}")
}

fn wasm_controller(db: Arc<FinalityDb>) -> Box<dyn ConsumerController> {
    let mut config = ControllerConfig {
        chain_type: "wasm".into(),
        ..Default::default()
    };
    config.babylon.account_address = "bbn1fp".into();
    config.cosmwasm.finality_contract_address = "bbn1finality".into();
    let deps = ControllerDeps {
        gadget: None,
        db: Some(db),
    };
    new_consumer_controller(&config, &deps).unwrap()
}

#[tokio::test]
async fn test_sdk_feeds_store_backed_controller() {
    let db = Arc::new(FinalityDb::in_memory());
    let fixture = gadget_fixture(&[100, 100, 100], Arc::new(MemoryActivationStore::new()));
    fixture.wasm.set_response(
        "block_voters",
        Some(json!([fp(1).to_hex(), fp(2).to_hex()])),
    );
    let gadget: Arc<dyn FinalityGadgetApi> = Arc::new(fixture.gadget);
    let sdk = FinalitySdk::new(Arc::new(AcceptAll), db.clone(), gadget);

    for height in 1..=5 {
        sdk.commit(height, &hash(height), btc_time(150) + height).await.unwrap();
    }
    assert!(sdk.query(3).await.unwrap());

    let cc = wasm_controller(db);

    let mut expected_hash = [0u8; 32];
    expected_hash[31] = 3;
    assert_eq!(cc.query_block(3).await.unwrap(), BlockInfo::new(3, expected_hash.to_vec()));
    assert_eq!(cc.query_latest_block_height().await.unwrap(), 5);
    assert_eq!(cc.query_latest_finalized_block().await.unwrap().map(|b| b.height), Some(5));
    assert!(cc.query_is_block_finalized(5).await.unwrap());
    assert!(!cc.query_is_block_finalized(6).await.unwrap());
    assert_eq!(cc.query_activated_height().await.unwrap(), 0);

    let heights: Vec<u64> = cc
        .query_blocks(2, 10, 3)
        .await
        .unwrap()
        .into_iter()
        .map(|b| b.height)
        .collect();
    assert_eq!(heights, vec![2, 3, 4]);
}

#[tokio::test]
async fn test_short_hash_commit_keeps_store_readable() {
    let db = Arc::new(FinalityDb::in_memory());
    let fixture = gadget_fixture(&[100], Arc::new(MemoryActivationStore::new()));
    let gadget: Arc<dyn FinalityGadgetApi> = Arc::new(fixture.gadget);
    let sdk = FinalitySdk::new(Arc::new(AcceptAll), db.clone(), gadget);

    sdk.commit(1, &hash(1), btc_time(150)).await.unwrap();
    assert!(matches!(
        sdk.commit(2, "0xabcd", btc_time(150) + 1).await,
        Err(SdkError::InvalidBlock(_))
    ));
    assert_eq!(sdk.latest_block().await.unwrap().height, 1);

    let cc = wasm_controller(db);
    assert_eq!(cc.query_latest_finalized_block().await.unwrap().map(|b| b.height), Some(1));
    assert!(cc.query_is_block_finalized(1).await.unwrap());
    assert_eq!(cc.query_latest_block_height().await.unwrap(), 1);
}

#[tokio::test]
async fn test_factory_rejects_unknown_chain() {
    let config = ControllerConfig {
        chain_type: "cosmos".into(),
        ..Default::default()
    };
    let err = new_consumer_controller(&config, &ControllerDeps::default()).err().unwrap();
    assert_eq!(err, ControllerError::UnsupportedConsumerChain("cosmos".into()));
}
