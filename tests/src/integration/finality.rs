//! # Finality Verdict Scenarios
//!
//! Quorum boundaries and the disabled-gadget pass-through, end to end from
//! contract queries through staking and Bitcoin lookups.

use std::sync::Arc;

use fp_03_finality_gadget::{FinalityGadgetApi, GadgetError};
use serde_json::json;
use shared_types::mocks::MemoryActivationStore;
use shared_types::{Block, ClientError};

use super::{btc_time, fp, gadget_fixture};

/// A consumer block produced while BTC height 150 was the tip.
fn block() -> Block {
    Block::new(88, format!("0x{}", "ab".repeat(32)), btc_time(150) + 10)
}

fn voters(keys: &[u8]) -> serde_json::Value {
    json!(keys.iter().map(|k| fp(*k).to_hex()).collect::<Vec<_>>())
}

#[tokio::test]
async fn test_exactly_two_thirds_is_final() {
    let f = gadget_fixture(&[100, 100, 100], Arc::new(MemoryActivationStore::new()));

    f.wasm.set_response("block_voters", Some(voters(&[1, 3])));
    assert_eq!(f.gadget.query_is_block_babylon_finalized(&block()).await, Ok(true));

    f.wasm.set_response("block_voters", Some(voters(&[2])));
    assert_eq!(f.gadget.query_is_block_babylon_finalized(&block()).await, Ok(false));
}

#[tokio::test]
async fn test_one_short_of_two_thirds() {
    // T = 300: 100 + 99 = 199 misses, 100 + 101 = 201 passes.
    let f = gadget_fixture(&[100, 99, 101], Arc::new(MemoryActivationStore::new()));

    f.wasm.set_response("block_voters", Some(voters(&[1, 2])));
    assert_eq!(f.gadget.query_is_block_babylon_finalized(&block()).await, Ok(false));

    f.wasm.set_response("block_voters", Some(voters(&[1, 3])));
    assert_eq!(f.gadget.query_is_block_babylon_finalized(&block()).await, Ok(true));
}

#[tokio::test]
async fn test_votes_are_looked_up_without_hex_prefix() {
    let f = gadget_fixture(&[100, 100, 100], Arc::new(MemoryActivationStore::new()));
    f.wasm.set_response("block_voters", Some(voters(&[1, 2, 3])));

    assert_eq!(f.gadget.query_is_block_babylon_finalized(&block()).await, Ok(true));

    let (_, query) = f
        .wasm
        .queries()
        .into_iter()
        .find(|(_, q)| q.get("block_voters").is_some())
        .unwrap();
    assert_eq!(query["block_voters"]["height"], 88);
    assert_eq!(query["block_voters"]["hash_hex"], "ab".repeat(32));
}

#[tokio::test]
async fn test_disabled_gadget_passes_through() {
    let f = gadget_fixture(&[100, 100, 100], Arc::new(MemoryActivationStore::new()));
    f.wasm.set_response("is_enabled", Some(json!(false)));
    f.wasm.set_response("block_voters", Some(json!([])));
    f.babylon.fail_with(ClientError::Transport("settlement chain down".into()));
    f.btc.set_failing(true);

    assert_eq!(f.gadget.query_is_block_babylon_finalized(&block()).await, Ok(true));
}

#[tokio::test]
async fn test_block_before_activation() {
    let f = gadget_fixture(&[100, 100, 100], Arc::new(MemoryActivationStore::new()));
    let early = Block::new(3, "0x01", btc_time(60));

    assert_eq!(
        f.gadget.query_is_block_babylon_finalized(&early).await,
        Err(GadgetError::BtcStakingNotActivated)
    );
}

#[tokio::test]
async fn test_no_voting_power() {
    let f = gadget_fixture(&[0, 0], Arc::new(MemoryActivationStore::new()));
    f.wasm.set_response("block_voters", Some(voters(&[1, 2])));

    assert_eq!(
        f.gadget.query_is_block_babylon_finalized(&block()).await,
        Err(GadgetError::NoFpHasVotingPower)
    );
}
