//! Integration scenarios and the fixtures they share.

pub mod activation;
pub mod controller;
pub mod finality;

use std::sync::Arc;
use std::time::Duration;

use fp_03_finality_gadget::{CwGadgetContract, FinalityGadget};
use serde_json::json;
use shared_types::mocks::{delegation, MockBabylonClient, MockBitcoinClient, MockWasmClient};
use shared_types::{ActivationTimestampStore, BtcPublicKey};

pub const CONSUMER_ID: &str = "op-stack-l2-706114";
pub const BTC_GENESIS_TIME: u64 = 1_700_000_000;
pub const BTC_SPACING: u64 = 600;

pub fn fp(byte: u8) -> BtcPublicKey {
    BtcPublicKey::from_bytes([byte; 32])
}

/// Settlement chain, contract and Bitcoin doubles behind one gadget.
pub struct GadgetFixture<S: ActivationTimestampStore> {
    pub wasm: Arc<MockWasmClient>,
    pub babylon: Arc<MockBabylonClient>,
    pub btc: Arc<MockBitcoinClient>,
    pub gadget: FinalityGadget<CwGadgetContract<MockWasmClient>, MockBabylonClient, MockBitcoinClient, S>,
}

/// Providers `fp(1..)` with the given powers, each with one active
/// delegation starting at BTC height 100. BTC headers cover 1..=300.
pub fn gadget_fixture<S: ActivationTimestampStore>(powers: &[u64], store: Arc<S>) -> GadgetFixture<S> {
    let wasm = Arc::new(MockWasmClient::new());
    wasm.set_response("is_enabled", Some(json!(true)));
    wasm.set_response("config", Some(json!({ "consumer_id": CONSUMER_ID })));
    wasm.set_response("block_voters", None);

    let babylon = Arc::new(MockBabylonClient::new().with_quorum(2));
    let fps: Vec<_> = (1..=powers.len() as u8).map(fp).collect();
    babylon.register_consumer_fps(CONSUMER_ID, fps.clone());
    for (key, power) in fps.into_iter().zip(powers) {
        babylon.add_delegations(key, vec![delegation(100, 2, 2, 2, false)]);
        babylon.set_power(key, *power);
    }

    let btc = Arc::new(MockBitcoinClient::with_chain(1, 300, BTC_GENESIS_TIME, BTC_SPACING));
    let gadget = FinalityGadget::new(
        CwGadgetContract::new(wasm.clone(), "bbn1gadget"),
        babylon.clone(),
        btc.clone(),
        store,
        Duration::from_secs(30),
    );

    GadgetFixture {
        wasm,
        babylon,
        btc,
        gadget,
    }
}

/// Unix time of BTC header `height` in every fixture.
pub fn btc_time(height: u64) -> u64 {
    BTC_GENESIS_TIME + (height - 1) * BTC_SPACING
}
