//! Driving port, consumed by the consumer controllers and the finality SDK.

use async_trait::async_trait;
use shared_types::Block;

use crate::error::GadgetResult;

/// Finality verdicts for consumer-chain blocks.
///
/// Object safe so controllers can hold an `Arc<dyn FinalityGadgetApi>`.
#[async_trait]
pub trait FinalityGadgetApi: Send + Sync {
    /// Whether `block` reached BTC-stake-backed finality.
    ///
    /// `Ok(true)` unconditionally when the gadget is disabled on its
    /// contract. Fails with `BtcStakingNotActivated` or `NoFpHasVotingPower`
    /// when no verdict is possible yet.
    async fn query_is_block_babylon_finalized(&self, block: &Block) -> GadgetResult<bool>;

    /// Unix time at which BTC staking became active for the consumer chain.
    ///
    /// Served from the activation store when recorded, computed on demand
    /// otherwise. Never writes the store.
    async fn query_btc_staking_activated_timestamp(&self) -> GadgetResult<u64>;
}
