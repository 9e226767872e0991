//! # Consumer Controller Contract
//!
//! One trait, four backends. Signatures are identical across variants, the
//! transport behind them differs:
//!
//! | Variant | Votes go to | Blocks come from |
//! |---------|-------------|------------------|
//! | Babylon | finality module | finality module |
//! | OPStackL2 / generic | gadget contract | REST indexer |
//! | wasm | gadget contract | local block store |

use async_trait::async_trait;
use shared_types::{BlockInfo, BtcPublicKey, PubRandCommit, TxResponse};

use crate::error::ControllerResult;

#[async_trait]
pub trait ConsumerController: Send + Sync {
    /// Commits `num_pub_rand` public randomness values starting at
    /// `start_height`. Range overlap is checked on chain, not here.
    async fn commit_pub_rand_list(
        &self,
        fp_pk: &BtcPublicKey,
        start_height: u64,
        num_pub_rand: u64,
        commitment: &[u8],
        sig: &[u8],
    ) -> ControllerResult<TxResponse>;

    /// Submits one finality vote. `proof` is a protobuf-encoded inclusion
    /// proof of `pub_rand` in the committed range.
    async fn submit_finality_sig(
        &self,
        fp_pk: &BtcPublicKey,
        block: &BlockInfo,
        pub_rand: &[u8],
        proof: &[u8],
        sig: &[u8],
    ) -> ControllerResult<TxResponse>;

    /// Submits one vote per block in a single transaction, in order.
    ///
    /// All slices must be as long as `blocks`; a mismatch fails before any
    /// network call.
    async fn submit_batch_finality_sigs(
        &self,
        fp_pk: &BtcPublicKey,
        blocks: &[BlockInfo],
        pub_rand_list: &[Vec<u8>],
        proof_list: &[Vec<u8>],
        sigs: &[Vec<u8>],
    ) -> ControllerResult<TxResponse>;

    /// Whether the provider has at least one active delegation.
    async fn query_finality_provider_has_power(
        &self,
        fp_pk: &BtcPublicKey,
        block_height: u64,
    ) -> ControllerResult<bool>;

    /// `None` before the first block is finalized.
    async fn query_latest_finalized_block(&self) -> ControllerResult<Option<BlockInfo>>;

    /// `None` when the provider never committed. A returned commit has been
    /// validated.
    async fn query_last_public_rand_commit(
        &self,
        fp_pk: &BtcPublicKey,
    ) -> ControllerResult<Option<PubRandCommit>>;

    async fn query_block(&self, height: u64) -> ControllerResult<BlockInfo>;

    /// Blocks `start..=min(end, start + limit - 1)` in ascending order.
    async fn query_blocks(&self, start: u64, end: u64, limit: u64) -> ControllerResult<Vec<BlockInfo>> {
        if limit == 0 || start > end {
            return Ok(Vec::new());
        }
        let last = end.min(start.saturating_add(limit - 1));
        let mut blocks = Vec::with_capacity((last - start + 1) as usize);
        for height in start..=last {
            blocks.push(self.query_block(height).await?);
        }
        Ok(blocks)
    }

    /// `true` iff `height` is at or below the latest finalized height.
    async fn query_is_block_finalized(&self, height: u64) -> ControllerResult<bool> {
        Ok(self
            .query_latest_finalized_block()
            .await?
            .is_some_and(|finalized| height <= finalized.height))
    }

    async fn query_latest_block_height(&self) -> ControllerResult<u64>;

    /// First consumer height at which BTC staking is active. Fails while it
    /// cannot be determined; callers that need a number then use
    /// `ACTIVATION_HEIGHT_UNKNOWN`.
    async fn query_activated_height(&self) -> ControllerResult<u64>;

    /// Releases the transport.
    async fn close(&self) -> ControllerResult<()>;
}
