//! # Contract-Governed Controller
//!
//! Votes and randomness are `MsgExecuteContract` calls on the consumer's
//! finality gadget contract; delegation state is read from the settlement
//! chain; blocks come from the plugged [`BlockSource`].

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use shared_types::{
    provider_has_active_delegation, BabylonQueryClient, BlockInfo, BtcPublicKey, ClientError,
    PubRandCommit, ReliableSender, SettlementMsg, TxResponse, WasmQueryClient,
};
use tracing::debug;

use crate::block_source::BlockSource;
use crate::controller::ConsumerController;
use crate::domain::{check_batch_cardinality, decode_proof, ContractExecuteMsg};
use crate::error::{ControllerError, ControllerResult};

pub struct ContractConsumerController<B, Q, W, S>
where
    B: BlockSource,
    Q: BabylonQueryClient + ?Sized,
    W: WasmQueryClient + ?Sized,
    S: ReliableSender + ?Sized,
{
    blocks: B,
    babylon: Arc<Q>,
    wasm: Arc<W>,
    sender: Arc<S>,
    contract_address: String,
}

impl<B, Q, W, S> ContractConsumerController<B, Q, W, S>
where
    B: BlockSource,
    Q: BabylonQueryClient + ?Sized,
    W: WasmQueryClient + ?Sized,
    S: ReliableSender + ?Sized,
{
    pub fn new(
        blocks: B,
        babylon: Arc<Q>,
        wasm: Arc<W>,
        sender: Arc<S>,
        contract_address: impl Into<String>,
    ) -> Self {
        Self {
            blocks,
            babylon,
            wasm,
            sender,
            contract_address: contract_address.into(),
        }
    }

    pub fn contract_address(&self) -> &str {
        &self.contract_address
    }

    fn execute(&self, payload: ContractExecuteMsg) -> ControllerResult<SettlementMsg> {
        payload.into_settlement_msg(self.sender.sender_address(), &self.contract_address)
    }

    fn vote_msg(
        &self,
        fp_pk: &BtcPublicKey,
        block: &BlockInfo,
        pub_rand: &[u8],
        proof: &[u8],
        sig: &[u8],
    ) -> ControllerResult<SettlementMsg> {
        let proof = decode_proof(proof)?;
        self.execute(ContractExecuteMsg::submit_finality_signature(
            fp_pk, block, pub_rand, proof, sig,
        ))
    }
}

#[async_trait]
impl<B, Q, W, S> ConsumerController for ContractConsumerController<B, Q, W, S>
where
    B: BlockSource,
    Q: BabylonQueryClient + ?Sized,
    W: WasmQueryClient + ?Sized,
    S: ReliableSender + ?Sized,
{
    async fn commit_pub_rand_list(
        &self,
        fp_pk: &BtcPublicKey,
        start_height: u64,
        num_pub_rand: u64,
        commitment: &[u8],
        sig: &[u8],
    ) -> ControllerResult<TxResponse> {
        let msg = self.execute(ContractExecuteMsg::commit_public_randomness(
            fp_pk,
            start_height,
            num_pub_rand,
            commitment,
            sig,
        ))?;
        Ok(self.sender.send_msgs(vec![msg], &[], &[]).await?)
    }

    async fn submit_finality_sig(
        &self,
        fp_pk: &BtcPublicKey,
        block: &BlockInfo,
        pub_rand: &[u8],
        proof: &[u8],
        sig: &[u8],
    ) -> ControllerResult<TxResponse> {
        let msg = self.vote_msg(fp_pk, block, pub_rand, proof, sig)?;
        let res = self.sender.send_msgs(vec![msg], &[], &[]).await?;
        debug!(height = block.height, block_hash = %block.hash_hex(), "[fp-04] Submitted finality signature");
        Ok(res)
    }

    async fn submit_batch_finality_sigs(
        &self,
        fp_pk: &BtcPublicKey,
        blocks: &[BlockInfo],
        pub_rand_list: &[Vec<u8>],
        proof_list: &[Vec<u8>],
        sigs: &[Vec<u8>],
    ) -> ControllerResult<TxResponse> {
        check_batch_cardinality(blocks.len(), pub_rand_list.len(), proof_list.len(), sigs.len())?;

        let mut msgs = Vec::with_capacity(blocks.len());
        for (i, block) in blocks.iter().enumerate() {
            msgs.push(self.vote_msg(fp_pk, block, &pub_rand_list[i], &proof_list[i], &sigs[i])?);
        }

        let res = self.sender.send_msgs(msgs, &[], &[]).await?;
        if let (Some(first), Some(last)) = (blocks.first(), blocks.last()) {
            debug!(start_height = first.height, end_height = last.height, "[fp-04] Submitted finality signatures in a batch");
        }
        Ok(res)
    }

    async fn query_finality_provider_has_power(
        &self,
        fp_pk: &BtcPublicKey,
        _block_height: u64,
    ) -> ControllerResult<bool> {
        Ok(provider_has_active_delegation(self.babylon.as_ref(), fp_pk).await?)
    }

    async fn query_latest_finalized_block(&self) -> ControllerResult<Option<BlockInfo>> {
        self.blocks.latest_finalized_block().await
    }

    async fn query_last_public_rand_commit(
        &self,
        fp_pk: &BtcPublicKey,
    ) -> ControllerResult<Option<PubRandCommit>> {
        let query = json!({"last_pub_rand_commit": {"btc_pk_hex": fp_pk.to_hex()}});
        let Some(raw) = self
            .wasm
            .query_smart_contract_state(&self.contract_address, &query)
            .await?
        else {
            return Ok(None);
        };

        let commit: Option<PubRandCommit> =
            serde_json::from_slice(&raw).map_err(ClientError::from)?;
        let Some(commit) = commit else {
            return Ok(None);
        };
        commit.validate().map_err(ControllerError::InvalidPubRandCommit)?;
        Ok(Some(commit))
    }

    async fn query_block(&self, height: u64) -> ControllerResult<BlockInfo> {
        self.blocks.block(height).await
    }

    async fn query_latest_block_height(&self) -> ControllerResult<u64> {
        self.blocks.latest_block_height().await
    }

    async fn query_activated_height(&self) -> ControllerResult<u64> {
        self.blocks.activated_height().await
    }

    async fn close(&self) -> ControllerResult<()> {
        Ok(self.sender.stop().await?)
    }
}
