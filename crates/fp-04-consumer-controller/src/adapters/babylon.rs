//! # Babylon-Native Controller
//!
//! The consumer is the settlement chain itself: votes and randomness go to
//! the finality module, blocks are read from its block index.

use std::sync::Arc;

use async_trait::async_trait;
use shared_types::{
    provider_has_active_delegation, BabylonQueryClient, BlockInfo, BtcPublicKey, ChainErrorCode,
    PubRandCommit, ReliableSender, SettlementMsg, TxResponse,
};
use tracing::debug;

use crate::controller::ConsumerController;
use crate::domain::{check_batch_cardinality, decode_proof};
use crate::error::{ControllerError, ControllerResult};

/// Vote already cast for this height.
pub const ERR_DUPLICATED_FINALITY_SIG: ChainErrorCode = ChainErrorCode::new("finality", 1107);
/// The chain refused the EOTS signature.
pub const ERR_INVALID_FINALITY_SIG: ChainErrorCode = ChainErrorCode::new("finality", 1108);
/// The provider has been slashed and can no longer vote.
pub const ERR_FP_ALREADY_SLASHED: ChainErrorCode = ChainErrorCode::new("btcstaking", 1110);

const EXPECTED_VOTE_ERRS: &[ChainErrorCode] = &[ERR_DUPLICATED_FINALITY_SIG];
const UNRECOVERABLE_VOTE_ERRS: &[ChainErrorCode] = &[ERR_INVALID_FINALITY_SIG, ERR_FP_ALREADY_SLASHED];

pub struct BabylonConsumerController<Q, S>
where
    Q: BabylonQueryClient + ?Sized,
    S: ReliableSender + ?Sized,
{
    client: Arc<Q>,
    sender: Arc<S>,
}

impl<Q, S> BabylonConsumerController<Q, S>
where
    Q: BabylonQueryClient + ?Sized,
    S: ReliableSender + ?Sized,
{
    pub fn new(client: Arc<Q>, sender: Arc<S>) -> Self {
        Self { client, sender }
    }

    fn vote_msg(
        &self,
        fp_pk: &BtcPublicKey,
        block: &BlockInfo,
        pub_rand: &[u8],
        proof: &[u8],
        sig: &[u8],
    ) -> ControllerResult<SettlementMsg> {
        Ok(SettlementMsg::AddFinalitySig {
            signer: self.sender.sender_address(),
            fp_btc_pk: *fp_pk,
            block_height: block.height,
            pub_rand: pub_rand.to_vec(),
            proof: decode_proof(proof)?,
            block_app_hash: block.hash.clone(),
            finality_sig: sig.to_vec(),
        })
    }

    async fn send_votes(&self, msgs: Vec<SettlementMsg>) -> ControllerResult<TxResponse> {
        Ok(self
            .sender
            .send_msgs(msgs, EXPECTED_VOTE_ERRS, UNRECOVERABLE_VOTE_ERRS)
            .await?)
    }
}

#[async_trait]
impl<Q, S> ConsumerController for BabylonConsumerController<Q, S>
where
    Q: BabylonQueryClient + ?Sized,
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
        let msg = SettlementMsg::CommitPubRandList {
            signer: self.sender.sender_address(),
            fp_btc_pk: *fp_pk,
            start_height,
            num_pub_rand,
            commitment: commitment.to_vec(),
            sig: sig.to_vec(),
        };
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
        let res = self.send_votes(vec![msg]).await?;
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

        let msgs = blocks
            .iter()
            .enumerate()
            .map(|(i, block)| self.vote_msg(fp_pk, block, &pub_rand_list[i], &proof_list[i], &sigs[i]))
            .collect::<ControllerResult<Vec<_>>>()?;

        let res = self.send_votes(msgs).await?;
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
        Ok(provider_has_active_delegation(self.client.as_ref(), fp_pk).await?)
    }

    async fn query_latest_finalized_block(&self) -> ControllerResult<Option<BlockInfo>> {
        Ok(self.client.latest_finalized_block().await?.map(BlockInfo::from))
    }

    async fn query_last_public_rand_commit(
        &self,
        fp_pk: &BtcPublicKey,
    ) -> ControllerResult<Option<PubRandCommit>> {
        let Some(commit) = self.client.last_pub_rand_commit(fp_pk).await? else {
            return Ok(None);
        };
        commit.validate().map_err(ControllerError::InvalidPubRandCommit)?;
        Ok(Some(commit))
    }

    async fn query_block(&self, height: u64) -> ControllerResult<BlockInfo> {
        Ok(self.client.indexed_block(height).await?.into())
    }

    async fn query_latest_block_height(&self) -> ControllerResult<u64> {
        Ok(self.client.latest_height().await?)
    }

    async fn query_activated_height(&self) -> ControllerResult<u64> {
        Ok(self.client.activated_height().await?)
    }

    async fn close(&self) -> ControllerResult<()> {
        Ok(self.sender.stop().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::proof::CmtProof;
    use prost::Message;
    use shared_types::mocks::{delegation, MockBabylonClient, RecordingSender};
    use shared_types::{ClientError, IndexedBlock, Proof, SendError};

    fn pk() -> BtcPublicKey {
        BtcPublicKey::from_bytes([3; 32])
    }

    fn proof_bytes() -> Vec<u8> {
        CmtProof::from(Proof {
            total: 2,
            index: 1,
            leaf_hash: vec![5; 32],
            aunts: vec![vec![6; 32]],
        })
        .encode_to_vec()
    }

    fn controller() -> (
        Arc<MockBabylonClient>,
        Arc<RecordingSender>,
        BabylonConsumerController<MockBabylonClient, RecordingSender>,
    ) {
        let client = Arc::new(MockBabylonClient::new().with_quorum(1));
        let sender = Arc::new(RecordingSender::new("bbn1fp"));
        let cc = BabylonConsumerController::new(client.clone(), sender.clone());
        (client, sender, cc)
    }

    #[tokio::test]
    async fn test_vote_goes_to_finality_module() {
        let (_, sender, cc) = controller();
        let block = BlockInfo::new(10, vec![1; 32]);

        let res = cc
            .submit_finality_sig(&pk(), &block, &[2; 32], &proof_bytes(), &[4; 32])
            .await
            .unwrap();
        assert!(res.is_committed());

        let batches = sender.batches();
        let SettlementMsg::AddFinalitySig { signer, block_height, proof, .. } = &batches[0][0] else {
            panic!("expected AddFinalitySig");
        };
        assert_eq!(signer, "bbn1fp");
        assert_eq!(*block_height, 10);
        assert_eq!(proof.index, 1);
    }

    #[tokio::test]
    async fn test_malformed_proof_sends_nothing() {
        let (_, sender, cc) = controller();
        let block = BlockInfo::new(10, vec![1; 32]);

        let err = cc
            .submit_finality_sig(&pk(), &block, &[2; 32], &[0xff, 0x01], &[4; 32])
            .await
            .unwrap_err();
        assert!(matches!(err, ControllerError::ProofDecode(_)));
        assert_eq!(sender.send_count(), 0);
    }

    #[tokio::test]
    async fn test_batch_preserves_order() {
        let (_, sender, cc) = controller();
        let blocks: Vec<_> = (1..=3).map(|h| BlockInfo::new(h, vec![h as u8; 32])).collect();
        let n = blocks.len();

        cc.submit_batch_finality_sigs(&pk(), &blocks, &vec![vec![0; 32]; n], &vec![proof_bytes(); n], &vec![vec![0; 64]; n])
            .await
            .unwrap();

        let heights: Vec<u64> = sender.batches()[0]
            .iter()
            .map(|m| match m {
                SettlementMsg::AddFinalitySig { block_height, .. } => *block_height,
                _ => 0,
            })
            .collect();
        assert_eq!(heights, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_queries_map_module_state() {
        let (client, _, cc) = controller();
        client.insert_block(IndexedBlock { height: 5, app_hash: vec![5; 32], finalized: true });
        client.insert_block(IndexedBlock { height: 6, app_hash: vec![6; 32], finalized: false });
        client.set_latest_height(6);
        client.set_activated_height(3);
        client.add_delegations(pk(), vec![delegation(1, 1, 1, 1, false)]);

        assert_eq!(cc.query_block(6).await.unwrap(), BlockInfo::new(6, vec![6; 32]));
        assert_eq!(cc.query_latest_finalized_block().await.unwrap().map(|b| b.height), Some(5));
        assert!(cc.query_is_block_finalized(5).await.unwrap());
        assert!(!cc.query_is_block_finalized(6).await.unwrap());
        assert_eq!(cc.query_latest_block_height().await.unwrap(), 6);
        assert_eq!(cc.query_activated_height().await.unwrap(), 3);
        assert!(cc.query_finality_provider_has_power(&pk(), 6).await.unwrap());
        assert_eq!(cc.query_blocks(5, 9, 10).await.unwrap_err(), ControllerError::Client(ClientError::NotFound("block 7".into())));
        assert_eq!(cc.query_blocks(5, 6, 10).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_invalid_commit_is_an_error() {
        let (client, _, cc) = controller();
        assert_eq!(cc.query_last_public_rand_commit(&pk()).await, Ok(None));

        client.set_pub_rand_commit(
            pk(),
            PubRandCommit { start_height: 10, num_pub_rand: 0, commitment: vec![0; 32] },
        );
        assert!(matches!(
            cc.query_last_public_rand_commit(&pk()).await,
            Err(ControllerError::InvalidPubRandCommit(_))
        ));
    }

    #[tokio::test]
    async fn test_close_stops_sender() {
        let (_, sender, cc) = controller();
        cc.close().await.unwrap();
        assert!(sender.is_stopped());

        let err = cc.commit_pub_rand_list(&pk(), 1, 10, &[0; 32], &[0; 64]).await.unwrap_err();
        assert_eq!(err, ControllerError::Submission(SendError::Stopped));
    }
}
