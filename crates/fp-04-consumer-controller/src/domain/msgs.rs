//! # Message Builders
//!
//! Contract-governed backends wrap their votes in `MsgExecuteContract`; the
//! Babylon-native backend talks to the finality module directly. Both build
//! from the same decoded inputs.
//!
//! Contract payloads follow the gadget contract's execute schema, byte
//! fields base64:
//!
//! ```json
//! {"commit_public_randomness": {"fp_pubkey_hex", "start_height", "num_pub_rand", "commitment", "signature"}}
//! {"submit_finality_signature": {"fp_pubkey_hex", "height", "pub_rand", "proof", "block_hash", "signature"}}
//! ```

use serde::Serialize;
use serde_with::{base64::Base64, serde_as};
use shared_types::{Block, BlockInfo, BtcPublicKey, Proof, SendError, SettlementMsg};

use crate::error::{ControllerError, ControllerResult};

/// Execute payloads of the finality gadget contract.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractExecuteMsg {
    CommitPublicRandomness {
        fp_pubkey_hex: String,
        start_height: u64,
        num_pub_rand: u64,
        #[serde_as(as = "Base64")]
        commitment: Vec<u8>,
        #[serde_as(as = "Base64")]
        signature: Vec<u8>,
    },
    SubmitFinalitySignature {
        fp_pubkey_hex: String,
        height: u64,
        #[serde_as(as = "Base64")]
        pub_rand: Vec<u8>,
        proof: Proof,
        #[serde_as(as = "Base64")]
        block_hash: Vec<u8>,
        #[serde_as(as = "Base64")]
        signature: Vec<u8>,
    },
}

impl ContractExecuteMsg {
    pub fn commit_public_randomness(
        fp_pk: &BtcPublicKey,
        start_height: u64,
        num_pub_rand: u64,
        commitment: &[u8],
        signature: &[u8],
    ) -> Self {
        ContractExecuteMsg::CommitPublicRandomness {
            fp_pubkey_hex: fp_pk.to_hex(),
            start_height,
            num_pub_rand,
            commitment: commitment.to_vec(),
            signature: signature.to_vec(),
        }
    }

    pub fn submit_finality_signature(
        fp_pk: &BtcPublicKey,
        block: &BlockInfo,
        pub_rand: &[u8],
        proof: Proof,
        signature: &[u8],
    ) -> Self {
        ContractExecuteMsg::SubmitFinalitySignature {
            fp_pubkey_hex: fp_pk.to_hex(),
            height: block.height,
            pub_rand: pub_rand.to_vec(),
            proof,
            block_hash: block.hash.clone(),
            signature: signature.to_vec(),
        }
    }

    /// Wraps the payload into an execute message from `sender` to `contract`.
    pub fn into_settlement_msg(self, sender: String, contract: &str) -> ControllerResult<SettlementMsg> {
        let msg = serde_json::to_value(&self).map_err(|e| SendError::Encode(e.to_string()))?;
        Ok(SettlementMsg::ExecuteContract {
            sender,
            contract: contract.to_string(),
            msg,
        })
    }
}

/// Batch inputs must line up one-to-one with `blocks`.
pub fn check_batch_cardinality(
    blocks: usize,
    pub_rands: usize,
    proofs: usize,
    sigs: usize,
) -> ControllerResult<()> {
    for (what, actual) in [("finality signatures", sigs), ("public randomness", pub_rands), ("proofs", proofs)] {
        if actual != blocks {
            return Err(ControllerError::CardinalityMismatch { what, blocks, actual });
        }
    }
    Ok(())
}

/// Decodes an indexer or store block into a [`BlockInfo`].
pub fn block_info_from(block: &Block) -> ControllerResult<BlockInfo> {
    let hash = block.hash_bytes().map_err(ControllerError::InvalidBlockHash)?;
    Ok(BlockInfo::new(block.height, hash))
}
