//! Settlement-chain messages and chain error codes.

use serde::{Deserialize, Serialize};
use serde_with::{base64::Base64, serde_as};

use crate::entities::{BtcPublicKey, Proof};

/// A message submitted to the settlement chain.
///
/// Serialized with its protobuf type URL under `@type` so an external signer
/// can pack it into a transaction unchanged.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "@type")]
pub enum SettlementMsg {
    /// Execute a JSON message on a smart contract.
    #[serde(rename = "/cosmwasm.wasm.v1.MsgExecuteContract")]
    ExecuteContract {
        sender: String,
        contract: String,
        msg: serde_json::Value,
    },

    /// Commit a range of public randomness to the finality module.
    #[serde(rename = "/babylon.finality.v1.MsgCommitPubRandList")]
    CommitPubRandList {
        signer: String,
        fp_btc_pk: BtcPublicKey,
        start_height: u64,
        num_pub_rand: u64,
        #[serde_as(as = "Base64")]
        commitment: Vec<u8>,
        #[serde_as(as = "Base64")]
        sig: Vec<u8>,
    },

    /// Cast a finality vote on the finality module.
    #[serde(rename = "/babylon.finality.v1.MsgAddFinalitySig")]
    AddFinalitySig {
        signer: String,
        fp_btc_pk: BtcPublicKey,
        block_height: u64,
        #[serde_as(as = "Base64")]
        pub_rand: Vec<u8>,
        proof: Proof,
        #[serde_as(as = "Base64")]
        block_app_hash: Vec<u8>,
        #[serde_as(as = "Base64")]
        finality_sig: Vec<u8>,
    },
}

impl SettlementMsg {
    /// Short name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            SettlementMsg::ExecuteContract { .. } => "execute_contract",
            SettlementMsg::CommitPubRandList { .. } => "commit_pub_rand_list",
            SettlementMsg::AddFinalitySig { .. } => "add_finality_sig",
        }
    }
}

/// A registered chain error, identified by module codespace and code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChainErrorCode {
    pub codespace: &'static str,
    pub code: u32,
}

impl ChainErrorCode {
    pub const fn new(codespace: &'static str, code: u32) -> Self {
        Self { codespace, code }
    }

    pub fn matches(&self, codespace: &str, code: u32) -> bool {
        self.codespace == codespace && self.code == code
    }
}

/// Whether any code in `set` matches the reported error.
pub fn contains_code(set: &[ChainErrorCode], codespace: &str, code: u32) -> bool {
    set.iter().any(|c| c.matches(codespace, code))
}
