//! Inclusion proofs arrive as protobuf-encoded CometBFT `crypto.Proof`
//! messages and are re-encoded field by field into the settlement messages.

use prost::Message;
use shared_types::Proof;

use crate::error::{ControllerError, ControllerResult};

/// Wire form of `tendermint.crypto.Proof`.
#[derive(Clone, PartialEq, Message)]
pub struct CmtProof {
    #[prost(int64, tag = "1")]
    pub total: i64,
    #[prost(int64, tag = "2")]
    pub index: i64,
    #[prost(bytes = "vec", tag = "3")]
    pub leaf_hash: Vec<u8>,
    #[prost(bytes = "vec", repeated, tag = "4")]
    pub aunts: Vec<Vec<u8>>,
}

impl From<Proof> for CmtProof {
    fn from(proof: Proof) -> Self {
        Self {
            total: proof.total as i64,
            index: proof.index as i64,
            leaf_hash: proof.leaf_hash,
            aunts: proof.aunts,
        }
    }
}

/// Decodes and sanity-checks a proof. `index` must lie in `[0, total)`.
pub fn decode_proof(bytes: &[u8]) -> ControllerResult<Proof> {
    let raw = CmtProof::decode(bytes).map_err(|e| ControllerError::ProofDecode(e.to_string()))?;

    if raw.total <= 0 || raw.index < 0 || raw.index >= raw.total {
        return Err(ControllerError::ProofDecode(format!(
            "index {} out of range for total {}",
            raw.index, raw.total
        )));
    }

    Ok(Proof {
        total: raw.total as u64,
        index: raw.index as u64,
        leaf_hash: raw.leaf_hash,
        aunts: raw.aunts,
    })
}
