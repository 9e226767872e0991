//! # Core Domain Entities
//!
//! Blocks, randomness commitments, inclusion proofs and provider keys.
//!
//! ## Clusters
//!
//! - **Consumer chain**: [`BlockInfo`], [`Block`], [`IndexedBlock`]
//! - **Finality votes**: [`PubRandCommit`], [`Proof`], [`TxResponse`]
//! - **Identity**: [`BtcPublicKey`]

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_with::{base64::Base64, serde_as, DisplayFromStr, PickFirst};

use crate::errors::ValidationError;

/// Size of a public randomness commitment (a Merkle root over the values).
pub const COMMITMENT_LEN: usize = 32;

/// Digest width of every supported consumer chain.
pub const BLOCK_HASH_LEN: usize = 32;

/// Sentinel returned alongside an error when the activation height of a
/// consumer chain cannot be determined yet.
pub const ACTIVATION_HEIGHT_UNKNOWN: u64 = u64::MAX;

// =============================================================================
// CLUSTER A: CONSUMER CHAIN BLOCKS
// =============================================================================

/// A consumer-chain block as attested by a finality provider.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct BlockInfo {
    /// Block height.
    pub height: u64,
    /// Native block digest.
    #[serde_as(as = "serde_with::hex::Hex")]
    pub hash: Vec<u8>,
}

impl BlockInfo {
    pub fn new(height: u64, hash: impl Into<Vec<u8>>) -> Self {
        Self {
            height,
            hash: hash.into(),
        }
    }

    /// Lowercase hex of the hash without prefix.
    pub fn hash_hex(&self) -> String {
        hex::encode(&self.hash)
    }
}

/// A consumer-chain block as reported to the finality gadget.
///
/// The hash stays in the textual form the chain reported it in, which may
/// carry a `0x` prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Block {
    #[serde(rename = "block_height")]
    pub height: u64,
    #[serde(rename = "block_hash")]
    pub hash: String,
    #[serde(rename = "block_timestamp")]
    pub timestamp: u64,
}

impl Block {
    pub fn new(height: u64, hash: impl Into<String>, timestamp: u64) -> Self {
        Self {
            height,
            hash: hash.into(),
            timestamp,
        }
    }

    /// The hash with any `0x` prefix removed.
    pub fn normalized_hash(&self) -> &str {
        strip_hex_prefix(&self.hash)
    }

    /// Decodes the hash, which must be hex of exactly [`BLOCK_HASH_LEN`] bytes.
    pub fn hash_bytes(&self) -> Result<Vec<u8>, ValidationError> {
        let bytes = hex::decode(self.normalized_hash())
            .map_err(|e| ValidationError::InvalidBlockHash(e.to_string()))?;
        if bytes.len() != BLOCK_HASH_LEN {
            return Err(ValidationError::InvalidBlockHash(format!(
                "expected {BLOCK_HASH_LEN} bytes, got {}",
                bytes.len()
            )));
        }
        Ok(bytes)
    }
}

/// A block as indexed by the settlement chain's finality module.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct IndexedBlock {
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub height: u64,
    #[serde_as(as = "Base64")]
    pub app_hash: Vec<u8>,
    #[serde(default)]
    pub finalized: bool,
}

impl From<IndexedBlock> for BlockInfo {
    fn from(block: IndexedBlock) -> Self {
        BlockInfo::new(block.height, block.app_hash)
    }
}

/// Removes an optional `0x` / `0X` prefix from a hex string.
pub fn strip_hex_prefix(value: &str) -> &str {
    value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value)
}

// =============================================================================
// CLUSTER B: FINALITY VOTES
// =============================================================================

/// A provider's committed range of public randomness.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PubRandCommit {
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub start_height: u64,
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub num_pub_rand: u64,
    #[serde_as(as = "Base64")]
    pub commitment: Vec<u8>,
}

impl PubRandCommit {
    /// Checks the range is non-empty and the commitment is well formed.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.num_pub_rand < 1 {
            return Err(ValidationError::EmptyPubRandRange);
        }
        if self.commitment.len() != COMMITMENT_LEN {
            return Err(ValidationError::CommitmentLength {
                expected: COMMITMENT_LEN,
                actual: self.commitment.len(),
            });
        }
        Ok(())
    }

    /// Last height covered by this commit.
    pub fn end_height(&self) -> u64 {
        self.start_height
            .saturating_add(self.num_pub_rand)
            .saturating_sub(1)
    }
}

/// Merkle inclusion proof for one public randomness value.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Proof {
    pub total: u64,
    pub index: u64,
    #[serde_as(as = "Base64")]
    pub leaf_hash: Vec<u8>,
    #[serde_as(as = "Vec<Base64>")]
    pub aunts: Vec<Vec<u8>>,
}

/// Outcome of a settlement-chain submission.
///
/// `tx_hash` is `None` when the submission hit an expected error and was
/// skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TxResponse {
    pub tx_hash: Option<String>,
}

impl TxResponse {
    pub fn committed(tx_hash: impl Into<String>) -> Self {
        Self {
            tx_hash: Some(tx_hash.into()),
        }
    }

    pub fn skipped() -> Self {
        Self { tx_hash: None }
    }

    pub fn is_committed(&self) -> bool {
        self.tx_hash.is_some()
    }
}

// =============================================================================
// CLUSTER C: IDENTITY
// =============================================================================

/// BIP-340 x-only public key of a finality provider.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BtcPublicKey([u8; 32]);

impl BtcPublicKey {
    pub const LEN: usize = 32;

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn from_hex(value: &str) -> Result<Self, ValidationError> {
        let bytes = hex::decode(strip_hex_prefix(value))
            .map_err(|e| ValidationError::InvalidPublicKey(e.to_string()))?;
        let bytes: [u8; 32] = bytes.try_into().map_err(|b: Vec<u8>| {
            ValidationError::InvalidPublicKey(format!("expected 32 bytes, got {}", b.len()))
        })?;
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for BtcPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for BtcPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BtcPublicKey({})", self.to_hex())
    }
}

impl FromStr for BtcPublicKey {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl TryFrom<String> for BtcPublicKey {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value)
    }
}

impl From<BtcPublicKey> for String {
    fn from(pk: BtcPublicKey) -> Self {
        pk.to_hex()
    }
}
