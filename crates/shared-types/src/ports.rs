//! # Outbound Ports
//!
//! Capabilities the core consumes. Each is implemented by a transport adapter
//! in `fp-01-chain-clients` or a store in `fp-02-block-store`, and by an
//! in-memory double in [`crate::mocks`].

use async_trait::async_trait;

use crate::entities::{BtcPublicKey, IndexedBlock, PubRandCommit, TxResponse};
use crate::errors::{ClientError, SendError, StorageError};
use crate::messages::{ChainErrorCode, SettlementMsg};
use crate::staking::{DelegationPage, PageRequest, StakingParams};

/// Read access to the settlement chain's staking and finality modules.
#[async_trait]
pub trait BabylonQueryClient: Send + Sync {
    /// Current BTC staking parameters.
    async fn btc_staking_params(&self) -> Result<StakingParams, ClientError>;

    /// One page of delegations to a finality provider.
    async fn finality_provider_delegations(
        &self,
        fp_pk: &BtcPublicKey,
        page: PageRequest,
    ) -> Result<DelegationPage, ClientError>;

    /// BTC keys of every provider registered for a consumer chain.
    async fn consumer_finality_providers(
        &self,
        consumer_id: &str,
    ) -> Result<Vec<BtcPublicKey>, ClientError>;

    /// Voting power of a provider at a BTC height.
    async fn finality_provider_power(
        &self,
        fp_pk: &BtcPublicKey,
        btc_height: u64,
    ) -> Result<u64, ClientError>;

    /// A block indexed by the finality module.
    async fn indexed_block(&self, height: u64) -> Result<IndexedBlock, ClientError>;

    /// Highest finalized block, `None` before the first finalization.
    async fn latest_finalized_block(&self) -> Result<Option<IndexedBlock>, ClientError>;

    /// Height at which finality activated on the settlement chain.
    async fn activated_height(&self) -> Result<u64, ClientError>;

    /// Latest public randomness commit of a provider on the finality module.
    async fn last_pub_rand_commit(
        &self,
        fp_pk: &BtcPublicKey,
    ) -> Result<Option<PubRandCommit>, ClientError>;

    /// Latest settlement-chain block height.
    async fn latest_height(&self) -> Result<u64, ClientError>;
}

/// Smart-contract state queries.
#[async_trait]
pub trait WasmQueryClient: Send + Sync {
    /// Runs a JSON smart query. Returns the raw response payload, or `None`
    /// when the contract answered with an empty payload.
    async fn query_smart_contract_state(
        &self,
        contract: &str,
        query: &serde_json::Value,
    ) -> Result<Option<Vec<u8>>, ClientError>;
}

/// Bitcoin height/time lookups.
#[async_trait]
pub trait BitcoinClient: Send + Sync {
    /// Highest BTC height whose block time is at or before `timestamp`.
    async fn block_height_by_timestamp(&self, timestamp: u64) -> Result<u64, ClientError>;

    /// Block time of a BTC height.
    async fn block_timestamp_by_height(&self, height: u64) -> Result<u64, ClientError>;
}

/// Submits messages to the settlement chain with error classification.
///
/// An error matching `expected` yields a skipped [`TxResponse`]; an error
/// matching `unrecoverable` fails at once; anything else is retried per the
/// sender's own policy. Messages keep their order within the transaction.
#[async_trait]
pub trait ReliableSender: Send + Sync {
    /// Settlement-chain address that signs the submitted transactions.
    fn sender_address(&self) -> String;

    async fn send_msgs(
        &self,
        msgs: Vec<SettlementMsg>,
        expected: &[ChainErrorCode],
        unrecoverable: &[ChainErrorCode],
    ) -> Result<TxResponse, SendError>;

    /// Releases the transport.
    async fn stop(&self) -> Result<(), SendError>;
}

/// Durable single-value store for the BTC staking activation timestamp.
pub trait ActivationTimestampStore: Send + Sync {
    /// `None` when nothing has been recorded yet.
    fn get_activated_timestamp(&self) -> Result<Option<u64>, StorageError>;

    /// Stores `timestamp` unless a value already exists. Returns whether the
    /// value was written.
    fn save_activated_timestamp(&self, timestamp: u64) -> Result<bool, StorageError>;
}
