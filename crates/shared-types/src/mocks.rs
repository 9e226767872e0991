//! In-memory doubles for the outbound ports.
//!
//! Used by unit tests across the workspace and by the integration suite.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};

use crate::entities::{BtcPublicKey, IndexedBlock, PubRandCommit, TxResponse};
use crate::errors::{ClientError, SendError, StorageError};
use crate::messages::{ChainErrorCode, SettlementMsg};
use crate::ports::{
    ActivationTimestampStore, BabylonQueryClient, BitcoinClient, ReliableSender, WasmQueryClient,
};
use crate::staking::{
    BtcDelegation, CovenantSig, DelegationPage, PageRequest, StakingParams, Undelegation,
};

/// Builds a delegation with the given signature counts.
pub fn delegation(
    start_height: u64,
    covenant_sigs: usize,
    unbonding_sigs: usize,
    slashing_sigs: usize,
    unbonded: bool,
) -> BtcDelegation {
    let sigs = |n: usize| {
        (0..n)
            .map(|i| CovenantSig {
                cov_pk_hex: format!("{i:02x}"),
            })
            .collect::<Vec<_>>()
    };
    BtcDelegation {
        start_height,
        covenant_sigs: sigs(covenant_sigs),
        undelegation: Undelegation {
            delegator_unbonding_sig: unbonded.then(|| "5a".repeat(64)),
            covenant_unbonding_sigs: sigs(unbonding_sigs),
            covenant_slashing_sigs: sigs(slashing_sigs),
        },
    }
}

// =============================================================================
// SETTLEMENT CHAIN
// =============================================================================

/// Mock settlement-chain query client.
pub struct MockBabylonClient {
    quorum: RwLock<u32>,
    page_size: usize,
    delegations: RwLock<HashMap<BtcPublicKey, Vec<BtcDelegation>>>,
    consumer_fps: RwLock<HashMap<String, Vec<BtcPublicKey>>>,
    powers: RwLock<HashMap<BtcPublicKey, u64>>,
    blocks: RwLock<BTreeMap<u64, IndexedBlock>>,
    activated_height: RwLock<Option<u64>>,
    pub_rand_commits: RwLock<HashMap<BtcPublicKey, PubRandCommit>>,
    latest_height: RwLock<u64>,
    failure: RwLock<Option<ClientError>>,
    delegation_requests: AtomicUsize,
}

impl MockBabylonClient {
    pub fn new() -> Self {
        Self {
            quorum: RwLock::new(1),
            page_size: usize::MAX,
            delegations: RwLock::new(HashMap::new()),
            consumer_fps: RwLock::new(HashMap::new()),
            powers: RwLock::new(HashMap::new()),
            blocks: RwLock::new(BTreeMap::new()),
            activated_height: RwLock::new(None),
            pub_rand_commits: RwLock::new(HashMap::new()),
            latest_height: RwLock::new(0),
            failure: RwLock::new(None),
            delegation_requests: AtomicUsize::new(0),
        }
    }

    pub fn with_quorum(self, quorum: u32) -> Self {
        *self.quorum.write() = quorum;
        self
    }

    /// Caps the page size below whatever the caller requests.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn add_delegations(&self, fp: BtcPublicKey, dels: Vec<BtcDelegation>) {
        self.delegations.write().entry(fp).or_default().extend(dels);
    }

    pub fn register_consumer_fps(&self, consumer_id: &str, fps: Vec<BtcPublicKey>) {
        self.consumer_fps.write().insert(consumer_id.to_string(), fps);
    }

    pub fn set_power(&self, fp: BtcPublicKey, power: u64) {
        self.powers.write().insert(fp, power);
    }

    pub fn insert_block(&self, block: IndexedBlock) {
        self.blocks.write().insert(block.height, block);
    }

    pub fn set_activated_height(&self, height: u64) {
        *self.activated_height.write() = Some(height);
    }

    pub fn set_pub_rand_commit(&self, fp: BtcPublicKey, commit: PubRandCommit) {
        self.pub_rand_commits.write().insert(fp, commit);
    }

    pub fn set_latest_height(&self, height: u64) {
        *self.latest_height.write() = height;
    }

    /// Every subsequent call fails with `err` until cleared.
    pub fn fail_with(&self, err: ClientError) {
        *self.failure.write() = Some(err);
    }

    pub fn clear_failure(&self) {
        *self.failure.write() = None;
    }

    /// Number of delegation pages served so far.
    pub fn delegation_page_requests(&self) -> usize {
        self.delegation_requests.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), ClientError> {
        match self.failure.read().as_ref() {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

impl Default for MockBabylonClient {
    fn default() -> Self {
        Self::new()
    }
}

fn decode_offset(key: Option<&[u8]>) -> usize {
    key.and_then(|k| <[u8; 8]>::try_from(k).ok())
        .map(|b| u64::from_be_bytes(b) as usize)
        .unwrap_or(0)
}

#[async_trait]
impl BabylonQueryClient for MockBabylonClient {
    async fn btc_staking_params(&self) -> Result<StakingParams, ClientError> {
        self.check()?;
        Ok(StakingParams {
            covenant_quorum: *self.quorum.read(),
        })
    }

    async fn finality_provider_delegations(
        &self,
        fp_pk: &BtcPublicKey,
        page: PageRequest,
    ) -> Result<DelegationPage, ClientError> {
        self.check()?;
        self.delegation_requests.fetch_add(1, Ordering::SeqCst);

        let all = self.delegations.read();
        let dels = all.get(fp_pk).map(Vec::as_slice).unwrap_or_default();
        let offset = decode_offset(page.key.as_deref()).min(dels.len());
        let size = self.page_size.min(page.limit.max(1) as usize);
        let end = offset.saturating_add(size).min(dels.len());

        let next_key = (end < dels.len()).then(|| (end as u64).to_be_bytes().to_vec());
        Ok(DelegationPage {
            delegations: dels[offset..end].to_vec(),
            next_key,
        })
    }

    async fn consumer_finality_providers(
        &self,
        consumer_id: &str,
    ) -> Result<Vec<BtcPublicKey>, ClientError> {
        self.check()?;
        Ok(self
            .consumer_fps
            .read()
            .get(consumer_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn finality_provider_power(
        &self,
        fp_pk: &BtcPublicKey,
        _btc_height: u64,
    ) -> Result<u64, ClientError> {
        self.check()?;
        Ok(self.powers.read().get(fp_pk).copied().unwrap_or(0))
    }

    async fn indexed_block(&self, height: u64) -> Result<IndexedBlock, ClientError> {
        self.check()?;
        self.blocks
            .read()
            .get(&height)
            .cloned()
            .ok_or_else(|| ClientError::NotFound(format!("block {height}")))
    }

    async fn latest_finalized_block(&self) -> Result<Option<IndexedBlock>, ClientError> {
        self.check()?;
        Ok(self
            .blocks
            .read()
            .values()
            .rev()
            .find(|b| b.finalized)
            .cloned())
    }

    async fn activated_height(&self) -> Result<u64, ClientError> {
        self.check()?;
        self.activated_height
            .read()
            .ok_or_else(|| ClientError::NotFound("activated height".into()))
    }

    async fn last_pub_rand_commit(
        &self,
        fp_pk: &BtcPublicKey,
    ) -> Result<Option<PubRandCommit>, ClientError> {
        self.check()?;
        Ok(self.pub_rand_commits.read().get(fp_pk).cloned())
    }

    async fn latest_height(&self) -> Result<u64, ClientError> {
        self.check()?;
        Ok(*self.latest_height.read())
    }
}

// =============================================================================
// CONTRACT STATE
// =============================================================================

/// Mock contract query client. Responses are keyed by the query's top-level
/// JSON key, e.g. `is_enabled`.
#[derive(Default)]
pub struct MockWasmClient {
    responses: RwLock<HashMap<String, Option<serde_json::Value>>>,
    queries: Mutex<Vec<(String, serde_json::Value)>>,
    failure: RwLock<Option<ClientError>>,
}

impl MockWasmClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` answers with an empty payload.
    pub fn set_response(&self, query_name: &str, response: Option<serde_json::Value>) {
        self.responses
            .write()
            .insert(query_name.to_string(), response);
    }

    pub fn fail_with(&self, err: ClientError) {
        *self.failure.write() = Some(err);
    }

    /// `(contract, query)` pairs received so far.
    pub fn queries(&self) -> Vec<(String, serde_json::Value)> {
        self.queries.lock().clone()
    }
}

#[async_trait]
impl WasmQueryClient for MockWasmClient {
    async fn query_smart_contract_state(
        &self,
        contract: &str,
        query: &serde_json::Value,
    ) -> Result<Option<Vec<u8>>, ClientError> {
        self.queries
            .lock()
            .push((contract.to_string(), query.clone()));

        if let Some(err) = self.failure.read().as_ref() {
            return Err(err.clone());
        }

        let name = query
            .as_object()
            .and_then(|o| o.keys().next())
            .cloned()
            .ok_or_else(|| ClientError::InvalidInput("query must be a JSON object".into()))?;

        match self.responses.read().get(&name) {
            Some(Some(value)) => Ok(Some(serde_json::to_vec(value)?)),
            Some(None) => Ok(None),
            None => Err(ClientError::Application(format!("unknown query: {name}"))),
        }
    }
}

// =============================================================================
// BITCOIN
// =============================================================================

/// Mock Bitcoin client over a fixed header chain.
#[derive(Default)]
pub struct MockBitcoinClient {
    headers: RwLock<BTreeMap<u64, u64>>,
    failing: AtomicBool,
}

impl MockBitcoinClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Headers at `start, start+1, ...` spaced `spacing` seconds apart.
    pub fn with_chain(start: u64, count: u64, genesis_time: u64, spacing: u64) -> Self {
        let client = Self::new();
        for i in 0..count {
            client.add_header(start + i, genesis_time + i * spacing);
        }
        client
    }

    pub fn add_header(&self, height: u64, timestamp: u64) {
        self.headers.write().insert(height, timestamp);
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), ClientError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(ClientError::Transport("bitcoind unreachable".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl BitcoinClient for MockBitcoinClient {
    async fn block_height_by_timestamp(&self, timestamp: u64) -> Result<u64, ClientError> {
        self.check()?;
        self.headers
            .read()
            .iter()
            .rev()
            .find(|(_, ts)| **ts <= timestamp)
            .map(|(h, _)| *h)
            .ok_or_else(|| ClientError::NotFound(format!("no BTC block at or before {timestamp}")))
    }

    async fn block_timestamp_by_height(&self, height: u64) -> Result<u64, ClientError> {
        self.check()?;
        self.headers
            .read()
            .get(&height)
            .copied()
            .ok_or_else(|| ClientError::NotFound(format!("BTC block {height}")))
    }
}

// =============================================================================
// SENDER
// =============================================================================

/// Sender that records every batch and answers with a canned outcome.
pub struct RecordingSender {
    address: String,
    batches: Mutex<Vec<Vec<SettlementMsg>>>,
    failure: Mutex<Option<SendError>>,
    stopped: AtomicBool,
}

impl RecordingSender {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            batches: Mutex::new(Vec::new()),
            failure: Mutex::new(None),
            stopped: AtomicBool::new(false),
        }
    }

    pub fn fail_with(&self, err: SendError) {
        *self.failure.lock() = Some(err);
    }

    pub fn batches(&self) -> Vec<Vec<SettlementMsg>> {
        self.batches.lock().clone()
    }

    pub fn send_count(&self) -> usize {
        self.batches.lock().len()
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReliableSender for RecordingSender {
    fn sender_address(&self) -> String {
        self.address.clone()
    }

    async fn send_msgs(
        &self,
        msgs: Vec<SettlementMsg>,
        _expected: &[ChainErrorCode],
        _unrecoverable: &[ChainErrorCode],
    ) -> Result<TxResponse, SendError> {
        if self.is_stopped() {
            return Err(SendError::Stopped);
        }
        if msgs.is_empty() {
            return Err(SendError::EmptyBatch);
        }

        let mut batches = self.batches.lock();
        batches.push(msgs);
        if let Some(err) = self.failure.lock().clone() {
            return Err(err);
        }
        Ok(TxResponse::committed(format!("TX{:04}", batches.len())))
    }

    async fn stop(&self) -> Result<(), SendError> {
        self.stopped.store(true, Ordering::SeqCst);
        Ok(())
    }
}

// =============================================================================
// ACTIVATION STORE
// =============================================================================

/// Activation store kept in memory.
#[derive(Default)]
pub struct MemoryActivationStore {
    value: Mutex<Option<u64>>,
    writes: AtomicUsize,
    failing_reads: AtomicBool,
}

impl MemoryActivationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(timestamp: u64) -> Self {
        Self {
            value: Mutex::new(Some(timestamp)),
            ..Self::default()
        }
    }

    /// Makes reads fail while writes keep working.
    pub fn set_failing_reads(&self, failing: bool) {
        self.failing_reads.store(failing, Ordering::SeqCst);
    }

    /// Successful writes so far.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl ActivationTimestampStore for MemoryActivationStore {
    fn get_activated_timestamp(&self) -> Result<Option<u64>, StorageError> {
        if self.failing_reads.load(Ordering::SeqCst) {
            return Err(StorageError::DatabaseError("read failed".into()));
        }
        Ok(*self.value.lock())
    }

    fn save_activated_timestamp(&self, timestamp: u64) -> Result<bool, StorageError> {
        let mut value = self.value.lock();
        if value.is_some() {
            return Ok(false);
        }
        *value = Some(timestamp);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(true)
    }
}
