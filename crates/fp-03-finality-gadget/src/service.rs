//! # Finality Gadget Service
//!
//! Verdict pipeline for one consumer block:
//!
//! ```text
//! is_enabled? ──no──→ true (pass-through)
//!     │yes
//!     ↓
//! consumer_id → registered FP keys → BTC height of block timestamp
//!     ↓
//! earliest active delegation height ──block earlier──→ BtcStakingNotActivated
//!     ↓
//! power of every FP at BTC height ──sum 0──→ NoFpHasVotingPower
//!     ↓
//! voters of (height, hash) ──none──→ false
//!     ↓
//! voted * 3 >= total * 2
//! ```
//!
//! The same key/delegation chain, without a block, yields the activation
//! timestamp that [`FinalityGadget::run_activation_recorder`] records once.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use shared_types::{
    earliest_active_delegation_height, ActivationTimestampStore, BabylonQueryClient, BitcoinClient,
    Block, BtcPublicKey,
};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::domain::{has_quorum, tally_voted_power, total_power, PowerTable};
use crate::error::{GadgetError, GadgetResult};
use crate::metrics;
use crate::ports::{FinalityGadgetApi, GadgetContract};

/// How the activation recorder finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderExit {
    /// Computed and written by this run.
    Recorded(u64),
    /// A value was already in the store; nothing computed.
    AlreadyRecorded(u64),
    /// Shutdown was signalled first.
    Cancelled,
}

/// Quorum engine over the gadget contract, settlement-chain staking queries,
/// a Bitcoin client and the activation store.
pub struct FinalityGadget<C, B, T, S>
where
    C: GadgetContract,
    B: BabylonQueryClient + ?Sized,
    T: BitcoinClient + ?Sized,
    S: ActivationTimestampStore + ?Sized,
{
    contract: C,
    babylon: Arc<B>,
    btc: Arc<T>,
    store: Arc<S>,
    poll_interval: Duration,
}

impl<C, B, T, S> FinalityGadget<C, B, T, S>
where
    C: GadgetContract,
    B: BabylonQueryClient + ?Sized,
    T: BitcoinClient + ?Sized,
    S: ActivationTimestampStore + ?Sized,
{
    pub fn new(contract: C, babylon: Arc<B>, btc: Arc<T>, store: Arc<S>, poll_interval: Duration) -> Self {
        Self {
            contract,
            babylon,
            btc,
            store,
            poll_interval,
        }
    }

    pub fn contract(&self) -> &C {
        &self.contract
    }

    /// Every provider registered for the contract's consumer id.
    async fn all_fp_pks(&self) -> GadgetResult<Vec<BtcPublicKey>> {
        let consumer_id = self.contract.consumer_id().await?;
        let fps = self.babylon.consumer_finality_providers(&consumer_id).await?;
        debug!(consumer_id = %consumer_id, fps = fps.len(), "[fp-03] Consumer finality providers");
        Ok(fps)
    }

    /// Power of each provider at `btc_height`.
    async fn query_multi_fp_power(&self, fp_pks: &[BtcPublicKey], btc_height: u64) -> GadgetResult<PowerTable> {
        let mut table = PowerTable::with_capacity(fp_pks.len());
        for fp_pk in fp_pks {
            let power = self.babylon.finality_provider_power(fp_pk, btc_height).await?;
            table.insert(*fp_pk, power);
        }
        Ok(table)
    }

    /// Activation timestamp from chain state: block time of the earliest BTC
    /// height at which any registered provider had an active delegation.
    pub async fn compute_activation_timestamp(&self) -> GadgetResult<u64> {
        let fp_pks = self.all_fp_pks().await?;
        let earliest = earliest_active_delegation_height(self.babylon.as_ref(), &fp_pks)
            .await?
            .ok_or(GadgetError::BtcStakingNotActivated)?;
        debug!(btc_height = earliest, "[fp-03] Earliest active delegation");

        let timestamp = self.btc.block_timestamp_by_height(earliest).await?;
        debug!(timestamp, "[fp-03] BTC staking activated at");
        Ok(timestamp)
    }

    async fn check_block(&self, block: &Block) -> GadgetResult<bool> {
        if !self.contract.is_enabled().await? {
            debug!(height = block.height, "[fp-03] Gadget disabled, passing block through");
            return Ok(true);
        }

        let hash = block.normalized_hash();
        let fp_pks = self.all_fp_pks().await?;
        let btc_height = self.btc.block_height_by_timestamp(block.timestamp).await?;

        match earliest_active_delegation_height(self.babylon.as_ref(), &fp_pks).await? {
            Some(earliest) if btc_height >= earliest => {}
            _ => return Err(GadgetError::BtcStakingNotActivated),
        }

        let powers = self.query_multi_fp_power(&fp_pks, btc_height).await?;
        let total = total_power(&powers);
        if total == 0 {
            return Err(GadgetError::NoFpHasVotingPower);
        }

        let Some(voters) = self.contract.block_voters(block.height, hash).await? else {
            debug!(height = block.height, block_hash = %hash, "[fp-03] No votes for block");
            return Ok(false);
        };

        let voted = tally_voted_power(&powers, &voters);
        let finalized = has_quorum(voted, total);
        debug!(
            height = block.height,
            block_hash = %hash,
            btc_height,
            voted,
            total,
            finalized,
            "[fp-03] Finality verdict"
        );
        Ok(finalized)
    }

    /// Polls every `poll_interval` until the activation timestamp is known,
    /// writes it once, then returns. Transient failures are logged and the
    /// poll continues on the same interval.
    ///
    /// Returns at once if the store already holds a value. Only one recorder
    /// may run against a store.
    pub async fn run_activation_recorder(&self, mut shutdown: watch::Receiver<bool>) -> RecorderExit {
        match self.store.get_activated_timestamp() {
            Ok(Some(ts)) => {
                info!(timestamp = ts, "[fp-03] Activation timestamp already recorded");
                return RecorderExit::AlreadyRecorded(ts);
            }
            Ok(None) => {}
            Err(e) => error!(error = %e, "[fp-03] Failed to read activation store"),
        }

        let mut ticker = tokio::time::interval(self.poll_interval);
        // The first tick of `interval` fires immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    info!("[fp-03] Activation recorder shutting down");
                    return RecorderExit::Cancelled;
                }
                _ = ticker.tick() => {}
            }
            if *shutdown.borrow() {
                return RecorderExit::Cancelled;
            }

            metrics::record_activation_poll();
            let timestamp = match self.compute_activation_timestamp().await {
                Ok(ts) => ts,
                Err(GadgetError::BtcStakingNotActivated) => {
                    debug!("[fp-03] BTC staking not yet activated, waiting");
                    continue;
                }
                Err(e) => {
                    error!(error = %e, "[fp-03] Failed to query BTC staking activation timestamp");
                    continue;
                }
            };

            match self.store.save_activated_timestamp(timestamp) {
                Ok(true) => {
                    metrics::record_activation_recorded();
                    info!(timestamp, "[fp-03] Recorded BTC staking activation timestamp");
                    return RecorderExit::Recorded(timestamp);
                }
                // Another writer got there first; report its value, never ours.
                Ok(false) => match self.store.get_activated_timestamp() {
                    Ok(Some(stored)) => {
                        info!(timestamp = stored, "[fp-03] Activation timestamp recorded concurrently");
                        return RecorderExit::AlreadyRecorded(stored);
                    }
                    Ok(None) => {
                        warn!(timestamp, "[fp-03] Activation store refused the write but holds no value");
                    }
                    Err(e) => {
                        error!(error = %e, "[fp-03] Failed to read activation store after a refused write");
                    }
                },
                Err(e) => {
                    error!(error = %e, "[fp-03] Failed to save activation timestamp");
                }
            }
        }
    }
}

#[async_trait]
impl<C, B, T, S> FinalityGadgetApi for FinalityGadget<C, B, T, S>
where
    C: GadgetContract,
    B: BabylonQueryClient + ?Sized,
    T: BitcoinClient + ?Sized,
    S: ActivationTimestampStore + ?Sized,
{
    async fn query_is_block_babylon_finalized(&self, block: &Block) -> GadgetResult<bool> {
        let verdict = self.check_block(block).await;
        metrics::record_finality_check(&verdict);
        verdict
    }

    async fn query_btc_staking_activated_timestamp(&self) -> GadgetResult<u64> {
        if let Some(ts) = self.store.get_activated_timestamp()? {
            debug!(timestamp = ts, "[fp-03] Activation timestamp found in store");
            return Ok(ts);
        }
        debug!("[fp-03] Activation timestamp not recorded yet, computing");
        self.compute_activation_timestamp().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::CwGadgetContract;
    use serde_json::json;
    use shared_types::mocks::{
        delegation, MemoryActivationStore, MockBabylonClient, MockBitcoinClient, MockWasmClient,
    };
    use shared_types::ClientError;

    const CONSUMER: &str = "op-stack-l2-706114";

    type TestGadget = FinalityGadget<
        CwGadgetContract<MockWasmClient>,
        MockBabylonClient,
        MockBitcoinClient,
        MemoryActivationStore,
    >;

    struct Harness {
        wasm: Arc<MockWasmClient>,
        babylon: Arc<MockBabylonClient>,
        btc: Arc<MockBitcoinClient>,
        store: Arc<MemoryActivationStore>,
        gadget: TestGadget,
    }

    fn pk(byte: u8) -> BtcPublicKey {
        BtcPublicKey::from_bytes([byte; 32])
    }

    /// Three providers with 100/100/100 power, all delegations active from
    /// BTC height 100. BTC headers 90..=200 every 600s from t=1_000_000.
    fn harness_with_store(store: MemoryActivationStore) -> Harness {
        let wasm = Arc::new(MockWasmClient::new());
        wasm.set_response("is_enabled", Some(json!(true)));
        wasm.set_response("config", Some(json!({"consumer_id": CONSUMER})));
        wasm.set_response("block_voters", None);

        let babylon = Arc::new(MockBabylonClient::new().with_quorum(1));
        babylon.register_consumer_fps(CONSUMER, vec![pk(1), pk(2), pk(3)]);
        for (i, fp) in [pk(1), pk(2), pk(3)].into_iter().enumerate() {
            babylon.add_delegations(fp, vec![delegation(100 + i as u64 * 10, 1, 1, 1, false)]);
            babylon.set_power(fp, 100);
        }

        let btc = Arc::new(MockBitcoinClient::with_chain(90, 111, 1_000_000, 600));
        let store = Arc::new(store);
        let gadget = FinalityGadget::new(
            CwGadgetContract::new(wasm.clone(), "bbn1gadget"),
            babylon.clone(),
            btc.clone(),
            store.clone(),
            Duration::from_secs(5),
        );
        Harness {
            wasm,
            babylon,
            btc,
            store,
            gadget,
        }
    }

    fn harness() -> Harness {
        harness_with_store(MemoryActivationStore::new())
    }

    /// A block whose timestamp maps to BTC height 150.
    fn block() -> Block {
        Block::new(42, "0xABCDEF", 1_000_000 + 60 * 600 + 30)
    }

    #[tokio::test]
    async fn test_disabled_gadget_passes_through() {
        let h = harness();
        h.wasm.set_response("is_enabled", Some(json!(false)));
        h.babylon.fail_with(ClientError::Transport("should not be queried".into()));

        assert_eq!(h.gadget.query_is_block_babylon_finalized(&block()).await, Ok(true));
    }

    #[tokio::test]
    async fn test_exact_two_thirds_finalizes() {
        let h = harness();
        h.wasm.set_response("block_voters", Some(json!([pk(1).to_hex(), pk(2).to_hex()])));

        assert_eq!(h.gadget.query_is_block_babylon_finalized(&block()).await, Ok(true));

        let (_, query) = h.wasm.queries().pop().unwrap();
        assert_eq!(query, json!({"block_voters": {"height": 42, "hash_hex": "ABCDEF"}}));
    }

    #[tokio::test]
    async fn test_below_quorum_is_not_final() {
        let h = harness();
        h.babylon.set_power(pk(3), 101);
        h.wasm.set_response("block_voters", Some(json!([pk(1).to_hex(), pk(2).to_hex()])));

        assert_eq!(h.gadget.query_is_block_babylon_finalized(&block()).await, Ok(false));
    }

    #[tokio::test]
    async fn test_no_votes_is_not_final() {
        let h = harness();
        assert_eq!(h.gadget.query_is_block_babylon_finalized(&block()).await, Ok(false));
    }

    #[tokio::test]
    async fn test_block_before_activation() {
        let h = harness();
        let early = Block::new(1, "0x01", 1_000_000 + 5 * 600);
        assert_eq!(
            h.gadget.query_is_block_babylon_finalized(&early).await,
            Err(GadgetError::BtcStakingNotActivated)
        );
    }

    #[tokio::test]
    async fn test_no_active_delegation_at_all() {
        let h = harness();
        h.wasm.set_response("config", Some(json!({"consumer_id": "empty-consumer"})));
        assert_eq!(
            h.gadget.query_is_block_babylon_finalized(&block()).await,
            Err(GadgetError::BtcStakingNotActivated)
        );
    }

    #[tokio::test]
    async fn test_zero_total_power() {
        let h = harness();
        for fp in [pk(1), pk(2), pk(3)] {
            h.babylon.set_power(fp, 0);
        }
        assert_eq!(
            h.gadget.query_is_block_babylon_finalized(&block()).await,
            Err(GadgetError::NoFpHasVotingPower)
        );
    }

    #[tokio::test]
    async fn test_btc_client_failure_propagates() {
        let h = harness();
        h.btc.set_failing(true);
        assert!(matches!(
            h.gadget.query_is_block_babylon_finalized(&block()).await,
            Err(GadgetError::Client(ClientError::Transport(_)))
        ));
    }

    #[tokio::test]
    async fn test_activation_timestamp_computed_without_writing() {
        let h = harness();
        // Earliest active start height is 100 → header time 1_000_000 + 10 * 600.
        assert_eq!(
            h.gadget.query_btc_staking_activated_timestamp().await,
            Ok(1_006_000)
        );
        assert_eq!(h.store.writes(), 0);
    }

    #[tokio::test]
    async fn test_activation_timestamp_prefers_store() {
        let h = harness_with_store(MemoryActivationStore::with_value(777));
        h.babylon.fail_with(ClientError::Transport("unused".into()));
        assert_eq!(h.gadget.query_btc_staking_activated_timestamp().await, Ok(777));
    }

    #[tokio::test(start_paused = true)]
    async fn test_recorder_retries_until_activated() {
        let h = harness();
        h.wasm.set_response("config", Some(json!({"consumer_id": "late-consumer"})));
        h.babylon.register_consumer_fps("late-consumer", vec![pk(4)]);

        let (tx, rx) = watch::channel(false);
        let gadget = Arc::new(h.gadget);
        let task = tokio::spawn({
            let gadget = gadget.clone();
            async move { gadget.run_activation_recorder(rx).await }
        });

        tokio::time::sleep(Duration::from_secs(12)).await;
        assert_eq!(h.store.get_activated_timestamp(), Ok(None));

        h.babylon.add_delegations(pk(4), vec![delegation(120, 1, 1, 1, false)]);
        tokio::time::sleep(Duration::from_secs(6)).await;

        assert_eq!(task.await.unwrap(), RecorderExit::Recorded(1_018_000));
        assert_eq!(h.store.get_activated_timestamp(), Ok(Some(1_018_000)));
        assert_eq!(h.store.writes(), 1);
        drop(tx);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recorder_survives_transient_errors() {
        let h = harness();
        h.btc.set_failing(true);

        let (_tx, rx) = watch::channel(false);
        let gadget = Arc::new(h.gadget);
        let task = tokio::spawn({
            let gadget = gadget.clone();
            async move { gadget.run_activation_recorder(rx).await }
        });

        tokio::time::sleep(Duration::from_secs(11)).await;
        h.btc.set_failing(false);

        assert_eq!(task.await.unwrap(), RecorderExit::Recorded(1_006_000));
    }

    #[tokio::test]
    async fn test_recorder_never_overwrites() {
        let h = harness_with_store(MemoryActivationStore::with_value(555));
        let (_tx, rx) = watch::channel(false);

        assert_eq!(
            h.gadget.run_activation_recorder(rx).await,
            RecorderExit::AlreadyRecorded(555)
        );
        assert_eq!(h.store.writes(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recorder_reports_stored_value_after_read_error() {
        let h = harness_with_store(MemoryActivationStore::with_value(555));
        h.store.set_failing_reads(true);

        let (_tx, rx) = watch::channel(false);
        let gadget = Arc::new(h.gadget);
        let task = tokio::spawn({
            let gadget = gadget.clone();
            async move { gadget.run_activation_recorder(rx).await }
        });

        tokio::time::sleep(Duration::from_secs(12)).await;
        assert!(!task.is_finished());

        h.store.set_failing_reads(false);
        assert_eq!(task.await.unwrap(), RecorderExit::AlreadyRecorded(555));
        assert_eq!(h.store.writes(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recorder_cancellation() {
        let h = harness();
        h.wasm.set_response("config", Some(json!({"consumer_id": "empty-consumer"})));

        let (tx, rx) = watch::channel(false);
        let gadget = Arc::new(h.gadget);
        let task = tokio::spawn({
            let gadget = gadget.clone();
            async move { gadget.run_activation_recorder(rx).await }
        });

        tokio::time::sleep(Duration::from_secs(7)).await;
        tx.send(true).unwrap();

        assert_eq!(task.await.unwrap(), RecorderExit::Cancelled);
        assert_eq!(h.store.get_activated_timestamp(), Ok(None));
    }
}
