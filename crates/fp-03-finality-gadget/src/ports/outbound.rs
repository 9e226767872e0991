//! Driven port to the gadget contract.

use async_trait::async_trait;

use crate::error::GadgetResult;

/// Queries against the finality gadget contract that governs one consumer
/// chain.
#[async_trait]
pub trait GadgetContract: Send + Sync {
    /// Whether finality gating is switched on.
    async fn is_enabled(&self) -> GadgetResult<bool>;

    /// Consumer id the contract is registered under.
    async fn consumer_id(&self) -> GadgetResult<String>;

    /// Hex BTC keys of providers that voted for exactly `(height, hash_hex)`.
    /// `None` when nobody voted.
    async fn block_voters(&self, height: u64, hash_hex: &str) -> GadgetResult<Option<Vec<String>>>;
}
