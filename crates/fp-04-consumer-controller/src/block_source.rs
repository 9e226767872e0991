//! # Block Sources
//!
//! Contract-governed backends differ only in where blocks come from. A
//! [`BlockSource`] supplies that part:
//!
//! - [`IndexerBlockSource`] - REST indexer, activation height from the
//!   finality gadget's activation timestamp (OPStackL2, generic)
//! - [`StoreBlockSource`] - local block store fed by the finality SDK's
//!   committer (wasm)

use std::sync::Arc;

use async_trait::async_trait;
use fp_01_chain_clients::IndexerClient;
use fp_02_block_store::FinalityDb;
use fp_03_finality_gadget::FinalityGadgetApi;
use shared_types::{Block, BlockInfo, ClientError, StorageError};
use tracing::{debug, error};

use crate::domain::{block_height_by_timestamp, block_info_from, TimestampedBlocks};
use crate::error::ControllerResult;

#[async_trait]
pub trait BlockSource: Send + Sync {
    async fn block(&self, height: u64) -> ControllerResult<BlockInfo>;

    async fn latest_finalized_block(&self) -> ControllerResult<Option<BlockInfo>>;

    async fn latest_block_height(&self) -> ControllerResult<u64>;

    async fn activated_height(&self) -> ControllerResult<u64>;
}

// =============================================================================
// REST INDEXER
// =============================================================================

/// Block reads against a consumer block indexer.
#[async_trait]
pub trait BlockIndexer: TimestampedBlocks {
    async fn finalized_block(&self) -> Result<Option<Block>, ClientError>;
}

#[async_trait]
impl TimestampedBlocks for IndexerClient {
    async fn latest_block(&self) -> Result<Block, ClientError> {
        IndexerClient::latest_block(self).await
    }

    async fn block_at(&self, height: u64) -> Result<Block, ClientError> {
        self.get_block(height).await
    }
}

#[async_trait]
impl BlockIndexer for IndexerClient {
    async fn finalized_block(&self) -> Result<Option<Block>, ClientError> {
        IndexerClient::finalized_block(self).await
    }
}

pub struct IndexerBlockSource<I: BlockIndexer> {
    indexer: I,
    gadget: Arc<dyn FinalityGadgetApi>,
}

impl<I: BlockIndexer> IndexerBlockSource<I> {
    pub fn new(indexer: I, gadget: Arc<dyn FinalityGadgetApi>) -> Self {
        Self { indexer, gadget }
    }

    pub fn indexer(&self) -> &I {
        &self.indexer
    }
}

#[async_trait]
impl<I: BlockIndexer> BlockSource for IndexerBlockSource<I> {
    async fn block(&self, height: u64) -> ControllerResult<BlockInfo> {
        let block = self.indexer.block_at(height).await?;
        let info = block_info_from(&block)?;
        debug!(height, block_hash = %info.hash_hex(), "[fp-04] Query block");
        Ok(info)
    }

    async fn latest_finalized_block(&self) -> ControllerResult<Option<BlockInfo>> {
        match self.indexer.finalized_block().await? {
            Some(block) => Ok(Some(block_info_from(&block)?)),
            None => Ok(None),
        }
    }

    /// Providers vote up to the indexer's finalized head, not its tip.
    async fn latest_block_height(&self) -> ControllerResult<u64> {
        let finalized = self
            .indexer
            .finalized_block()
            .await?
            .ok_or_else(|| ClientError::NotFound("no finalized block yet".into()))?;
        Ok(finalized.height)
    }

    async fn activated_height(&self) -> ControllerResult<u64> {
        let timestamp = self
            .gadget
            .query_btc_staking_activated_timestamp()
            .await
            .inspect_err(|e| error!(error = %e, "[fp-04] Failed to query BTC staking activation timestamp"))?;

        block_height_by_timestamp(&self.indexer, timestamp)
            .await
            .inspect_err(|e| error!(error = %e, timestamp, "[fp-04] Failed to map activation timestamp to a height"))
    }
}

// =============================================================================
// LOCAL STORE
// =============================================================================

pub struct StoreBlockSource {
    db: Arc<FinalityDb>,
}

impl StoreBlockSource {
    pub fn new(db: Arc<FinalityDb>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl BlockSource for StoreBlockSource {
    async fn block(&self, height: u64) -> ControllerResult<BlockInfo> {
        let block = self.db.get_block_by_height(height)?;
        block_info_from(&block)
    }

    /// Only verified blocks are committed to the store, so the newest stored
    /// block is the newest finalized one.
    async fn latest_finalized_block(&self) -> ControllerResult<Option<BlockInfo>> {
        match self.db.latest_block()? {
            Some(block) => Ok(Some(block_info_from(&block)?)),
            None => Ok(None),
        }
    }

    async fn latest_block_height(&self) -> ControllerResult<u64> {
        let latest = self
            .db
            .latest_block()?
            .ok_or_else(|| StorageError::NotFound("no block committed yet".into()))?;
        Ok(latest.height)
    }

    async fn activated_height(&self) -> ControllerResult<u64> {
        debug!("[fp-04] Store-backed chain has no activation gating");
        Ok(0)
    }
}
