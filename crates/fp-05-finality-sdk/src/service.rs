//! # Finality SDK Service
//!
//! Committed blocks land in the local block store, which is the block source
//! of the store-backed consumer controller. Verdicts come from the finality
//! gadget.

use std::sync::Arc;

use async_trait::async_trait;
use fp_02_block_store::FinalityDb;
use fp_03_finality_gadget::FinalityGadgetApi;
use shared_types::Block;
use tracing::{debug, warn};

use crate::error::{SdkError, SdkResult};
use crate::ports::{BlockVerifier, FinalitySdkApi};

pub struct FinalitySdk<V: ?Sized> {
    verifier: Arc<V>,
    db: Arc<FinalityDb>,
    gadget: Arc<dyn FinalityGadgetApi>,
}

impl<V: BlockVerifier + ?Sized> FinalitySdk<V> {
    pub fn new(verifier: Arc<V>, db: Arc<FinalityDb>, gadget: Arc<dyn FinalityGadgetApi>) -> Self {
        Self { verifier, db, gadget }
    }
}

#[async_trait]
impl<V: BlockVerifier + ?Sized> FinalitySdkApi for FinalitySdk<V> {
    async fn commit(&self, height: u64, hash: &str, timestamp: u64) -> SdkResult<()> {
        let block = Block::new(height, hash, timestamp);
        // The store-backed controller decodes every stored hash.
        block
            .hash_bytes()
            .inspect_err(|e| warn!(height, block_hash = %hash, error = %e, "[fp-05] Malformed block hash"))?;

        if !self.verifier.verify_block(height, hash, timestamp).await? {
            warn!(height, block_hash = %hash, "[fp-05] Block rejected by verifier");
            return Err(SdkError::VerifyFailed);
        }

        self.db.insert_block(&block)?;
        debug!(height, block_hash = %hash, "[fp-05] Committed block");
        Ok(())
    }

    async fn query(&self, height: u64) -> SdkResult<bool> {
        let block = self.db.get_block_by_height(height)?;
        Ok(self.gadget.query_is_block_babylon_finalized(&block).await?)
    }

    async fn latest_block(&self) -> SdkResult<Block> {
        self.db.latest_block()?.ok_or(SdkError::NoBlocks)
    }
}
