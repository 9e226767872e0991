//! # Ports
//!
//! [`FinalitySdkApi`] is what the HTTP layer drives; [`BlockVerifier`] is
//! the external check a block must pass before it is stored.

use async_trait::async_trait;
use fp_01_chain_clients::VerifierClient;
use shared_types::{Block, ClientError};

use crate::error::SdkResult;

#[async_trait]
pub trait FinalitySdkApi: Send + Sync {
    /// Verifies a consumer block and stores it.
    async fn commit(&self, height: u64, hash: &str, timestamp: u64) -> SdkResult<()>;

    /// Finality verdict for the stored block at `height`.
    async fn query(&self, height: u64) -> SdkResult<bool>;

    /// Highest committed block.
    async fn latest_block(&self) -> SdkResult<Block>;
}

#[async_trait]
pub trait BlockVerifier: Send + Sync {
    async fn verify_block(&self, height: u64, hash: &str, timestamp: u64) -> Result<bool, ClientError>;
}

#[async_trait]
impl BlockVerifier for VerifierClient {
    async fn verify_block(&self, height: u64, hash: &str, timestamp: u64) -> Result<bool, ClientError> {
        VerifierClient::verify_block(self, height, hash, timestamp).await
    }
}
