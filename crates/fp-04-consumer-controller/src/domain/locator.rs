//! # Activation Height Locator
//!
//! Maps a Unix timestamp to the first consumer height whose block time is at
//! or after it. Heights are searched over `[1, latest]`; height 0 is skipped
//! because genesis often carries timestamp 0.
//!
//! Correct only if block time is non-decreasing in height. Every probe is a
//! round-trip, nothing is cached.

use async_trait::async_trait;
use shared_types::{Block, ClientError};
use tracing::debug;

use crate::error::{ControllerError, ControllerResult};

/// Height-addressable blocks with timestamps.
#[async_trait]
pub trait TimestampedBlocks: Send + Sync {
    async fn latest_block(&self) -> Result<Block, ClientError>;

    async fn block_at(&self, height: u64) -> Result<Block, ClientError>;
}

/// Smallest height `h >= 1` with `timestamp(h) >= target`.
///
/// Returns 1 when `target` predates block 1, fails with
/// [`ControllerError::TimestampInFuture`] when it is after the head.
pub async fn block_height_by_timestamp<B>(blocks: &B, target: u64) -> ControllerResult<u64>
where
    B: TimestampedBlocks + ?Sized,
{
    let latest = blocks.latest_block().await?;
    if target > latest.timestamp {
        return Err(ControllerError::TimestampInFuture {
            target,
            latest: latest.timestamp,
        });
    }

    let first = blocks.block_at(1).await?;
    if target < first.timestamp {
        return Ok(1);
    }

    let (mut lo, mut hi) = (1u64, latest.height);
    while lo <= hi {
        let mid = lo + (hi - lo) / 2;
        let block = blocks.block_at(mid).await?;

        match block.timestamp.cmp(&target) {
            std::cmp::Ordering::Less => lo = mid + 1,
            // mid >= lo >= 1, so this cannot underflow.
            std::cmp::Ordering::Greater => hi = mid - 1,
            std::cmp::Ordering::Equal => {
                debug!(target, height = mid, "[fp-04] Exact timestamp match");
                return Ok(mid);
            }
        }
    }

    debug!(target, height = lo, "[fp-04] Located activation height");
    Ok(lo)
}
