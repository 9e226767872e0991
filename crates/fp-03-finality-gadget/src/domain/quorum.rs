//! # Stake-Weighted Quorum
//!
//! A block is final when providers holding at least two thirds of the voting
//! power at the block's BTC height voted for its exact `(height, hash)`.
//!
//! The comparison is `voted * 3 >= total * 2` in `u128`, never a division, so
//! the boundary is exact and large powers cannot overflow.

use std::collections::HashMap;

use shared_types::BtcPublicKey;
use tracing::debug;

/// Voting power per registered provider at one BTC height.
pub type PowerTable = HashMap<BtcPublicKey, u64>;

/// Two-thirds-by-weight check.
pub fn has_quorum(voted_power: u64, total_power: u64) -> bool {
    (voted_power as u128) * 3 >= (total_power as u128) * 2
}

pub fn total_power(table: &PowerTable) -> u64 {
    table.values().fold(0u64, |acc, p| acc.saturating_add(*p))
}

/// Sums the power of `voters` (hex BTC keys as reported by the gadget
/// contract). Voters that are not registered, unparsable or repeated add
/// nothing.
pub fn tally_voted_power<S: AsRef<str>>(table: &PowerTable, voters: &[S]) -> u64 {
    let mut counted = Vec::with_capacity(voters.len());
    let mut voted = 0u64;

    for voter in voters {
        let Ok(pk) = BtcPublicKey::from_hex(voter.as_ref()) else {
            debug!(voter = voter.as_ref(), "[fp-03] Ignoring malformed voter key");
            continue;
        };
        if counted.contains(&pk) {
            continue;
        }
        if let Some(power) = table.get(&pk) {
            voted = voted.saturating_add(*power);
        }
        counted.push(pk);
    }
    voted
}
