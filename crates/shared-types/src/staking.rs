//! # BTC Staking Records
//!
//! Delegation records as returned by the settlement chain, the activity rule
//! applied to them, and the paginated scans every backend shares.

use std::convert::Infallible;

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr, PickFirst};

use crate::entities::BtcPublicKey;
use crate::errors::ClientError;
use crate::ports::BabylonQueryClient;

/// Delegations requested per page when scanning a provider.
pub const DELEGATION_PAGE_SIZE: u64 = 100;

/// Staking parameters relevant to delegation activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct StakingParams {
    /// Covenant signatures required to activate or unbond a delegation.
    pub covenant_quorum: u32,
}

/// A covenant member's signature entry. Only presence is evaluated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CovenantSig {
    #[serde(default, alias = "pk")]
    pub cov_pk_hex: String,
}

/// Unbonding state of a delegation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Undelegation {
    /// Staker's unbonding signature; present once the staker unbonded.
    #[serde(default, alias = "delegator_unbonding_sig_hex")]
    pub delegator_unbonding_sig: Option<String>,
    #[serde(default, alias = "covenant_unbonding_sig_list")]
    pub covenant_unbonding_sigs: Vec<CovenantSig>,
    #[serde(default)]
    pub covenant_slashing_sigs: Vec<CovenantSig>,
}

impl Undelegation {
    pub fn has_unbonding_sig(&self) -> bool {
        self.delegator_unbonding_sig
            .as_deref()
            .is_some_and(|sig| !sig.is_empty())
    }
}

/// One BTC delegation to a finality provider.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct BtcDelegation {
    /// BTC height at which the staking output was confirmed.
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    #[serde(default)]
    pub start_height: u64,
    #[serde(default)]
    pub covenant_sigs: Vec<CovenantSig>,
    #[serde(default, alias = "undelegation_response")]
    pub undelegation: Undelegation,
}

/// Cursor-based page request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PageRequest {
    pub key: Option<Vec<u8>>,
    pub limit: u64,
}

impl PageRequest {
    pub fn new(key: Option<Vec<u8>>, limit: u64) -> Self {
        Self { key, limit }
    }
}

/// One page of delegations plus the cursor for the next page.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DelegationPage {
    pub delegations: Vec<BtcDelegation>,
    pub next_key: Option<Vec<u8>>,
}

/// Decides whether a delegation currently carries voting power.
///
/// Active means the staker has not unbonded and the covenant, unbonding and
/// slashing signature counts each reach `quorum`. The error type is
/// uninhabited: evaluation never fails.
pub fn is_delegation_active(quorum: u32, del: &BtcDelegation) -> Result<bool, Infallible> {
    let quorum = quorum as usize;
    let ud = &del.undelegation;

    if ud.has_unbonding_sig() {
        return Ok(false);
    }
    if del.covenant_sigs.len() < quorum {
        return Ok(false);
    }
    if ud.covenant_unbonding_sigs.len() < quorum {
        return Ok(false);
    }
    if ud.covenant_slashing_sigs.len() < quorum {
        return Ok(false);
    }
    Ok(true)
}

/// Walks every delegation page of `fp_pk`, calling `visit` on each record
/// until it returns `true` or the cursor is exhausted.
async fn scan_delegations<C, F>(client: &C, fp_pk: &BtcPublicKey, mut visit: F) -> Result<(), ClientError>
where
    C: BabylonQueryClient + ?Sized,
    F: FnMut(&BtcDelegation) -> bool,
{
    let mut key = None;
    loop {
        let page = client
            .finality_provider_delegations(fp_pk, PageRequest::new(key.take(), DELEGATION_PAGE_SIZE))
            .await?;

        if page.delegations.iter().any(&mut visit) {
            return Ok(());
        }

        match page.next_key {
            Some(next) if !next.is_empty() => key = Some(next),
            _ => return Ok(()),
        }
    }
}

/// Whether `fp_pk` has at least one active delegation under the chain's
/// current covenant quorum. Stops at the first active record.
pub async fn provider_has_active_delegation<C>(
    client: &C,
    fp_pk: &BtcPublicKey,
) -> Result<bool, ClientError>
where
    C: BabylonQueryClient + ?Sized,
{
    let quorum = client.btc_staking_params().await?.covenant_quorum;
    let mut found = false;

    scan_delegations(client, fp_pk, |del| {
        // A record that cannot be evaluated is skipped, not fatal.
        found = is_delegation_active(quorum, del).unwrap_or(false);
        found
    })
    .await?;

    Ok(found)
}

/// Lowest BTC start height over the active delegations of all `fp_pks`.
///
/// `None` when no provider has an active delegation, i.e. staking has not
/// activated.
pub async fn earliest_active_delegation_height<C>(
    client: &C,
    fp_pks: &[BtcPublicKey],
) -> Result<Option<u64>, ClientError>
where
    C: BabylonQueryClient + ?Sized,
{
    let quorum = client.btc_staking_params().await?.covenant_quorum;
    let mut earliest: Option<u64> = None;

    for fp_pk in fp_pks {
        scan_delegations(client, fp_pk, |del| {
            if is_delegation_active(quorum, del).unwrap_or(false) {
                earliest = Some(earliest.map_or(del.start_height, |h| h.min(del.start_height)));
            }
            false
        })
        .await?;
    }

    Ok(earliest)
}
