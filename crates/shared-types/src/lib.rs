//! # Shared Types Crate
//!
//! Domain entities, settlement messages and capability ports shared by the
//! consumer controllers, the finality gadget and the daemon.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: `BlockInfo`, `PubRandCommit`, `Proof` and the
//!   delegation records are defined once here.
//! - **Ports, not clients**: every network or disk capability the core needs is
//!   an `async-trait` port in [`ports`]; concrete transports live in
//!   `fp-01-chain-clients` and `fp-02-block-store`.
//! - **Shared rules**: the delegation activity evaluator and the delegation
//!   pagination scan live in [`staking`] so each backend reuses them.

pub mod entities;
pub mod errors;
pub mod messages;
/// In-memory port doubles.
/// Requires feature: `test-utils`
#[cfg(any(test, feature = "test-utils"))]
pub mod mocks;
pub mod ports;
pub mod staking;

pub use entities::*;
pub use errors::*;
pub use messages::{ChainErrorCode, SettlementMsg};
pub use ports::*;
pub use staking::{
    earliest_active_delegation_height, is_delegation_active, provider_has_active_delegation,
    BtcDelegation, DelegationPage, PageRequest, StakingParams, Undelegation,
    DELEGATION_PAGE_SIZE,
};
