//! Error types for the finality gadget

use shared_types::{ClientError, StorageError};
use thiserror::Error;

/// Finality gadget errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GadgetError {
    /// No registered provider has an active delegation at the queried BTC
    /// height. Expected while the consumer chain is bootstrapping.
    #[error("BTC staking is not activated for the consumer chain")]
    BtcStakingNotActivated,

    /// Providers exist but none carries voting power at the BTC height.
    #[error("no finality provider has voting power")]
    NoFpHasVotingPower,

    /// Nothing recorded in the activation store yet.
    #[error("activation timestamp not found")]
    ActivationTimestampNotFound,

    /// The gadget contract answered with an unexpected payload.
    #[error("gadget contract query {query} failed: {reason}")]
    Contract { query: &'static str, reason: String },

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl GadgetError {
    /// Conditions that clear up on their own as the chain makes progress.
    pub fn is_expected(&self) -> bool {
        matches!(
            self,
            GadgetError::BtcStakingNotActivated
                | GadgetError::NoFpHasVotingPower
                | GadgetError::ActivationTimestampNotFound
        )
    }
}

/// Result type for gadget operations
pub type GadgetResult<T> = Result<T, GadgetError>;
