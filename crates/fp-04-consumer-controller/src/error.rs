//! Error types for the consumer controllers

use fp_03_finality_gadget::GadgetError;
use shared_types::{ClientError, ConfigError, SendError, StorageError, ValidationError};
use thiserror::Error;

/// Consumer controller errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControllerError {
    /// Batch inputs of different lengths. Raised before any network call.
    #[error("the number of blocks {blocks} should match the number of {what} {actual}")]
    CardinalityMismatch {
        what: &'static str,
        blocks: usize,
        actual: usize,
    },

    /// Inclusion proof bytes are not a valid proof.
    #[error("failed to decode inclusion proof: {0}")]
    ProofDecode(String),

    /// The contract returned a public randomness commit that fails validation.
    #[error("invalid public randomness commit: {0}")]
    InvalidPubRandCommit(ValidationError),

    /// Block hash from the chain is not a well-formed digest.
    #[error("invalid block hash: {0}")]
    InvalidBlockHash(ValidationError),

    /// Unknown chain-type tag.
    #[error("unsupported consumer chain: {0}")]
    UnsupportedConsumerChain(String),

    /// Activation height search target lies after the chain head.
    #[error("target timestamp {target} is after the latest block timestamp {latest}")]
    TimestampInFuture { target: u64, latest: u64 },

    /// A backend could not be constructed.
    #[error("failed to create {backend} consumer controller: {source}")]
    Construction {
        backend: &'static str,
        source: Box<ControllerError>,
    },

    #[error("submission failed: {0}")]
    Submission(#[from] SendError),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Gadget(#[from] GadgetError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ControllerError {
    pub(crate) fn construction(backend: &'static str) -> impl FnOnce(ControllerError) -> ControllerError {
        move |source| ControllerError::Construction {
            backend,
            source: Box::new(source),
        }
    }
}

/// Result type for controller operations
pub type ControllerResult<T> = Result<T, ControllerError>;
