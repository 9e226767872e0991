//! Error types for the finality SDK

use fp_03_finality_gadget::GadgetError;
use shared_types::{ClientError, StorageError, ValidationError};
use thiserror::Error;

/// Finality SDK errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SdkError {
    /// The verification endpoint rejected the block.
    #[error("verify block failed")]
    VerifyFailed,

    /// Nothing has been committed yet.
    #[error("no block has been committed")]
    NoBlocks,

    /// The committed block is malformed.
    #[error(transparent)]
    InvalidBlock(#[from] ValidationError),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Gadget(#[from] GadgetError),
}

pub type SdkResult<T> = Result<T, SdkError>;
