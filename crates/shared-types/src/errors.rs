//! # Error Types
//!
//! Errors raised by the capability ports and shared validation.

use thiserror::Error;

/// Errors from settlement-chain, contract, Bitcoin and indexer clients.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// The request never produced a response.
    #[error("transport error: {0}")]
    Transport(String),

    /// Non-success HTTP status.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The response body could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// A logical error reported inside an otherwise successful response.
    #[error("application error: {0}")]
    Application(String),

    /// The requested object does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The request could not be built from the given input.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl From<serde_json::Error> for ClientError {
    fn from(e: serde_json::Error) -> Self {
        ClientError::Decode(e.to_string())
    }
}

impl From<ValidationError> for ClientError {
    fn from(e: ValidationError) -> Self {
        ClientError::Decode(e.to_string())
    }
}

/// Errors from reliably sending messages to the settlement chain.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SendError {
    /// The chain rejected the transaction with an error the caller marked as
    /// unrecoverable.
    #[error("unrecoverable chain error {codespace}/{code}: {log}")]
    Unrecoverable {
        codespace: String,
        code: u32,
        log: String,
    },

    /// Transient failures persisted past the retry budget.
    #[error("gave up after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },

    /// Messages could not be encoded for broadcast.
    #[error("encode error: {0}")]
    Encode(String),

    /// Nothing to send.
    #[error("empty message batch")]
    EmptyBatch,

    /// The sender was stopped.
    #[error("sender stopped")]
    Stopped,
}

/// Errors from the durable activation and block stores.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// Key not present.
    #[error("not found: {0}")]
    NotFound(String),

    /// Stored bytes could not be decoded.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Database operation failed.
    #[error("database error: {0}")]
    DatabaseError(String),

    /// Another process holds the database lock.
    #[error("database locked: {0}")]
    Locked(String),
}

/// Malformed domain values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("public randomness commit must cover at least one height")]
    EmptyPubRandRange,

    #[error("commitment must be {expected} bytes, got {actual}")]
    CommitmentLength { expected: usize, actual: usize },

    #[error("invalid BTC public key: {0}")]
    InvalidPublicKey(String),

    #[error("invalid block hash: {0}")]
    InvalidBlockHash(String),
}

/// Invalid or incomplete configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("[{section}] {field} must be set")]
    MissingField {
        section: &'static str,
        field: &'static str,
    },

    #[error("[{section}] invalid {field}: {reason}")]
    InvalidValue {
        section: &'static str,
        field: &'static str,
        reason: String,
    },

    #[error("unsupported consumer chain type: {0}")]
    UnsupportedChainType(String),
}

impl ConfigError {
    /// Fails with [`ConfigError::MissingField`] when `value` is blank.
    pub fn require(
        section: &'static str,
        field: &'static str,
        value: &str,
    ) -> Result<(), ConfigError> {
        if value.trim().is_empty() {
            return Err(ConfigError::MissingField { section, field });
        }
        Ok(())
    }
}
