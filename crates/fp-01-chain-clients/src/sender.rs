//! # Reliable Sender
//!
//! [`RetryingSender`] implements the `ReliableSender` port on top of a
//! [`TxBroadcaster`], which signs and broadcasts one transaction per call.
//!
//! Classification of a non-zero result code:
//!
//! | Code in | Outcome |
//! |---------|---------|
//! | `expected` | skipped `TxResponse`, no retry |
//! | `unrecoverable` | `SendError::Unrecoverable`, no retry |
//! | neither | retried with exponential backoff up to `max_retries` |
//!
//! Transport failures are always treated as transient.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde::Deserialize;
use shared_types::messages::contains_code;
use shared_types::{ChainErrorCode, ClientError, ReliableSender, SendError, SettlementMsg, TxResponse};
use tracing::{debug, info, warn};

use crate::config::SenderConfig;

/// Result of one broadcast attempt. `code == 0` means the transaction was
/// included.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Default)]
pub struct BroadcastOutcome {
    #[serde(default)]
    pub tx_hash: String,
    #[serde(default)]
    pub codespace: String,
    #[serde(default)]
    pub code: u32,
    #[serde(default)]
    pub raw_log: String,
}

impl BroadcastOutcome {
    pub fn is_success(&self) -> bool {
        self.code == 0
    }
}

/// Signs and broadcasts a batch of messages as a single transaction.
#[async_trait]
pub trait TxBroadcaster: Send + Sync {
    async fn broadcast(&self, msgs: &[SettlementMsg]) -> Result<BroadcastOutcome, ClientError>;
}

/// `ReliableSender` with bounded exponential backoff.
pub struct RetryingSender<B: TxBroadcaster> {
    broadcaster: B,
    address: String,
    config: SenderConfig,
    stopped: AtomicBool,
}

impl<B: TxBroadcaster> RetryingSender<B> {
    pub fn new(broadcaster: B, address: impl Into<String>, config: SenderConfig) -> Self {
        Self {
            broadcaster,
            address: address.into(),
            config,
            stopped: AtomicBool::new(false),
        }
    }

    pub fn broadcaster(&self) -> &B {
        &self.broadcaster
    }
}

#[async_trait]
impl<B: TxBroadcaster> ReliableSender for RetryingSender<B> {
    fn sender_address(&self) -> String {
        self.address.clone()
    }

    async fn send_msgs(
        &self,
        msgs: Vec<SettlementMsg>,
        expected: &[ChainErrorCode],
        unrecoverable: &[ChainErrorCode],
    ) -> Result<TxResponse, SendError> {
        if self.stopped.load(Ordering::Acquire) {
            return Err(SendError::Stopped);
        }
        if msgs.is_empty() {
            return Err(SendError::EmptyBatch);
        }

        let attempts = self.config.max_retries.max(1);
        let mut backoff = self.config.initial_backoff();
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            match self.broadcaster.broadcast(&msgs).await {
                Ok(outcome) if outcome.is_success() => {
                    info!(
                        tx_hash = %outcome.tx_hash,
                        msgs = msgs.len(),
                        kind = msgs[0].kind(),
                        "[fp-01] Transaction committed"
                    );
                    return Ok(TxResponse::committed(outcome.tx_hash));
                }
                Ok(outcome) if contains_code(expected, &outcome.codespace, outcome.code) => {
                    warn!(
                        codespace = %outcome.codespace,
                        code = outcome.code,
                        log = %outcome.raw_log,
                        "[fp-01] Expected chain error, skipping"
                    );
                    return Ok(TxResponse::skipped());
                }
                Ok(outcome) if contains_code(unrecoverable, &outcome.codespace, outcome.code) => {
                    return Err(SendError::Unrecoverable {
                        codespace: outcome.codespace,
                        code: outcome.code,
                        log: outcome.raw_log,
                    });
                }
                Ok(outcome) => {
                    last_error = format!(
                        "{}/{}: {}",
                        outcome.codespace, outcome.code, outcome.raw_log
                    );
                }
                Err(e) => last_error = e.to_string(),
            }

            if attempt < attempts {
                debug!(attempt, backoff_ms = backoff.as_millis() as u64, error = %last_error, "[fp-01] Retrying broadcast");
                tokio::time::sleep(backoff).await;
                backoff = (backoff * 2).min(self.config.max_backoff());
            }
        }

        Err(SendError::RetriesExhausted {
            attempts,
            last_error,
        })
    }

    async fn stop(&self) -> Result<(), SendError> {
        self.stopped.store(true, Ordering::Release);
        Ok(())
    }
}
