//! Client configuration sections.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use shared_types::ConfigError;

/// Settlement-chain connection (`[babylon]`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BabylonClientConfig {
    /// REST (LCD) gateway address.
    pub lcd_address: String,
    pub chain_id: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Signer service that owns the key and broadcasts transactions.
    pub signer_address: String,
    /// Name of the signing key held by the signer service.
    pub key: String,
    /// Settlement-chain address of `key`.
    pub account_address: String,
}

impl Default for BabylonClientConfig {
    fn default() -> Self {
        Self {
            lcd_address: "http://localhost:1317".to_string(),
            chain_id: "chain-test".to_string(),
            timeout_secs: 20,
            signer_address: "http://localhost:12582".to_string(),
            key: "finality-provider".to_string(),
            account_address: String::new(),
        }
    }
}

impl BabylonClientConfig {
    const SECTION: &'static str = "babylon";

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        ConfigError::require(Self::SECTION, "lcd_address", &self.lcd_address)?;
        ConfigError::require(Self::SECTION, "chain_id", &self.chain_id)?;
        ConfigError::require(Self::SECTION, "signer_address", &self.signer_address)?;
        ConfigError::require(Self::SECTION, "account_address", &self.account_address)?;
        if self.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                section: Self::SECTION,
                field: "timeout_secs",
                reason: "must be positive".into(),
            });
        }
        Ok(())
    }
}

/// bitcoind JSON-RPC connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BitcoinRpcConfig {
    /// `host:port` of the node.
    pub rpc_host: String,
    pub rpc_user: String,
    pub rpc_pass: String,
    /// Use plain HTTP.
    pub disable_tls: bool,
    pub timeout_secs: u64,
}

impl Default for BitcoinRpcConfig {
    fn default() -> Self {
        Self {
            rpc_host: "127.0.0.1:38332".to_string(),
            rpc_user: String::new(),
            rpc_pass: String::new(),
            disable_tls: true,
            timeout_secs: 20,
        }
    }
}

impl BitcoinRpcConfig {
    pub fn url(&self) -> String {
        let scheme = if self.disable_tls { "http" } else { "https" };
        format!("{scheme}://{}", self.rpc_host)
    }

    pub fn validate(&self, section: &'static str) -> Result<(), ConfigError> {
        ConfigError::require(section, "bitcoin_rpc_host", &self.rpc_host)
    }
}

/// Retry policy of the reliable sender (`[sender]`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SenderConfig {
    /// Broadcast attempts before giving up, first one included.
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_backoff_ms: 500,
            max_backoff_ms: 10_000,
        }
    }
}

impl SenderConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.initial_backoff_ms > self.max_backoff_ms {
            return Err(ConfigError::InvalidValue {
                section: "sender",
                field: "initial_backoff_ms",
                reason: format!(
                    "{} exceeds max_backoff_ms {}",
                    self.initial_backoff_ms, self.max_backoff_ms
                ),
            });
        }
        Ok(())
    }

    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }
}
