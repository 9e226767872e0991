//! `[finality_gadget]` configuration section.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use shared_types::ConfigError;

const SECTION: &str = "finality_gadget";

/// Connection settings for the gadget's Bitcoin, settlement-chain and
/// contract clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FinalityGadgetConfig {
    /// Bitcoin node RPC `host:port`.
    pub bitcoin_rpc_host: String,
    pub bitcoin_rpc_user: String,
    pub bitcoin_rpc_pass: String,
    pub bitcoin_disable_tls: bool,
    /// Address of the finality gadget contract on the settlement chain.
    pub fg_contract_address: String,
    pub bbn_chain_id: String,
    /// Settlement-chain REST address used for staking and contract queries.
    pub bbn_rpc_address: String,
    /// Activation recorder poll interval, seconds.
    pub poll_interval_secs: u64,
}

impl Default for FinalityGadgetConfig {
    fn default() -> Self {
        Self {
            bitcoin_rpc_host: "127.0.0.1:18443".into(),
            bitcoin_rpc_user: String::new(),
            bitcoin_rpc_pass: String::new(),
            bitcoin_disable_tls: true,
            fg_contract_address: String::new(),
            bbn_chain_id: String::new(),
            bbn_rpc_address: "http://127.0.0.1:1317".into(),
            poll_interval_secs: 10,
        }
    }
}

impl FinalityGadgetConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        ConfigError::require(SECTION, "bitcoin_rpc_host", &self.bitcoin_rpc_host)?;
        ConfigError::require(SECTION, "fg_contract_address", &self.fg_contract_address)?;
        ConfigError::require(SECTION, "bbn_chain_id", &self.bbn_chain_id)?;
        ConfigError::require(SECTION, "bbn_rpc_address", &self.bbn_rpc_address)?;
        if self.poll_interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                section: SECTION,
                field: "poll_interval_secs",
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }
}
