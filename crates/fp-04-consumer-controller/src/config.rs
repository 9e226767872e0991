//! Consumer chain selection and per-backend configuration sections.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use fp_01_chain_clients::{BabylonClientConfig, SenderConfig};
use serde::{Deserialize, Serialize};
use shared_types::ConfigError;

/// Backend variant selected by the `chain_type` tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChainType {
    Babylon,
    OpStackL2,
    Wasm,
    Generic,
}

impl ChainType {
    pub const ALL: [ChainType; 4] = [
        ChainType::Babylon,
        ChainType::OpStackL2,
        ChainType::Wasm,
        ChainType::Generic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChainType::Babylon => "babylon",
            ChainType::OpStackL2 => "OPStackL2",
            ChainType::Wasm => "wasm",
            ChainType::Generic => "generic",
        }
    }

    /// Chain types whose blocks are committed through the finality SDK.
    pub fn serves_finality_sdk(&self) -> bool {
        matches!(self, ChainType::Wasm | ChainType::Generic)
    }
}

impl fmt::Display for ChainType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChainType {
    type Err = ConfigError;

    /// Tags are matched exactly, case included.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ChainType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ConfigError::UnsupportedChainType(s.to_string()))
    }
}

/// REST-indexed consumer (`[opstackl2]`, `[generic]`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexerChainConfig {
    /// Indexer namespace of the consumer chain.
    pub namespace: String,
    /// Indexer base URL.
    pub service_rpc: String,
    /// Finality gadget contract that receives votes.
    pub finality_gadget_address: String,
    pub timeout_secs: u64,
}

impl Default for IndexerChainConfig {
    fn default() -> Self {
        Self {
            namespace: String::new(),
            service_rpc: "http://127.0.0.1:8080".into(),
            finality_gadget_address: String::new(),
            timeout_secs: 20,
        }
    }
}

impl IndexerChainConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    pub fn validate(&self, section: &'static str) -> Result<(), ConfigError> {
        ConfigError::require(section, "namespace", &self.namespace)?;
        ConfigError::require(section, "service_rpc", &self.service_rpc)?;
        ConfigError::require(section, "finality_gadget_address", &self.finality_gadget_address)
    }
}

/// Store-backed CosmWasm consumer (`[cosmwasm]`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CosmwasmConfig {
    pub finality_contract_address: String,
    pub btc_staking_contract_address: String,
}

impl CosmwasmConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        ConfigError::require("cosmwasm", "finality_contract_address", &self.finality_contract_address)
    }
}

/// Everything the factory needs to build any backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// `babylon | OPStackL2 | wasm | generic`
    pub chain_type: String,
    pub babylon: BabylonClientConfig,
    pub sender: SenderConfig,
    pub opstackl2: IndexerChainConfig,
    pub generic: IndexerChainConfig,
    pub cosmwasm: CosmwasmConfig,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            chain_type: ChainType::Babylon.as_str().into(),
            babylon: BabylonClientConfig::default(),
            sender: SenderConfig::default(),
            opstackl2: IndexerChainConfig::default(),
            generic: IndexerChainConfig::default(),
            cosmwasm: CosmwasmConfig::default(),
        }
    }
}

impl ControllerConfig {
    pub fn chain_type(&self) -> Result<ChainType, ConfigError> {
        self.chain_type.parse()
    }
}
