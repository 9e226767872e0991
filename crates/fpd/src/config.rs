//! # Daemon Configuration
//!
//! One TOML file. Top-level keys plus one table per component:
//!
//! ```toml
//! chain_type = "generic"
//! log_level = "info"
//! db_path = "data"
//! api_port = 8081
//!
//! [babylon]
//! lcd_address = "http://localhost:1317"
//! account_address = "bbn1..."
//!
//! [finality_gadget]
//! fg_contract_address = "bbn1..."
//! bbn_chain_id = "bbn-test"
//!
//! [generic]
//! namespace = "gen-test"
//! service_rpc = "http://localhost:8080"
//! finality_gadget_address = "bbn1..."
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use fp_02_block_store::{StoreBackend, StoreConfig};
use fp_03_finality_gadget::FinalityGadgetConfig;
use fp_04_consumer_controller::ControllerConfig;
use fp_05_finality_sdk::SdkConfig;
use serde::{Deserialize, Serialize};

/// Name of the config file inside the home directory.
pub const CONFIG_FILE_NAME: &str = "fpd.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FpdConfig {
    /// `chain_type` plus the `[babylon]`, `[sender]`, `[opstackl2]`,
    /// `[generic]` and `[cosmwasm]` tables.
    #[serde(flatten)]
    pub controller: ControllerConfig,
    pub finality_gadget: FinalityGadgetConfig,
    pub finality_sdk: SdkConfig,
    pub log_level: String,
    /// Unset means the `FP_JSON_LOGS` environment decides.
    pub json_logs: Option<bool>,
    /// Data directory, relative to the home directory unless absolute.
    pub db_path: PathBuf,
    /// Defaults to RocksDB when built with the `rocksdb` feature. The `file`
    /// backend rewrites its whole snapshot on every write, so it does not
    /// scale to chain types that commit a block per consumer block.
    pub db_backend: StoreBackend,
    /// Port of the finality SDK routes.
    pub api_port: u16,
}

impl Default for FpdConfig {
    fn default() -> Self {
        Self {
            controller: ControllerConfig::default(),
            finality_gadget: FinalityGadgetConfig::default(),
            finality_sdk: SdkConfig::default(),
            log_level: "info".into(),
            json_logs: None,
            db_path: PathBuf::from("data"),
            db_backend: StoreBackend::default(),
            api_port: 8081,
        }
    }
}

impl FpdConfig {
    pub fn from_toml(raw: &str) -> Result<Self> {
        toml::from_str(raw).context("failed to parse configuration")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read configuration file {}", path.display()))?;
        Self::from_toml(&raw).with_context(|| format!("invalid configuration file {}", path.display()))
    }

    /// Anchors relative paths at `home`.
    pub fn resolve_paths(&mut self, home: &Path) {
        if self.db_path.is_relative() {
            self.db_path = home.join(&self.db_path);
        }
    }

    /// Whether the finality gadget section is filled in.
    pub fn gadget_configured(&self) -> bool {
        !self.finality_gadget.fg_contract_address.trim().is_empty()
    }

    /// Checks the sections every chain type depends on. Backend sections are
    /// validated by the controller factory.
    pub fn validate(&self) -> Result<()> {
        self.controller
            .chain_type()
            .context("invalid chain_type")?;
        if self.gadget_configured() {
            self.finality_gadget
                .validate()
                .context("invalid [finality_gadget] section")?;
        }
        Ok(())
    }

    /// Whether the finality SDK would commit every consumer block into a
    /// store that rewrites itself on each write.
    pub fn sdk_on_snapshot_store(&self) -> bool {
        self.db_backend.rewrites_on_write()
            && self
                .controller
                .chain_type()
                .is_ok_and(|chain| chain.serves_finality_sdk())
    }

    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            backend: self.db_backend,
            path: self.db_path.clone(),
        }
    }

    /// Verification agent of the finality SDK, defaulting to the generic
    /// indexer.
    pub fn sdk_agent_url(&self) -> &str {
        self.finality_sdk
            .agent_url_or(&self.controller.generic.service_rpc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fp_04_consumer_controller::ChainType;

    const SAMPLE: &str = r#"
chain_type = "generic"
log_level = "debug"
db_path = "store"
db_backend = "memory"
api_port = 9090

[babylon]
lcd_address = "http://lcd:1317"
chain_id = "bbn-test"
account_address = "bbn1fp"

[sender]
max_retries = 2

[finality_gadget]
fg_contract_address = "bbn1gadget"
bbn_chain_id = "bbn-test"
poll_interval_secs = 3

[generic]
namespace = "gen-test"
service_rpc = "http://indexer:8080"
finality_gadget_address = "bbn1gadget"
"#;

    #[test]
    fn test_parse_sample() {
        let cfg = FpdConfig::from_toml(SAMPLE).unwrap();

        assert_eq!(cfg.controller.chain_type(), Ok(ChainType::Generic));
        assert_eq!(cfg.controller.babylon.lcd_address, "http://lcd:1317");
        assert_eq!(cfg.controller.babylon.timeout_secs, 20);
        assert_eq!(cfg.controller.sender.max_retries, 2);
        assert_eq!(cfg.controller.generic.namespace, "gen-test");
        assert_eq!(cfg.finality_gadget.poll_interval_secs, 3);
        assert_eq!(cfg.db_backend, StoreBackend::Memory);
        assert_eq!(cfg.api_port, 9090);
        assert_eq!(cfg.json_logs, None);
        assert_eq!(cfg.sdk_agent_url(), "http://indexer:8080");
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_defaults_from_empty_file() {
        let cfg = FpdConfig::from_toml("").unwrap();
        assert_eq!(cfg, FpdConfig::default());
        assert!(!cfg.gadget_configured());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_unknown_chain() {
        let cfg = FpdConfig::from_toml(r#"chain_type = "cosmos""#).unwrap();
        let err = cfg.validate().unwrap_err();
        assert!(format!("{err:#}").contains("unsupported consumer chain type: cosmos"));
    }

    #[test]
    fn test_validate_checks_gadget_section() {
        let cfg = FpdConfig::from_toml("[finality_gadget]\nfg_contract_address = \"bbn1gadget\"\n").unwrap();
        let err = cfg.validate().unwrap_err();
        assert!(format!("{err:#}").contains("bbn_chain_id must be set"));
    }

    #[test]
    fn test_sdk_on_snapshot_store() {
        let wasm_file = FpdConfig::from_toml("chain_type = \"wasm\"\ndb_backend = \"file\"\n").unwrap();
        assert!(wasm_file.sdk_on_snapshot_store());

        let wasm_rocks = FpdConfig::from_toml("chain_type = \"wasm\"\ndb_backend = \"rocksdb\"\n").unwrap();
        assert!(!wasm_rocks.sdk_on_snapshot_store());

        let babylon_file = FpdConfig::from_toml("chain_type = \"babylon\"\ndb_backend = \"file\"\n").unwrap();
        assert!(!babylon_file.sdk_on_snapshot_store());
    }

    #[test]
    fn test_resolve_paths() {
        let mut cfg = FpdConfig::default();
        cfg.resolve_paths(Path::new("/home/fp/.fpd"));
        assert_eq!(cfg.db_path, PathBuf::from("/home/fp/.fpd/data"));

        cfg.db_path = PathBuf::from("/var/lib/fpd");
        cfg.resolve_paths(Path::new("/home/fp/.fpd"));
        assert_eq!(cfg.db_path, PathBuf::from("/var/lib/fpd"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, SAMPLE).unwrap();

        assert_eq!(FpdConfig::load(&path).unwrap().api_port, 9090);
        assert!(FpdConfig::load(&dir.path().join("missing.toml")).is_err());
    }
}
