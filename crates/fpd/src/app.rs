//! # Daemon Wiring
//!
//! ## Startup Sequence
//!
//! 1. Open the finality database
//! 2. Build the finality gadget (when `[finality_gadget]` is configured)
//!    and spawn its activation recorder
//! 3. Build the consumer controller for `chain_type`
//! 4. Serve the finality SDK routes for `generic` and `wasm`
//!
//! Every background task watches the same shutdown channel.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use fp_01_chain_clients::{BabylonClientConfig, BabylonLcdClient, BitcoinRpcClient, BitcoinRpcConfig, VerifierClient};
use fp_02_block_store::FinalityDb;
use fp_03_finality_gadget::{CwGadgetContract, FinalityGadget, FinalityGadgetApi, FinalityGadgetConfig, RecorderExit};
use fp_04_consumer_controller::{new_consumer_controller, ConsumerController, ControllerDeps};
use fp_05_finality_sdk::FinalitySdk;
use fp_telemetry::component_span;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn, Instrument};

use crate::config::FpdConfig;

/// The gadget as wired in the daemon.
pub type DaemonGadget =
    FinalityGadget<CwGadgetContract<BabylonLcdClient>, BabylonLcdClient, BitcoinRpcClient, FinalityDb>;

/// Upper bound on waiting for a background task after shutdown is signalled.
const TASK_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Builds the gadget from `[finality_gadget]` over the shared database.
pub fn build_gadget(config: &FinalityGadgetConfig, db: Arc<FinalityDb>) -> Result<DaemonGadget> {
    let lcd = Arc::new(
        BabylonLcdClient::new(&BabylonClientConfig {
            lcd_address: config.bbn_rpc_address.clone(),
            chain_id: config.bbn_chain_id.clone(),
            ..Default::default()
        })
        .context("failed to create settlement-chain client")?,
    );
    let btc = Arc::new(
        BitcoinRpcClient::new(&BitcoinRpcConfig {
            rpc_host: config.bitcoin_rpc_host.clone(),
            rpc_user: config.bitcoin_rpc_user.clone(),
            rpc_pass: config.bitcoin_rpc_pass.clone(),
            disable_tls: config.bitcoin_disable_tls,
            ..Default::default()
        })
        .context("failed to create bitcoin client")?,
    );
    let contract = CwGadgetContract::new(lcd.clone(), config.fg_contract_address.clone());

    Ok(FinalityGadget::new(contract, lcd, btc, db, config.poll_interval()))
}

/// A started daemon.
pub struct FpdApp {
    config: FpdConfig,
    db: Arc<FinalityDb>,
    gadget: Option<Arc<DaemonGadget>>,
    controller: Box<dyn ConsumerController>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
    recorder: Option<JoinHandle<RecorderExit>>,
    api_server: Option<JoinHandle<std::io::Result<()>>>,
}

impl FpdApp {
    /// Opens storage and builds every component. Nothing runs until
    /// [`FpdApp::start`].
    pub fn new(config: FpdConfig) -> Result<Self> {
        config.validate()?;
        if config.sdk_on_snapshot_store() {
            warn!(
                chain_type = %config.controller.chain_type,
                "[fpd] db_backend = file rewrites the whole database on every committed block, use rocksdb"
            );
        }

        let db = Arc::new(
            FinalityDb::open(&config.store_config())
                .with_context(|| format!("failed to open finality database at {}", config.db_path.display()))?,
        );

        let gadget = if config.gadget_configured() {
            let gadget = build_gadget(&config.finality_gadget, db.clone()).context("failed to create finality gadget")?;
            Some(Arc::new(gadget))
        } else {
            warn!("[fpd] No finality gadget contract configured, activation recorder disabled");
            None
        };

        let deps = ControllerDeps {
            gadget: gadget.clone().map(|g| g as Arc<dyn FinalityGadgetApi>),
            db: Some(db.clone()),
        };
        let controller = new_consumer_controller(&config.controller, &deps)
            .context("failed to create consumer controller")?;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Ok(Self {
            config,
            db,
            gadget,
            controller,
            shutdown_tx,
            shutdown_rx,
            recorder: None,
            api_server: None,
        })
    }

    pub fn controller(&self) -> &dyn ConsumerController {
        self.controller.as_ref()
    }

    /// Spawns the activation recorder and, for chain types that receive
    /// blocks through it, the finality SDK server.
    pub async fn start(&mut self) -> Result<()> {
        let chain_type = self.config.controller.chain_type()?;
        info!("===========================================");
        info!("  Finality Provider Daemon v{}", env!("CARGO_PKG_VERSION"));
        info!("  Consumer chain: {}", chain_type);
        info!("===========================================");

        if let Some(gadget) = &self.gadget {
            let gadget = Arc::clone(gadget);
            let shutdown = self.shutdown_rx.clone();
            let task = async move { gadget.run_activation_recorder(shutdown).await };
            self.recorder = Some(tokio::spawn(
                task.instrument(component_span!("activation_recorder", component = "fp-03")),
            ));
            info!("[fpd] Activation recorder started");
        }

        if chain_type.serves_finality_sdk() {
            let Some(gadget) = &self.gadget else {
                bail!("chain type {chain_type} serves the finality SDK and needs [finality_gadget] configured");
            };
            let agent_url = self.config.sdk_agent_url();
            let verifier = VerifierClient::new(agent_url, self.config.finality_sdk.timeout())
                .with_context(|| format!("failed to create block verifier for {agent_url}"))?;
            let sdk = FinalitySdk::new(
                Arc::new(verifier),
                self.db.clone(),
                Arc::clone(gadget) as Arc<dyn FinalityGadgetApi>,
            );

            let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.config.api_port));
            let shutdown = self.shutdown_rx.clone();
            let task = fp_05_finality_sdk::serve(addr, Arc::new(sdk), shutdown);
            self.api_server = Some(tokio::spawn(
                task.instrument(component_span!("finality_sdk", component = "fp-05", port = self.config.api_port)),
            ));
        }

        info!("Data Dir: {}", self.config.db_path.display());
        Ok(())
    }

    /// Signals every task, waits for them, then closes the controller.
    pub async fn shutdown(mut self) -> Result<()> {
        info!("Initiating graceful shutdown...");
        if let Err(e) = self.shutdown_tx.send(true) {
            error!("Failed to send shutdown signal: {}", e);
        }

        if let Some(recorder) = self.recorder.take() {
            match tokio::time::timeout(TASK_DRAIN_TIMEOUT, recorder).await {
                Ok(Ok(exit)) => info!(?exit, "[fpd] Activation recorder stopped"),
                Ok(Err(e)) => error!("[fpd] Activation recorder task failed: {}", e),
                Err(_) => warn!("[fpd] Activation recorder did not stop in time"),
            }
        }

        if let Some(server) = self.api_server.take() {
            match tokio::time::timeout(TASK_DRAIN_TIMEOUT, server).await {
                Ok(Ok(Ok(()))) => info!("[fpd] Finality SDK server stopped"),
                Ok(Ok(Err(e))) => error!("[fpd] Finality SDK server failed: {}", e),
                Ok(Err(e)) => error!("[fpd] Finality SDK task failed: {}", e),
                Err(_) => warn!("[fpd] Finality SDK server did not stop in time"),
            }
        }

        self.controller
            .close()
            .await
            .context("failed to close consumer controller")?;
        info!("Shutdown complete");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fp_02_block_store::StoreBackend;

    fn config(chain_type: &str) -> FpdConfig {
        let mut config = FpdConfig {
            db_backend: StoreBackend::Memory,
            api_port: 0,
            ..Default::default()
        };
        config.controller.chain_type = chain_type.into();
        config.controller.babylon.account_address = "bbn1fp".into();
        config
    }

    fn with_gadget(mut config: FpdConfig) -> FpdConfig {
        config.finality_gadget.fg_contract_address = "bbn1gadget".into();
        config.finality_gadget.bbn_chain_id = "bbn-test".into();
        config.finality_gadget.poll_interval_secs = 3600;
        config
    }

    #[tokio::test]
    async fn test_babylon_without_gadget() {
        let mut app = FpdApp::new(config("babylon")).unwrap();
        app.start().await.unwrap();
        assert!(app.recorder.is_none());
        assert!(app.api_server.is_none());
        app.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_generic_requires_gadget() {
        let mut cfg = config("generic");
        cfg.controller.generic.namespace = "gen-test".into();
        cfg.controller.generic.finality_gadget_address = "bbn1gadget".into();

        let err = FpdApp::new(cfg.clone()).err().unwrap();
        assert!(format!("{err:#}").contains("failed to create generic consumer controller"));

        assert!(FpdApp::new(with_gadget(cfg)).is_ok());
    }

    #[tokio::test]
    async fn test_wasm_starts_sdk_and_recorder() {
        let mut cfg = with_gadget(config("wasm"));
        cfg.controller.cosmwasm.finality_contract_address = "bbn1finality".into();
        cfg.finality_sdk.agent_url = "http://127.0.0.1:1".into();

        let mut app = FpdApp::new(cfg).unwrap();
        app.start().await.unwrap();
        assert!(app.recorder.is_some());
        assert!(app.api_server.is_some());
        app.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_wasm_without_gadget_fails_to_start() {
        let mut cfg = config("wasm");
        cfg.controller.cosmwasm.finality_contract_address = "bbn1finality".into();

        let mut app = FpdApp::new(cfg).unwrap();
        assert!(app.start().await.is_err());
    }
}
