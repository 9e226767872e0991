//! # Consumer Controller Factory
//!
//! Builds exactly one backend from the configured `chain_type`:
//!
//! | Tag | Backend | Needs |
//! |-----|---------|-------|
//! | `babylon` | [`BabylonConsumerController`] | `[babylon]` |
//! | `OPStackL2` | contract + REST indexer | `[babylon]`, `[opstackl2]`, gadget |
//! | `generic` | contract + REST indexer | `[babylon]`, `[generic]`, gadget |
//! | `wasm` | contract + local store | `[babylon]`, `[cosmwasm]`, store |

use std::sync::Arc;

use fp_01_chain_clients::{BabylonLcdClient, HttpBroadcaster, IndexerClient, RetryingSender};
use fp_02_block_store::FinalityDb;
use fp_03_finality_gadget::FinalityGadgetApi;
use shared_types::ConfigError;
use tracing::info;

use crate::adapters::{BabylonConsumerController, ContractConsumerController};
use crate::block_source::{IndexerBlockSource, StoreBlockSource};
use crate::config::{ChainType, ControllerConfig, IndexerChainConfig};
use crate::controller::ConsumerController;
use crate::error::{ControllerError, ControllerResult};

/// Collaborators owned by the daemon and shared with the controller.
#[derive(Clone, Default)]
pub struct ControllerDeps {
    /// Required by the REST-indexed backends for the activation height.
    pub gadget: Option<Arc<dyn FinalityGadgetApi>>,
    /// Required by the store-backed backend.
    pub db: Option<Arc<FinalityDb>>,
}

type Sender = RetryingSender<HttpBroadcaster>;

fn settlement_clients(config: &ControllerConfig) -> ControllerResult<(Arc<BabylonLcdClient>, Arc<Sender>)> {
    config.babylon.validate()?;
    config.sender.validate()?;

    let lcd = Arc::new(BabylonLcdClient::new(&config.babylon)?);
    let broadcaster = HttpBroadcaster::new(
        &config.babylon.signer_address,
        config.babylon.chain_id.clone(),
        config.babylon.key.clone(),
        config.babylon.timeout(),
    )?;
    let sender = Arc::new(RetryingSender::new(
        broadcaster,
        config.babylon.account_address.clone(),
        config.sender.clone(),
    ));
    Ok((lcd, sender))
}

fn indexer_controller(
    config: &ControllerConfig,
    section: &'static str,
    chain: &IndexerChainConfig,
    deps: &ControllerDeps,
) -> ControllerResult<Box<dyn ConsumerController>> {
    chain.validate(section)?;
    let gadget = deps.gadget.clone().ok_or(ConfigError::MissingField {
        section: "finality_gadget",
        field: "fg_contract_address",
    })?;

    let (lcd, sender) = settlement_clients(config)?;
    let indexer = IndexerClient::new(&chain.service_rpc, chain.namespace.clone(), chain.timeout())?;

    Ok(Box::new(ContractConsumerController::new(
        IndexerBlockSource::new(indexer, gadget),
        lcd.clone(),
        lcd,
        sender,
        chain.finality_gadget_address.clone(),
    )))
}

fn store_controller(config: &ControllerConfig, deps: &ControllerDeps) -> ControllerResult<Box<dyn ConsumerController>> {
    config.cosmwasm.validate()?;
    let db = deps.db.clone().ok_or(ConfigError::MissingField {
        section: "fpd",
        field: "db_path",
    })?;

    let (lcd, sender) = settlement_clients(config)?;
    Ok(Box::new(ContractConsumerController::new(
        StoreBlockSource::new(db),
        lcd.clone(),
        lcd,
        sender,
        config.cosmwasm.finality_contract_address.clone(),
    )))
}

/// Constructs the controller for `config.chain_type`.
///
/// Unknown tags fail with [`ControllerError::UnsupportedConsumerChain`];
/// backend construction failures come back wrapped in
/// [`ControllerError::Construction`].
pub fn new_consumer_controller(
    config: &ControllerConfig,
    deps: &ControllerDeps,
) -> ControllerResult<Box<dyn ConsumerController>> {
    let chain_type = config
        .chain_type()
        .map_err(|_| ControllerError::UnsupportedConsumerChain(config.chain_type.clone()))?;

    let controller = match chain_type {
        ChainType::Babylon => settlement_clients(config)
            .map(|(lcd, sender)| Box::new(BabylonConsumerController::new(lcd, sender)) as Box<dyn ConsumerController>)
            .map_err(ControllerError::construction("Babylon"))?,
        ChainType::OpStackL2 => indexer_controller(config, "opstackl2", &config.opstackl2, deps)
            .map_err(ControllerError::construction("OPStack L2"))?,
        ChainType::Generic => indexer_controller(config, "generic", &config.generic, deps)
            .map_err(ControllerError::construction("generic"))?,
        ChainType::Wasm => store_controller(config, deps).map_err(ControllerError::construction("Wasm"))?,
    };

    info!(chain_type = %chain_type, "[fp-04] Consumer controller ready");
    Ok(controller)
}
