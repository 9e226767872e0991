//! # fp-04-consumer-controller
//!
//! Uniform finality-provider interface to a consumer chain: commit public
//! randomness, submit finality votes, and query blocks, voting power and
//! activation.
//!
//! ## Architecture
//!
//! ```text
//!                       ConsumerController
//!                              │
//!        ┌─────────────────────┴──────────────────────┐
//!        ↓                                            ↓
//! BabylonConsumerController              ContractConsumerController<B: BlockSource>
//!  (finality module msgs)                  (MsgExecuteContract on gadget contract)
//!                                                     │
//!                                     ┌───────────────┴───────────────┐
//!                                     ↓                               ↓
//!                           IndexerBlockSource                 StoreBlockSource
//!                        (OPStackL2, generic: REST         (wasm: local block store)
//!                         indexer + activation locator)
//! ```
//!
//! Shared pieces (proof decoding, message builders, batch cardinality, the
//! timestamp → height locator, delegation scans) live in [`domain`] and
//! `shared_types::staking` and are reused by every variant.

pub mod adapters;
pub mod block_source;
pub mod config;
pub mod controller;
pub mod domain;
pub mod error;
pub mod factory;

pub use adapters::{BabylonConsumerController, ContractConsumerController};
pub use block_source::{BlockIndexer, BlockSource, IndexerBlockSource, StoreBlockSource};
pub use config::{ChainType, ControllerConfig, CosmwasmConfig, IndexerChainConfig};
pub use controller::ConsumerController;
pub use domain::{block_height_by_timestamp, TimestampedBlocks};
pub use error::{ControllerError, ControllerResult};
pub use factory::{new_consumer_controller, ControllerDeps};
