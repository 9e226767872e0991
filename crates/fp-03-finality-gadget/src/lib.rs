//! # fp-03-finality-gadget
//!
//! Decides whether a consumer-chain block reached BTC-stake-backed finality.
//!
//! ## Overview
//!
//! - **Quorum**: a block is final when providers holding ≥ 2/3 of the voting
//!   power at the block's BTC height voted for its `(height, hash)`.
//! - **Pass-through**: a disabled gadget contract finalizes everything.
//! - **Activation**: the moment BTC staking became active for the consumer is
//!   computed from chain state and recorded once by a background task.
//!
//! ## Architecture
//!
//! ```text
//! Consumer controller / SDK ──FinalityGadgetApi──→ FinalityGadget
//!                                                     │
//!          ┌──────────────────┬───────────────────────┼──────────────────────┐
//!          ↓                  ↓                       ↓                      ↓
//!   GadgetContract   BabylonQueryClient        BitcoinClient    ActivationTimestampStore
//!   (is_enabled,     (FP keys, delegations,    (time ↔ height)   (set once)
//!    voters)          power)
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use fp_03_finality_gadget::{CwGadgetContract, FinalityGadget, FinalityGadgetApi};
//!
//! let gadget = Arc::new(FinalityGadget::new(
//!     CwGadgetContract::new(lcd.clone(), &config.fg_contract_address),
//!     lcd,
//!     bitcoin,
//!     db,
//!     config.poll_interval(),
//! ));
//!
//! tokio::spawn({
//!     let gadget = gadget.clone();
//!     async move { gadget.run_activation_recorder(shutdown_rx).await }
//! });
//!
//! let finalized = gadget.query_is_block_babylon_finalized(&block).await?;
//! ```

pub mod adapters;
pub mod config;
pub mod domain;
pub mod error;
pub mod metrics;
pub mod ports;
pub mod service;

pub use adapters::CwGadgetContract;
pub use config::FinalityGadgetConfig;
pub use domain::{has_quorum, tally_voted_power, PowerTable};
pub use error::{GadgetError, GadgetResult};
pub use ports::{FinalityGadgetApi, GadgetContract};
pub use service::{FinalityGadget, RecorderExit};
