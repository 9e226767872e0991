//! # fp-05-finality-sdk
//!
//! Lets a consumer chain push its blocks to the finality provider and ask
//! for BTC-stake-backed finality verdicts.
//!
//! ```text
//! consumer ──POST /v1/api/commit──→ verifier agent ──ok──→ FinalityDb
//!                                                            │
//! consumer ──GET /api/v1/block/:h──→ FinalityDb ──block──→ FinalityGadgetApi
//! ```
//!
//! The store it writes is the block source of the `wasm` consumer
//! controller.

pub mod config;
pub mod error;
pub mod http;
pub mod ports;
pub mod service;

pub use config::SdkConfig;
pub use error::{SdkError, SdkResult};
pub use http::{router, serve, CommitRequest};
pub use ports::{BlockVerifier, FinalitySdkApi};
pub use service::FinalitySdk;
