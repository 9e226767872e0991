//! # Chain Clients
//!
//! Network adapters behind the ports in `shared_types::ports`.
//!
//! | Adapter | Port / role |
//! |---------|-------------|
//! | [`BabylonLcdClient`] | `BabylonQueryClient`, `WasmQueryClient` over the settlement chain's REST gateway |
//! | [`BitcoinRpcClient`] | `BitcoinClient` over bitcoind JSON-RPC |
//! | [`IndexerClient`] | consumer block indexer (`/v1/api/...` with `{data, error}` envelope) |
//! | [`VerifierClient`] | block verification endpoint used before committing blocks |
//! | [`RetryingSender`] | `ReliableSender` over any [`TxBroadcaster`] |
//! | [`HttpBroadcaster`] | `TxBroadcaster` posting to an external signer service |

pub mod babylon;
pub mod bitcoin;
pub mod broadcaster;
pub mod config;
mod http;
pub mod indexer;
pub mod sender;
pub mod verifier;

pub use babylon::BabylonLcdClient;
pub use bitcoin::BitcoinRpcClient;
pub use broadcaster::HttpBroadcaster;
pub use config::{BabylonClientConfig, BitcoinRpcConfig, SenderConfig};
pub use indexer::IndexerClient;
pub use sender::{BroadcastOutcome, RetryingSender, TxBroadcaster};
pub use verifier::VerifierClient;
