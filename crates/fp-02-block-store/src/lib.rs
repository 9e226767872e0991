//! # Finality Block Store
//!
//! Durable storage for the finality-provider daemon:
//!
//! - the BTC staking activation timestamp, written at most once
//!   ([`shared_types::ActivationTimestampStore`]);
//! - consumer blocks committed through the finality SDK, which back the
//!   local-store consumer controller.
//!
//! ## Architecture
//!
//! ```text
//! FinalityDb ──► KeyValueStore (port)
//!                  ├── InMemoryKVStore
//!                  ├── FileBackedKVStore (default, bincode snapshot)
//!                  └── RocksDbStore (feature = "rocksdb")
//! ```
//!
//! On-disk backends hold an `fs2` lock on the data directory for the
//! lifetime of the [`FinalityDb`].

pub mod adapters;
pub mod error;
pub mod finality_db;
pub mod ports;

pub use error::KvError;
pub use finality_db::{FinalityDb, StoreBackend, StoreConfig, DB_FILE_NAME};
pub use ports::{BatchOperation, KeyValueStore};
