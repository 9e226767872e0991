//! Storage backends.

pub mod file;
#[cfg(feature = "locking")]
pub mod lock;
pub mod memory;
#[cfg(feature = "rocksdb")]
pub mod rocksdb;

pub use file::FileBackedKVStore;
#[cfg(feature = "locking")]
pub use lock::{DatabaseLock, LockError};
pub use memory::InMemoryKVStore;
#[cfg(feature = "rocksdb")]
pub use self::rocksdb::RocksDbStore;
