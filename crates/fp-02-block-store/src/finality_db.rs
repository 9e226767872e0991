//! # Finality Database
//!
//! Blocks committed by the consumer chain plus the BTC staking activation
//! timestamp, stored over any [`KeyValueStore`].
//!
//! ## Key Layout
//!
//! | Key | Value |
//! |-----|-------|
//! | `blk/` + height (big-endian u64) | bincode [`Block`] |
//! | `hsh/` + normalized hash | height (big-endian u64) |
//! | `meta/latest_height` | height (big-endian u64) |
//! | `meta/activated_timestamp` | unix seconds (big-endian u64) |

use std::path::PathBuf;
use std::str::FromStr;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use shared_types::{ActivationTimestampStore, Block, StorageError};
use tracing::{debug, info};

use crate::adapters::{FileBackedKVStore, InMemoryKVStore};
use crate::error::KvError;
use crate::ports::{BatchOperation, KeyValueStore};

const BLOCK_PREFIX: &[u8] = b"blk/";
const HASH_PREFIX: &[u8] = b"hsh/";
const LATEST_HEIGHT_KEY: &[u8] = b"meta/latest_height";
const ACTIVATED_TIMESTAMP_KEY: &[u8] = b"meta/activated_timestamp";

/// File name of the file-backed store inside the data directory.
pub const DB_FILE_NAME: &str = "finality.db";

/// Which backend holds the finality database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    /// Single bincode snapshot, rewritten in full on every write.
    File,
    Rocksdb,
}

impl StoreBackend {
    /// Whether each write costs time proportional to the whole database.
    pub fn rewrites_on_write(&self) -> bool {
        matches!(self, StoreBackend::File)
    }
}

impl Default for StoreBackend {
    /// RocksDB when compiled in, else the snapshot file.
    fn default() -> Self {
        if cfg!(feature = "rocksdb") {
            StoreBackend::Rocksdb
        } else {
            StoreBackend::File
        }
    }
}

impl FromStr for StoreBackend {
    type Err = KvError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(StoreBackend::Memory),
            "file" => Ok(StoreBackend::File),
            "rocksdb" => Ok(StoreBackend::Rocksdb),
            other => Err(KvError::BackendUnavailable(other.to_string())),
        }
    }
}

/// Where and how to open the finality database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// Data directory.
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            path: PathBuf::from("./data"),
        }
    }
}

/// Durable store for consumer blocks and the activation timestamp.
pub struct FinalityDb {
    store: RwLock<Box<dyn KeyValueStore>>,
    #[cfg(feature = "locking")]
    _lock: Option<crate::adapters::DatabaseLock>,
}

fn height_key(prefix: &[u8], height: u64) -> Vec<u8> {
    let mut key = prefix.to_vec();
    key.extend_from_slice(&height.to_be_bytes());
    key
}

fn hash_key(hash: &str) -> Vec<u8> {
    let normalized = shared_types::strip_hex_prefix(hash).to_lowercase();
    let mut key = HASH_PREFIX.to_vec();
    key.extend_from_slice(normalized.as_bytes());
    key
}

fn decode_u64(bytes: &[u8]) -> Result<u64, StorageError> {
    let raw: [u8; 8] = bytes
        .try_into()
        .map_err(|_| StorageError::DataCorruption(format!("expected 8 bytes, got {}", bytes.len())))?;
    Ok(u64::from_be_bytes(raw))
}

fn decode_block(bytes: &[u8]) -> Result<Block, StorageError> {
    bincode::deserialize(bytes).map_err(|e| StorageError::DataCorruption(e.to_string()))
}

impl FinalityDb {
    /// Opens the configured backend, taking the data directory lock for
    /// on-disk backends.
    pub fn open(config: &StoreConfig) -> Result<Self, StorageError> {
        if config.backend == StoreBackend::Memory {
            return Ok(Self::in_memory());
        }

        #[cfg(feature = "locking")]
        let lock = crate::adapters::DatabaseLock::acquire(
            &config.path,
            crate::adapters::lock::DEFAULT_LOCK_TIMEOUT,
        )
        .map_err(|e| StorageError::Locked(e.to_string()))?;

        let store: Box<dyn KeyValueStore> = match config.backend {
            StoreBackend::Memory => Box::new(InMemoryKVStore::new()),
            StoreBackend::File => Box::new(FileBackedKVStore::open(config.path.join(DB_FILE_NAME))?),
            #[cfg(feature = "rocksdb")]
            StoreBackend::Rocksdb => Box::new(crate::adapters::RocksDbStore::open(&config.path)?),
            #[cfg(not(feature = "rocksdb"))]
            StoreBackend::Rocksdb => {
                return Err(KvError::BackendUnavailable("rocksdb".into()).into());
            }
        };

        info!(
            "[fp-02] Opened {:?} finality database at {}",
            config.backend,
            config.path.display()
        );

        Ok(Self {
            store: RwLock::new(store),
            #[cfg(feature = "locking")]
            _lock: Some(lock),
        })
    }

    pub fn in_memory() -> Self {
        Self::with_store(Box::new(InMemoryKVStore::new()))
    }

    pub fn with_store(store: Box<dyn KeyValueStore>) -> Self {
        Self {
            store: RwLock::new(store),
            #[cfg(feature = "locking")]
            _lock: None,
        }
    }

    /// Stores a block and advances the latest height if it is higher.
    ///
    /// Re-inserting a height replaces the previous block and its hash entry.
    pub fn insert_block(&self, block: &Block) -> Result<(), StorageError> {
        let encoded = bincode::serialize(block).map_err(|e| StorageError::DatabaseError(e.to_string()))?;

        let mut store = self.store.write();
        let mut ops = Vec::with_capacity(4);

        let block_key = height_key(BLOCK_PREFIX, block.height);
        if let Some(previous) = store.get(&block_key).map_err(StorageError::from)? {
            let previous = decode_block(&previous)?;
            if hash_key(&previous.hash) != hash_key(&block.hash) {
                ops.push(BatchOperation::delete(hash_key(&previous.hash)));
            }
        }

        ops.push(BatchOperation::put(block_key, encoded));
        ops.push(BatchOperation::put(
            hash_key(&block.hash),
            block.height.to_be_bytes().to_vec(),
        ));

        let latest = match store.get(LATEST_HEIGHT_KEY).map_err(StorageError::from)? {
            Some(bytes) => Some(decode_u64(&bytes)?),
            None => None,
        };
        if latest.map_or(true, |h| block.height > h) {
            ops.push(BatchOperation::put(
                LATEST_HEIGHT_KEY.to_vec(),
                block.height.to_be_bytes().to_vec(),
            ));
        }

        store.atomic_batch_write(ops)?;
        debug!(height = block.height, block_hash = %block.hash, "[fp-02] Block stored");
        Ok(())
    }

    pub fn get_block_by_height(&self, height: u64) -> Result<Block, StorageError> {
        let store = self.store.read();
        match store.get(&height_key(BLOCK_PREFIX, height))? {
            Some(bytes) => decode_block(&bytes),
            None => Err(StorageError::NotFound(format!("block at height {height}"))),
        }
    }

    /// Looks a block up by hash, with or without `0x` prefix.
    pub fn get_block_by_hash(&self, hash: &str) -> Result<Block, StorageError> {
        let height = {
            let store = self.store.read();
            match store.get(&hash_key(hash))? {
                Some(bytes) => decode_u64(&bytes)?,
                None => return Err(StorageError::NotFound(format!("block with hash {hash}"))),
            }
        };
        self.get_block_by_height(height)
    }

    /// Highest stored block, `None` when empty.
    pub fn latest_block(&self) -> Result<Option<Block>, StorageError> {
        let height = {
            let store = self.store.read();
            match store.get(LATEST_HEIGHT_KEY)? {
                Some(bytes) => decode_u64(&bytes)?,
                None => return Ok(None),
            }
        };
        self.get_block_by_height(height).map(Some)
    }

    /// Stored blocks with heights in `[start, end]`, ascending.
    pub fn blocks_in_range(&self, start: u64, end: u64) -> Result<Vec<Block>, StorageError> {
        if start > end {
            return Ok(Vec::new());
        }
        let store = self.store.read();
        store
            .prefix_scan(BLOCK_PREFIX)?
            .into_iter()
            .filter(|(k, _)| {
                decode_u64(&k[BLOCK_PREFIX.len()..]).is_ok_and(|h| h >= start && h <= end)
            })
            .map(|(_, v)| decode_block(&v))
            .collect()
    }
}

impl ActivationTimestampStore for FinalityDb {
    fn get_activated_timestamp(&self) -> Result<Option<u64>, StorageError> {
        let store = self.store.read();
        match store.get(ACTIVATED_TIMESTAMP_KEY)? {
            Some(bytes) => decode_u64(&bytes).map(Some),
            None => Ok(None),
        }
    }

    fn save_activated_timestamp(&self, timestamp: u64) -> Result<bool, StorageError> {
        // Check and write under one write guard so a concurrent reader sees
        // either nothing or the final value.
        let mut store = self.store.write();
        if store.exists(ACTIVATED_TIMESTAMP_KEY)? {
            return Ok(false);
        }
        store.put(ACTIVATED_TIMESTAMP_KEY, &timestamp.to_be_bytes())?;
        info!(timestamp, "[fp-02] BTC staking activation timestamp saved");
        Ok(true)
    }
}
