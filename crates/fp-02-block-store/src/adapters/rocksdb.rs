//! # RocksDB Backend
//!
//! Enabled with the `rocksdb` feature. Uses the default column family with
//! snappy compression and synchronous writes.

use std::path::Path;

use rocksdb::{Direction, IteratorMode, Options, WriteBatch, WriteOptions, DB};

use crate::error::KvError;
use crate::ports::{BatchOperation, KeyValueStore, ScanResult};

/// RocksDB-backed key-value store.
pub struct RocksDbStore {
    db: DB,
    sync_writes: bool,
}

impl RocksDbStore {
    /// Open or create a database directory.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, KvError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.set_compression_type(rocksdb::DBCompressionType::Snappy);

        let mut block_opts = rocksdb::BlockBasedOptions::default();
        block_opts.set_bloom_filter(10.0, false);
        opts.set_block_based_table_factory(&block_opts);

        let db = DB::open(&opts, path.as_ref())
            .map_err(|e| KvError::Io(format!("Failed to open RocksDB: {}", e)))?;

        Ok(Self {
            db,
            sync_writes: true,
        })
    }

    fn write_opts(&self) -> WriteOptions {
        let mut write_opts = WriteOptions::default();
        write_opts.set_sync(self.sync_writes);
        write_opts
    }
}

impl KeyValueStore for RocksDbStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, KvError> {
        self.db
            .get(key)
            .map_err(|e| KvError::Io(format!("RocksDB get failed: {}", e)))
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), KvError> {
        self.db
            .put_opt(key, value, &self.write_opts())
            .map_err(|e| KvError::Io(format!("RocksDB put failed: {}", e)))
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), KvError> {
        self.db
            .delete_opt(key, &self.write_opts())
            .map_err(|e| KvError::Io(format!("RocksDB delete failed: {}", e)))
    }

    fn atomic_batch_write(&mut self, operations: Vec<BatchOperation>) -> Result<(), KvError> {
        let mut batch = WriteBatch::default();
        for op in operations {
            match op {
                BatchOperation::Put { key, value } => batch.put(&key, &value),
                BatchOperation::Delete { key } => batch.delete(&key),
            }
        }

        self.db
            .write_opt(batch, &self.write_opts())
            .map_err(|e| KvError::Io(format!("RocksDB batch write failed: {}", e)))
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<ScanResult, KvError> {
        let mut results = Vec::new();
        for item in self.db.iterator(IteratorMode::From(prefix, Direction::Forward)) {
            let (key, value) =
                item.map_err(|e| KvError::Io(format!("RocksDB scan failed: {}", e)))?;
            if !key.starts_with(prefix) {
                break;
            }
            results.push((key.to_vec(), value.to_vec()));
        }
        Ok(results)
    }
}
