use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::info;

use super::memory::{apply, scan};
use crate::error::KvError;
use crate::ports::{BatchOperation, KeyValueStore, ScanResult};

/// File-backed key-value store.
///
/// Keeps the whole map in memory and rewrites a bincode snapshot on every
/// mutation through a temp file and rename, so a crash leaves either the old
/// or the new snapshot on disk. Every write costs time proportional to the
/// whole map, so a store that grows by one block per consumer block belongs
/// on RocksDB.
pub struct FileBackedKVStore {
    data: BTreeMap<Vec<u8>, Vec<u8>>,
    path: PathBuf,
}

impl FileBackedKVStore {
    /// Open the store at `path`, creating it on first write.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, KvError> {
        let path = path.as_ref().to_path_buf();

        let data = match std::fs::read(&path) {
            Ok(bytes) => {
                let data: BTreeMap<Vec<u8>, Vec<u8>> = bincode::deserialize(&bytes)
                    .map_err(|e| KvError::Corruption(format!("{}: {}", path.display(), e)))?;
                info!(
                    "[fp-02] Loaded {} keys from {} ({} bytes)",
                    data.len(),
                    path.display(),
                    bytes.len()
                );
                data
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("[fp-02] No existing storage file at {}", path.display());
                BTreeMap::new()
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self { data, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, data: &BTreeMap<Vec<u8>, Vec<u8>>) -> Result<(), KvError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let bytes = bincode::serialize(data).map_err(|e| KvError::Io(e.to_string()))?;

        let temp_path = self.path.with_extension("tmp");
        let mut file = std::fs::File::create(&temp_path)?;
        file.write_all(&bytes)?;
        file.sync_all()?;
        std::fs::rename(&temp_path, &self.path)?;
        Ok(())
    }

    /// Applies `operations` to a copy, persists it, then swaps it in. A failed
    /// write leaves memory and disk unchanged.
    fn commit(&mut self, operations: Vec<BatchOperation>) -> Result<(), KvError> {
        let mut next = self.data.clone();
        apply(&mut next, operations);
        self.persist(&next)?;
        self.data = next;
        Ok(())
    }
}

impl KeyValueStore for FileBackedKVStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, KvError> {
        Ok(self.data.get(key).cloned())
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), KvError> {
        self.commit(vec![BatchOperation::put(key, value)])
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), KvError> {
        self.commit(vec![BatchOperation::delete(key)])
    }

    fn atomic_batch_write(&mut self, operations: Vec<BatchOperation>) -> Result<(), KvError> {
        self.commit(operations)
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<ScanResult, KvError> {
        Ok(scan(&self.data, prefix))
    }
}
