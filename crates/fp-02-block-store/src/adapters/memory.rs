//! In-memory backend for tests and ephemeral runs.

use std::collections::BTreeMap;

use crate::error::KvError;
use crate::ports::{BatchOperation, KeyValueStore, ScanResult};

/// Ordered in-memory key-value store.
#[derive(Debug, Default)]
pub struct InMemoryKVStore {
    data: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl InMemoryKVStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

pub(crate) fn apply(data: &mut BTreeMap<Vec<u8>, Vec<u8>>, operations: Vec<BatchOperation>) {
    for op in operations {
        match op {
            BatchOperation::Put { key, value } => {
                data.insert(key, value);
            }
            BatchOperation::Delete { key } => {
                data.remove(&key);
            }
        }
    }
}

pub(crate) fn scan(data: &BTreeMap<Vec<u8>, Vec<u8>>, prefix: &[u8]) -> ScanResult {
    data.range(prefix.to_vec()..)
        .take_while(|(k, _)| k.starts_with(prefix))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

impl KeyValueStore for InMemoryKVStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, KvError> {
        Ok(self.data.get(key).cloned())
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), KvError> {
        self.data.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), KvError> {
        self.data.remove(key);
        Ok(())
    }

    fn atomic_batch_write(&mut self, operations: Vec<BatchOperation>) -> Result<(), KvError> {
        apply(&mut self.data, operations);
        Ok(())
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<ScanResult, KvError> {
        Ok(scan(&self.data, prefix))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_scan_is_ordered_and_bounded() {
        let mut store = InMemoryKVStore::new();
        store.put(b"b/2", b"two").unwrap();
        store.put(b"b/1", b"one").unwrap();
        store.put(b"c/1", b"other").unwrap();
        store.put(b"a/9", b"before").unwrap();

        let found = store.prefix_scan(b"b/").unwrap();
        assert_eq!(
            found,
            vec![
                (b"b/1".to_vec(), b"one".to_vec()),
                (b"b/2".to_vec(), b"two".to_vec())
            ]
        );
    }

    #[test]
    fn test_batch_write() {
        let mut store = InMemoryKVStore::new();
        store.put(b"gone", b"x").unwrap();
        store
            .atomic_batch_write(vec![
                BatchOperation::put(b"k1".to_vec(), b"v1".to_vec()),
                BatchOperation::delete(b"gone".to_vec()),
            ])
            .unwrap();

        assert!(store.exists(b"k1").unwrap());
        assert!(!store.exists(b"gone").unwrap());
        assert_eq!(store.len(), 1);
    }
}
