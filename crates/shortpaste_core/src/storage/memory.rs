//! Process-local storage; contents are lost on restart.

use super::{ensure_storable_key, StorageBackend, StorageKind};
use crate::error::StorageError;
use crate::models::document::Document;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// In-memory storage.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    documents: RwLock<HashMap<String, Document>>,
}

impl MemoryStorage {
    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<String, Document>>, StorageError> {
        self.documents
            .read()
            .map_err(|_| StorageError::Message("memory storage lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, Document>>, StorageError> {
        self.documents
            .write()
            .map_err(|_| StorageError::Message("memory storage lock poisoned".to_string()))
    }

    /// Number of stored documents.
    pub fn len(&self) -> usize {
        self.read().map(|docs| docs.len()).unwrap_or(0)
    }

    /// Whether nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl StorageBackend for MemoryStorage {
    fn put(&self, key: &str, content: &[u8]) -> Result<(), StorageError> {
        ensure_storable_key(key)?;
        match self.write()?.entry(key.to_string()) {
            Entry::Occupied(_) => Err(StorageError::AlreadyExists(key.to_string())),
            Entry::Vacant(slot) => {
                slot.insert(Document::new(key, content.to_vec()));
                Ok(())
            }
        }
    }

    fn get(&self, key: &str) -> Result<Document, StorageError> {
        self.read()?
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    fn exists(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.read()?.contains_key(key))
    }

    fn kind(&self) -> StorageKind {
        StorageKind::Memory
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::contract;

    #[test]
    fn satisfies_backend_contract() {
        let storage = MemoryStorage::default();
        contract::run_all(&storage);
        assert!(!storage.is_empty());
    }
}
