//! Documents stored in a single redb database file.

use super::{ensure_storable_key, StorageBackend, StorageKind};
use crate::error::StorageError;
use crate::models::document::Document;
use chrono::{DateTime, Utc};
use redb::{ReadableDatabase, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// File name for the redb database within the storage directory.
pub const REDB_FILE_NAME: &str = "documents.redb";

/// Document rows (`StoredDocument`, bincode-encoded).
const DOCUMENTS: TableDefinition<&str, &[u8]> = TableDefinition::new("documents");

#[derive(Debug, Serialize, Deserialize)]
struct StoredDocument {
    content: Vec<u8>,
    created_at: DateTime<Utc>,
}

/// redb-backed storage.
pub struct EmbeddedStorage {
    db: redb::Database,
}

impl EmbeddedStorage {
    /// Open or create `documents.redb` inside `root`.
    ///
    /// # Errors
    /// Returns an error when the directory, database or table cannot be
    /// created.
    pub fn open(root: &Path) -> Result<Self, StorageError> {
        fs::create_dir_all(root)?;
        let db = redb::Database::create(root.join(REDB_FILE_NAME))?;
        let write_txn = db.begin_write()?;
        write_txn.open_table(DOCUMENTS)?;
        write_txn.commit()?;
        Ok(Self { db })
    }
}

impl StorageBackend for EmbeddedStorage {
    fn put(&self, key: &str, content: &[u8]) -> Result<(), StorageError> {
        ensure_storable_key(key)?;
        let encoded = bincode::serialize(&StoredDocument {
            content: content.to_vec(),
            created_at: Utc::now(),
        })?;

        // Write transactions are serialized, so check-then-insert is atomic.
        let write_txn = self.db.begin_write()?;
        {
            let mut documents = write_txn.open_table(DOCUMENTS)?;
            if documents.get(key)?.is_some() {
                return Err(StorageError::AlreadyExists(key.to_string()));
            }
            documents.insert(key, encoded.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Document, StorageError> {
        let read_txn = self.db.begin_read()?;
        let documents = read_txn.open_table(DOCUMENTS)?;
        let Some(value) = documents.get(key)? else {
            return Err(StorageError::NotFound(key.to_string()));
        };
        let stored: StoredDocument = bincode::deserialize(value.value())?;
        Ok(Document {
            key: key.to_string(),
            content: stored.content,
            created_at: stored.created_at,
        })
    }

    fn exists(&self, key: &str) -> Result<bool, StorageError> {
        let read_txn = self.db.begin_read()?;
        let documents = read_txn.open_table(DOCUMENTS)?;
        Ok(documents.get(key)?.is_some())
    }

    fn kind(&self) -> StorageKind {
        StorageKind::Redb
    }
}
