//! Pluggable document storage.
//!
//! Every backend offers the same three operations and the same guarantee:
//! `put` never overwrites an existing key, and a reader never observes a
//! partially written document.

#[cfg(test)]
mod contract;
/// Embedded redb backend.
pub mod embedded;
/// One-file-per-document backend.
pub mod file;
/// Process-local backend.
pub mod memory;

use crate::error::StorageError;
use crate::models::document::Document;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

pub use embedded::EmbeddedStorage;
pub use file::FileStorage;
pub use memory::MemoryStorage;

/// Durable key to content mapping.
pub trait StorageBackend: Send + Sync {
    /// Store `content` under `key` unless the key is already taken.
    ///
    /// # Errors
    /// [`StorageError::AlreadyExists`] when the key is taken,
    /// [`StorageError::InvalidKey`] when the key is not storable, or an I/O
    /// level error.
    fn put(&self, key: &str, content: &[u8]) -> Result<(), StorageError>;

    /// Fetch the document stored under `key`.
    ///
    /// # Errors
    /// [`StorageError::NotFound`] when nothing is stored under `key`.
    fn get(&self, key: &str) -> Result<Document, StorageError>;

    /// Whether a document is stored under `key`.
    fn exists(&self, key: &str) -> Result<bool, StorageError>;

    /// Short backend name for logs.
    fn kind(&self) -> StorageKind;
}

/// Backend selected by `storage.type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    #[default]
    File,
    Redb,
    Memory,
}

impl StorageKind {
    /// Configuration spelling of this backend.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Redb => "redb",
            Self::Memory => "memory",
        }
    }
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(Self::File),
            "redb" => Ok(Self::Redb),
            "memory" => Ok(Self::Memory),
            other => Err(format!("unknown storage type '{}'", other)),
        }
    }
}

/// Open the backend `kind` rooted at `path`.
///
/// # Errors
/// Returns an error when the root directory or database cannot be created.
pub fn open_backend(
    kind: StorageKind,
    path: &Path,
) -> Result<Arc<dyn StorageBackend>, StorageError> {
    let backend: Arc<dyn StorageBackend> = match kind {
        StorageKind::File => Arc::new(FileStorage::open(path)?),
        StorageKind::Redb => Arc::new(EmbeddedStorage::open(path)?),
        StorageKind::Memory => Arc::new(MemoryStorage::default()),
    };
    tracing::info!("Opened {} storage at {}", backend.kind(), path.display());
    Ok(backend)
}

/// Whether `key` can be stored by any backend.
///
/// Keys are limited to `[A-Za-z0-9_-]` so they are always a single, plain
/// file name.
pub fn is_storable_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

pub(crate) fn ensure_storable_key(key: &str) -> Result<(), StorageError> {
    if is_storable_key(key) {
        Ok(())
    } else {
        Err(StorageError::InvalidKey(key.to_string()))
    }
}
