//! One file per document, named by its key, holding the raw bytes.

use super::{ensure_storable_key, is_storable_key, StorageBackend, StorageKind};
use crate::error::StorageError;
use crate::models::document::Document;
use chrono::{DateTime, Utc};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

const STAGING_PREFIX: &str = ".staging-";

/// Filesystem backend rooted at a single directory.
#[derive(Debug)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    /// Open (and create if needed) the storage directory.
    ///
    /// Leftover staging files from an interrupted write are removed.
    ///
    /// # Errors
    /// Returns an error when the directory cannot be created or listed.
    pub fn open(root: &Path) -> Result<Self, StorageError> {
        fs::create_dir_all(root)?;
        let storage = Self {
            root: root.to_path_buf(),
        };
        let removed = storage.remove_stale_staging_files()?;
        if removed > 0 {
            tracing::warn!(
                "Removed {} interrupted write(s) from {}",
                removed,
                root.display()
            );
        }
        Ok(storage)
    }

    /// Directory holding the documents.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }

    fn remove_stale_staging_files(&self) -> Result<usize, StorageError> {
        let mut removed = 0;
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let is_staging = entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.starts_with(STAGING_PREFIX));
            if is_staging && entry.file_type()?.is_file() {
                fs::remove_file(entry.path())?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}

impl StorageBackend for FileStorage {
    fn put(&self, key: &str, content: &[u8]) -> Result<(), StorageError> {
        ensure_storable_key(key)?;
        let target = self.path_for(key);
        if target.try_exists()? {
            return Err(StorageError::AlreadyExists(key.to_string()));
        }

        // Stage the full content next to the target, then link it into place
        // without replacing anything that appeared in the meantime.
        let mut staged = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempfile_in(&self.root)?;
        staged.write_all(content)?;
        staged.as_file().sync_all()?;

        match staged.persist_noclobber(&target) {
            Ok(_) => Ok(()),
            Err(err) if err.error.kind() == io::ErrorKind::AlreadyExists => {
                Err(StorageError::AlreadyExists(key.to_string()))
            }
            Err(err) => Err(StorageError::Io(err.error)),
        }
    }

    fn get(&self, key: &str) -> Result<Document, StorageError> {
        if !is_storable_key(key) {
            return Err(StorageError::NotFound(key.to_string()));
        }
        let mut file = match fs::File::open(self.path_for(key)) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound(key.to_string()));
            }
            Err(err) => return Err(err.into()),
        };

        let metadata = file.metadata()?;
        let mut content = Vec::with_capacity(metadata.len() as usize);
        file.read_to_end(&mut content)?;
        let created_at: DateTime<Utc> = metadata
            .modified()
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());

        Ok(Document {
            key: key.to_string(),
            content,
            created_at,
        })
    }

    fn exists(&self, key: &str) -> Result<bool, StorageError> {
        if !is_storable_key(key) {
            return Ok(false);
        }
        Ok(self.path_for(key).try_exists()?)
    }

    fn kind(&self) -> StorageKind {
        StorageKind::File
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::contract;
    use tempfile::TempDir;

    fn setup() -> (FileStorage, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::open(&temp_dir.path().join("data")).unwrap();
        (storage, temp_dir)
    }

    #[test]
    fn satisfies_backend_contract() {
        let (storage, _temp) = setup();
        contract::run_all(&storage);
    }

    #[test]
    fn stores_raw_bytes_in_file_named_by_key() {
        let (storage, _temp) = setup();
        storage.put("rawfile", b"exact bytes\n").unwrap();
        let on_disk = fs::read(storage.root().join("rawfile")).unwrap();
        assert_eq!(on_disk, b"exact bytes\n");
    }

    #[test]
    fn failed_put_leaves_no_staging_files() {
        let (storage, _temp) = setup();
        storage.put("taken", b"first").unwrap();
        assert!(matches!(
            storage.put("taken", b"second"),
            Err(StorageError::AlreadyExists(_))
        ));
        let names: Vec<String> = fs::read_dir(storage.root())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["taken".to_string()]);
    }

    #[test]
    fn staging_files_are_invisible_and_cleaned_on_open() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("data");
        fs::create_dir_all(&root).unwrap();
        let leftover = format!("{}abc123", STAGING_PREFIX);
        fs::write(root.join(&leftover), b"half").unwrap();

        let storage = FileStorage::open(&root).unwrap();
        assert!(!root.join(&leftover).exists());
        assert!(!storage.exists(&leftover).unwrap());
    }

    #[test]
    fn documents_survive_reopen() {
        let (storage, temp) = setup();
        storage.put("persisted", b"still here").unwrap();
        drop(storage);

        let reopened = FileStorage::open(&temp.path().join("data")).unwrap();
        assert_eq!(reopened.get("persisted").unwrap().content, b"still here");
    }
}
