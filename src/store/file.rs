//! File-backed store: one JSON file per composite key.
//!
//! Independent keys map to independent files, so concurrent access across
//! distinct keys needs no locking here.

use super::{RaceStore, StoreKey};
use crate::error::StoreError;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Opens (creating if needed) a store rooted at `dir`.
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(FileStore { dir })
    }

    fn path_for(&self, key: &StoreKey) -> PathBuf {
        self.dir.join(format!("{}.json", key.as_string()))
    }
}

impl RaceStore for FileStore {
    fn get(&self, key: &StoreKey) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn put(&self, key: &StoreKey, value: &str) -> Result<(), StoreError> {
        fs::write(self.path_for(key), value)?;
        Ok(())
    }

    fn delete(&self, key: &StoreKey) -> Result<(), StoreError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            // deleting an absent record is not an error
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn list_keys(&self) -> Result<Vec<String>, StoreError> {
        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            if let Some(name) = entry.file_name().to_str() {
                if let Some(key) = name.strip_suffix(".json") {
                    keys.push(key.to_string());
                }
            }
        }
        keys.sort();
        Ok(keys)
    }

    fn clear_all(&self) -> Result<(), StoreError> {
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                fs::remove_file(path)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_store() -> (TempDir, FileStore) {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path()).unwrap();
        (dir, store)
    }

    #[test]
    fn test_file_store_round_trip() {
        let (_dir, store) = temp_store();
        let key = StoreKey::stats("2024-12-01", 1, 1);

        assert!(store.get(&key).unwrap().is_none());
        store.put(&key, "{\"escape_last_year\":0.31}").unwrap();
        assert_eq!(
            store.get(&key).unwrap().as_deref(),
            Some("{\"escape_last_year\":0.31}")
        );

        store.delete(&key).unwrap();
        assert!(store.get(&key).unwrap().is_none());
    }

    #[test]
    fn test_file_store_delete_missing_is_ok() {
        let (_dir, store) = temp_store();
        let key = StoreKey::odds("2024-12-01", 2, 3);
        assert!(store.delete(&key).is_ok());
    }

    #[test]
    fn test_file_store_list_keys_sorted() {
        let (_dir, store) = temp_store();
        store.put(&StoreKey::stats("2024-12-02", 1, 1), "{}").unwrap();
        store.put(&StoreKey::stats("2024-12-01", 1, 1), "{}").unwrap();

        assert_eq!(
            store.list_keys().unwrap(),
            vec!["2024-12-01_01_01", "2024-12-02_01_01"]
        );
    }

    #[test]
    fn test_file_store_clear_all() {
        let (_dir, store) = temp_store();
        store.put(&StoreKey::stats("2024-12-01", 1, 1), "{}").unwrap();
        store.put(&StoreKey::odds("2024-12-01", 1, 1), "{}").unwrap();

        store.clear_all().unwrap();
        assert!(store.list_keys().unwrap().is_empty());
    }
}
