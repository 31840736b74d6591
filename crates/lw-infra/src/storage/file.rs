//! File-backed key/value storage
//!
//! Persists every item as one JSON object in a single file. Writes go to a
//! temporary sibling first and are renamed over the target.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use lw_core::ports::{KeyValueStoragePort, StorageError};

pub const DEFAULT_STORAGE_FILE: &str = "local_storage.json";

type Items = BTreeMap<String, String>;

pub struct FileKeyValueStorage {
    path: PathBuf,
    // Serializes read-modify-write cycles.
    write_lock: Mutex<()>,
}

impl FileKeyValueStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Storage file `local_storage.json` inside `base_dir`.
    pub fn with_defaults(base_dir: impl AsRef<Path>) -> Self {
        Self::new(base_dir.as_ref().join(DEFAULT_STORAGE_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_items(&self) -> Result<Items, StorageError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Items::new()),
            Err(err) => return Err(err.into()),
        };
        if content.trim().is_empty() {
            return Ok(Items::new());
        }
        Ok(serde_json::from_str(&content)?)
    }

    fn write_items(&self, items: &Items) -> Result<(), StorageError> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let json = serde_json::to_string_pretty(items)?;

        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, json)?;
        std::fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }

    fn update(&self, apply: impl FnOnce(&mut Items)) -> Result<(), StorageError> {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let mut items = self.read_items()?;
        apply(&mut items);
        self.write_items(&items)
    }
}

impl KeyValueStoragePort for FileKeyValueStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.read_items()?.remove(key))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.update(|items| {
            items.insert(key.to_string(), value.to_string());
        })
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.update(|items| {
            items.remove(key);
        })
    }
}
