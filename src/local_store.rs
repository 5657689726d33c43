//! Device key-value storage.
//!
//! The history store only needs a tiny string-to-string map. [`LmdbStore`] is
//! the durable implementation used on device; [`MemoryStore`] keeps values in
//! process memory for tests and throwaway sessions.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use lmdb::{Database, DatabaseFlags, Environment, Transaction, WriteFlags};
use log::{debug, info, warn};

use crate::error::StorageError;

const DB_NAME: &str = "clearlabel_kv";
const MAP_SIZE: usize = 10 * 1024 * 1024;

/// Minimal persistent key-value contract.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn put(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Returns `false` when there was nothing stored under `key`.
    fn remove(&self, key: &str) -> Result<bool, StorageError>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Box<T> {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get(key)
    }

    fn put(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).put(key, value)
    }

    fn remove(&self, key: &str) -> Result<bool, StorageError> {
        (**self).remove(key)
    }
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Arc<T> {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get(key)
    }

    fn put(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).put(key, value)
    }

    fn remove(&self, key: &str) -> Result<bool, StorageError> {
        (**self).remove(key)
    }
}

/// LMDB-backed store living in `<name>.lmdb/`.
pub struct LmdbStore {
    env: Option<Environment>,
    db: Database,
    path: PathBuf,
}

impl LmdbStore {
    /// Opens (or creates) the environment at `<name>.lmdb`.
    ///
    /// A name that already ends in `.lmdb` is used as-is.
    pub fn open(name: impl AsRef<Path>) -> Result<Self, StorageError> {
        let name = name.as_ref();
        let path = if name.extension().is_some_and(|ext| ext == "lmdb") {
            name.to_path_buf()
        } else {
            let mut raw = name.as_os_str().to_owned();
            raw.push(".lmdb");
            PathBuf::from(raw)
        };

        if path.exists() {
            info!("Opening existing store at: {}", path.display());
        } else {
            info!("Creating new store at: {}", path.display());
            fs::create_dir_all(&path)?;
        }

        let env = Environment::new()
            .set_max_dbs(1)
            .set_map_size(MAP_SIZE)
            .open(&path)?;
        let db = env.create_db(Some(DB_NAME), DatabaseFlags::empty())?;

        Ok(Self { env: Some(env), db, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flushes and releases the environment. Safe to call twice.
    pub fn close(&mut self) -> Result<(), StorageError> {
        if let Some(env) = self.env.take() {
            if let Err(e) = env.sync(true) {
                warn!("Failed to sync store before close: {e}");
            }
            info!("Store at {} closed", self.path.display());
        }
        Ok(())
    }

    fn env(&self) -> Result<&Environment, StorageError> {
        self.env
            .as_ref()
            .ok_or_else(|| StorageError(format!("store at {} is closed", self.path.display())))
    }
}

impl KeyValueStore for LmdbStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let txn = self.env()?.begin_ro_txn()?;
        let value = match txn.get(self.db, &key) {
            Ok(bytes) => Some(bytes.to_vec()),
            Err(lmdb::Error::NotFound) => None,
            Err(e) => return Err(e.into()),
        };
        txn.abort();

        match value {
            Some(bytes) => String::from_utf8(bytes)
                .map(Some)
                .map_err(|e| StorageError(format!("invalid UTF-8 under key '{key}': {e}"))),
            None => Ok(None),
        }
    }

    fn put(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut txn = self.env()?.begin_rw_txn()?;
        txn.put(self.db, &key, &value, WriteFlags::empty())?;
        txn.commit()?;
        debug!("Stored {} bytes under '{key}'", value.len());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool, StorageError> {
        let mut txn = self.env()?.begin_rw_txn()?;
        match txn.del(self.db, &key, None) {
            Ok(()) => {
                txn.commit()?;
                Ok(true)
            }
            Err(lmdb::Error::NotFound) => {
                txn.abort();
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }
}

impl Drop for LmdbStore {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, StorageError> {
        self.values
            .lock()
            .map_err(|_| StorageError("memory store lock poisoned".to_string()))
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.lock()?.remove(key).is_some())
    }
}
