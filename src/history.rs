//! Recent-search history.
//!
//! An ordered, duplicate-free, capacity-bounded list of queries, most recent
//! first. The in-memory list is authoritative for the session and is written
//! through to a [`KeyValueStore`] on every mutation. Storage failures are
//! logged and otherwise ignored: history is best-effort state.

use std::sync::{Mutex, MutexGuard};

use log::{info, warn};

use crate::config::HistoryConfig;
use crate::local_store::KeyValueStore;

pub struct HistoryStore<S: KeyValueStore> {
    store: S,
    key: String,
    capacity: usize,
    entries: Mutex<Vec<String>>,
}

impl<S: KeyValueStore> HistoryStore<S> {
    /// Binds the history to `store` and loads whatever is persisted.
    ///
    /// With `scope_by_user`, each signed-in user gets a separate history;
    /// `None` uses the device-wide key.
    pub fn open(store: S, config: &HistoryConfig, user_id: Option<&str>) -> Self {
        let history = Self {
            store,
            key: config.key_for(user_id),
            capacity: config.capacity,
            entries: Mutex::new(Vec::new()),
        };
        history.load();
        history
    }

    pub fn storage_key(&self) -> &str {
        &self.key
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current in-memory snapshot, no I/O.
    pub fn entries(&self) -> Vec<String> {
        self.lock().clone()
    }

    /// Re-reads the persisted history. Missing or corrupt data yields an
    /// empty history.
    pub fn load(&self) -> Vec<String> {
        let mut entries = self.lock();
        *entries = self.read_persisted();
        entries.clone()
    }

    /// Moves `query` (trimmed) to the front, evicting from the tail past
    /// capacity. Blank queries leave the history untouched.
    pub fn record(&self, query: &str) -> Vec<String> {
        let query = query.trim();
        let mut entries = self.lock();
        if query.is_empty() {
            return entries.clone();
        }

        entries.retain(|existing| existing != query);
        entries.insert(0, query.to_string());
        entries.truncate(self.capacity);

        self.persist(&entries);
        entries.clone()
    }

    /// Drops the exact string `query`.
    pub fn remove(&self, query: &str) -> Vec<String> {
        let mut entries = self.lock();
        entries.retain(|existing| existing != query);
        self.persist(&entries);
        entries.clone()
    }

    /// Empties the history and deletes the persisted copy.
    pub fn clear(&self) -> Vec<String> {
        let mut entries = self.lock();
        entries.clear();
        if let Err(e) = self.store.remove(&self.key) {
            warn!("Failed to delete persisted history '{}': {e}", self.key);
        }
        Vec::new()
    }

    pub fn into_store(self) -> S {
        self.store
    }

    fn lock(&self) -> MutexGuard<'_, Vec<String>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn read_persisted(&self) -> Vec<String> {
        let raw = match self.store.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!("Failed to read history '{}': {e}", self.key);
                return Vec::new();
            }
        };

        match serde_json::from_str::<Vec<String>>(&raw) {
            Ok(raw_entries) => {
                // Older or foreign writers may not have kept the invariants.
                let mut seen = std::collections::HashSet::new();
                let entries: Vec<String> = raw_entries
                    .into_iter()
                    .map(|q| q.trim().to_string())
                    .filter(|q| !q.is_empty() && seen.insert(q.clone()))
                    .take(self.capacity)
                    .collect();
                info!("Loaded {} history entries from '{}'", entries.len(), self.key);
                entries
            }
            Err(e) => {
                warn!("Discarding unreadable history '{}': {e}", self.key);
                Vec::new()
            }
        }
    }

    fn persist(&self, entries: &[String]) {
        let json = match serde_json::to_string(entries) {
            Ok(json) => json,
            Err(e) => {
                warn!("Failed to serialize history: {e}");
                return;
            }
        };
        if let Err(e) = self.store.put(&self.key, &json) {
            warn!("Failed to persist history '{}': {e}", self.key);
        }
    }
}
