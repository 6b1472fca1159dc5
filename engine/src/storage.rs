//! Storage seam between the engine and whatever persists its collections.
//!
//! The engine never touches disk or browser storage itself. Each collection
//! serializes to a single JSON blob and hands it to a [`BlobStore`]; hosts
//! plug in their own backend (files on a terminal, memory in tests).

use std::collections::HashMap;
use std::sync::Mutex;

use crate::{Error, Result};

/// Prefix shared by every persisted collection key.
pub const STORAGE_PREFIX: &str = "suitewaste-";

/// Storage key for a collection name, e.g. `transactions` ->
/// `suitewaste-transactions`.
pub fn storage_key(collection: &str) -> String {
    format!("{STORAGE_PREFIX}{collection}")
}

/// A keyed blob container. One key per collection, holding the full
/// serialized array of that collection's records.
pub trait BlobStore: Send + Sync {
    /// Read the blob stored under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write `value` under `key`, replacing any previous blob.
    fn put(&self, key: &str, value: &str) -> Result<()>;
}

/// In-memory [`BlobStore`], the default for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    blobs: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.blobs
            .lock()
            .map_err(|_| Error::Storage("memory store poisoned".to_string()))
    }
}

impl BlobStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> Result<()> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_key_prefixes_collection_name() {
        assert_eq!(storage_key("transactions"), "suitewaste-transactions");
        assert_eq!(storage_key("gl_entries"), "suitewaste-gl_entries");
    }

    #[test]
    fn memory_store_round_trip() {
        let store = MemoryStore::new();
        assert_eq!(store.get("suitewaste-materials").unwrap(), None);

        store.put("suitewaste-materials", "[]").unwrap();
        assert_eq!(
            store.get("suitewaste-materials").unwrap(),
            Some("[]".to_string())
        );

        store.put("suitewaste-materials", "[1]").unwrap();
        assert_eq!(
            store.get("suitewaste-materials").unwrap(),
            Some("[1]".to_string())
        );
    }
}
