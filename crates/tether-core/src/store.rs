//! In-memory [`DocumentStore`] and the document codec.
//!
//! Documents are encoded with bincode's serde path and the standard config.
//! [`MemoryStore`] keeps one sorted map per collection behind a single
//! `RwLock`, so `update` holds the write lock across its read and write.

use std::collections::BTreeMap;

use parking_lot::RwLock;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::TetherError;
use crate::traits::{Collection, DocumentStore, UpdateFn};

/// Encode a document.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, TetherError> {
    bincode::serde::encode_to_vec(value, bincode::config::standard())
        .map_err(|e| TetherError::Codec(e.to_string()))
}

/// Decode a document, rejecting trailing bytes.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, TetherError> {
    let (value, read) = bincode::serde::decode_from_slice(bytes, bincode::config::standard())
        .map_err(|e| TetherError::Codec(e.to_string()))?;
    if read != bytes.len() {
        return Err(TetherError::Codec(format!(
            "trailing bytes: read {read} of {}",
            bytes.len()
        )));
    }
    Ok(value)
}

type Keyspace = BTreeMap<String, Vec<u8>>;

/// Document store held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<BTreeMap<Collection, Keyspace>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents in a collection.
    pub fn len(&self, collection: Collection) -> usize {
        self.collections
            .read()
            .get(&collection)
            .map_or(0, BTreeMap::len)
    }

    pub fn is_empty(&self, collection: Collection) -> bool {
        self.len(collection) == 0
    }
}

impl DocumentStore for MemoryStore {
    fn get(&self, collection: Collection, key: &str) -> Result<Option<Vec<u8>>, TetherError> {
        Ok(self
            .collections
            .read()
            .get(&collection)
            .and_then(|space| space.get(key).cloned()))
    }

    fn put(&self, collection: Collection, key: &str, value: Vec<u8>) -> Result<(), TetherError> {
        self.collections
            .write()
            .entry(collection)
            .or_default()
            .insert(key.to_string(), value);
        Ok(())
    }

    fn delete(&self, collection: Collection, key: &str) -> Result<(), TetherError> {
        if let Some(space) = self.collections.write().get_mut(&collection) {
            space.remove(key);
        }
        Ok(())
    }

    fn scan_prefix(
        &self,
        collection: Collection,
        prefix: &str,
    ) -> Result<Vec<(String, Vec<u8>)>, TetherError> {
        let guard = self.collections.read();
        let Some(space) = guard.get(&collection) else {
            return Ok(Vec::new());
        };
        Ok(space
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect())
    }

    fn batch_put(
        &self,
        collection: Collection,
        items: Vec<(String, Vec<u8>)>,
    ) -> Result<(), TetherError> {
        let mut guard = self.collections.write();
        let space = guard.entry(collection).or_default();
        for (key, value) in items {
            space.insert(key, value);
        }
        Ok(())
    }

    fn batch_delete(&self, collection: Collection, keys: &[String]) -> Result<(), TetherError> {
        let mut guard = self.collections.write();
        if let Some(space) = guard.get_mut(&collection) {
            for key in keys {
                space.remove(key);
            }
        }
        Ok(())
    }

    fn update(
        &self,
        collection: Collection,
        key: &str,
        f: &mut UpdateFn<'_>,
    ) -> Result<Vec<u8>, TetherError> {
        let mut guard = self.collections.write();
        let space = guard.entry(collection).or_default();
        let next = f(space.get(key).cloned())?;
        space.insert(key.to_string(), next.clone());
        Ok(next)
    }
}
