//! In-process object store.
//!
//! Used by tests. Contents live only as long as the process; cloning the
//! store shares the same contents, so every "connection" is just a clone.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::RwLock;

use crate::error::{StoreError, StoreResult};
use crate::{Connector, ObjectStoreClient};

type Bucket = BTreeMap<String, Bytes>;

/// A thread-safe in-memory object store.
#[derive(Clone, Default)]
pub struct MemoryStore {
    buckets: Arc<RwLock<HashMap<String, Bucket>>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of objects in `bucket`.
    pub fn object_count(&self, bucket: &str) -> usize {
        self.buckets.read().get(bucket).map_or(0, BTreeMap::len)
    }

    /// Returns all object names in `bucket`, sorted.
    pub fn names(&self, bucket: &str) -> Vec<String> {
        self.buckets
            .read()
            .get(bucket)
            .map(|b| b.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Returns the total stored bytes in `bucket`.
    pub fn stored_bytes(&self, bucket: &str) -> usize {
        self.buckets
            .read()
            .get(bucket)
            .map_or(0, |b| b.values().map(Bytes::len).sum())
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let buckets = self.buckets.read();
        f.debug_struct("MemoryStore")
            .field("buckets", &buckets.len())
            .field("objects", &buckets.values().map(BTreeMap::len).sum::<usize>())
            .finish()
    }
}

impl ObjectStoreClient for MemoryStore {
    fn get(&self, bucket: &str, name: &str) -> StoreResult<Bytes> {
        self.buckets
            .read()
            .get(bucket)
            .and_then(|b| b.get(name))
            .cloned()
            .ok_or_else(|| StoreError::not_found(bucket, name))
    }

    fn put(&self, bucket: &str, name: &str, data: Bytes) -> StoreResult<()> {
        self.buckets
            .write()
            .entry(bucket.to_string())
            .or_default()
            .insert(name.to_string(), data);
        Ok(())
    }

    fn delete(&self, bucket: &str, name: &str) -> StoreResult<()> {
        self.buckets
            .write()
            .get_mut(bucket)
            .and_then(|b| b.remove(name))
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found(bucket, name))
    }

    fn list_prefix(&self, bucket: &str, prefix: &str) -> StoreResult<Vec<String>> {
        let buckets = self.buckets.read();
        let Some(objects) = buckets.get(bucket) else {
            return Ok(Vec::new());
        };
        Ok(objects
            .range(prefix.to_string()..)
            .take_while(|(name, _)| name.starts_with(prefix))
            .map(|(name, _)| name.clone())
            .collect())
    }

    fn exists(&self, bucket: &str, name: &str) -> StoreResult<bool> {
        Ok(self
            .buckets
            .read()
            .get(bucket)
            .is_some_and(|b| b.contains_key(name)))
    }
}

impl Connector for MemoryStore {
    type Connection = MemoryStore;

    fn connect(&self) -> StoreResult<Self::Connection> {
        Ok(self.clone())
    }
}
