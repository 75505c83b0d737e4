//! Object stores that record or fail requests.

use std::collections::HashSet;

use bytes::Bytes;
use parking_lot::Mutex;
use stratus_store::{MemoryStore, ObjectStoreClient, StoreError, StoreResult};

/// One request seen by a [`RecordingStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOp {
    /// GET of a name.
    Get(String),
    /// PUT of a name.
    Put(String),
    /// DELETE of a name.
    Delete(String),
    /// LIST of a prefix.
    List(String),
}

/// A store that keeps every request in order, failed ones included.
#[derive(Debug)]
pub struct RecordingStore<C = MemoryStore> {
    inner: C,
    ops: Mutex<Vec<StoreOp>>,
}

impl RecordingStore {
    /// Creates an empty memory-backed store.
    pub fn new() -> Self {
        Self::wrap(MemoryStore::new())
    }
}

impl Default for RecordingStore {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> RecordingStore<C> {
    /// Wraps an existing store.
    pub fn wrap(inner: C) -> Self {
        Self {
            inner,
            ops: Mutex::new(Vec::new()),
        }
    }

    /// Returns the underlying store.
    pub fn inner(&self) -> &C {
        &self.inner
    }

    /// Returns the recorded requests.
    pub fn ops(&self) -> Vec<StoreOp> {
        self.ops.lock().clone()
    }

    /// Names passed to PUT, in order.
    pub fn puts(&self) -> Vec<String> {
        self.ops
            .lock()
            .iter()
            .filter_map(|op| match op {
                StoreOp::Put(name) => Some(name.clone()),
                _ => None,
            })
            .collect()
    }

    /// Names passed to DELETE, in order.
    pub fn deletes(&self) -> Vec<String> {
        self.ops
            .lock()
            .iter()
            .filter_map(|op| match op {
                StoreOp::Delete(name) => Some(name.clone()),
                _ => None,
            })
            .collect()
    }

    /// Forgets the recorded requests.
    pub fn clear(&self) {
        self.ops.lock().clear();
    }

    fn record(&self, op: StoreOp) {
        self.ops.lock().push(op);
    }
}

impl<C: ObjectStoreClient> ObjectStoreClient for RecordingStore<C> {
    fn get(&self, bucket: &str, name: &str) -> StoreResult<Bytes> {
        self.record(StoreOp::Get(name.to_string()));
        self.inner.get(bucket, name)
    }

    fn put(&self, bucket: &str, name: &str, data: Bytes) -> StoreResult<()> {
        self.record(StoreOp::Put(name.to_string()));
        self.inner.put(bucket, name, data)
    }

    fn delete(&self, bucket: &str, name: &str) -> StoreResult<()> {
        self.record(StoreOp::Delete(name.to_string()));
        self.inner.delete(bucket, name)
    }

    fn list_prefix(&self, bucket: &str, prefix: &str) -> StoreResult<Vec<String>> {
        self.record(StoreOp::List(prefix.to_string()));
        self.inner.list_prefix(bucket, prefix)
    }
}

/// Which request a fault applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultOp {
    /// GET
    Get,
    /// PUT
    Put,
    /// DELETE
    Delete,
    /// LIST (the name is the prefix)
    List,
}

/// A memory store that fails chosen requests with a transport error.
#[derive(Debug, Default)]
pub struct FaultyStore {
    inner: MemoryStore,
    faults: Mutex<HashSet<(FaultOp, String)>>,
}

impl FaultyStore {
    /// Wraps an existing store.
    pub fn wrap(inner: MemoryStore) -> Self {
        Self {
            inner,
            faults: Mutex::new(HashSet::new()),
        }
    }

    /// Returns the underlying store.
    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }

    /// Makes `op` on `name` fail until [`heal`](Self::heal) is called.
    pub fn fail(&self, op: FaultOp, name: impl Into<String>) {
        self.faults.lock().insert((op, name.into()));
    }

    /// Removes all faults.
    pub fn heal(&self) {
        self.faults.lock().clear();
    }

    fn check(&self, op: FaultOp, name: &str) -> StoreResult<()> {
        if self.faults.lock().contains(&(op, name.to_string())) {
            return Err(StoreError::transport(name, "injected fault"));
        }
        Ok(())
    }
}

impl ObjectStoreClient for FaultyStore {
    fn get(&self, bucket: &str, name: &str) -> StoreResult<Bytes> {
        self.check(FaultOp::Get, name)?;
        self.inner.get(bucket, name)
    }

    fn put(&self, bucket: &str, name: &str, data: Bytes) -> StoreResult<()> {
        self.check(FaultOp::Put, name)?;
        self.inner.put(bucket, name, data)
    }

    fn delete(&self, bucket: &str, name: &str) -> StoreResult<()> {
        self.check(FaultOp::Delete, name)?;
        self.inner.delete(bucket, name)
    }

    fn list_prefix(&self, bucket: &str, prefix: &str) -> StoreResult<Vec<String>> {
        self.check(FaultOp::List, prefix)?;
        self.inner.list_prefix(bucket, prefix)
    }
}
