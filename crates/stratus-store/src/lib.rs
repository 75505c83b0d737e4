//! # stratus-store
//!
//! Object store client contract for Stratus.
//!
//! The bridge talks to the store only through [`ObjectStoreClient`]: get, put,
//! delete and prefix listing of named blobs inside a bucket. Connections are
//! ephemeral and owned by one caller for one operation; a [`Connector`] hands
//! out a fresh one on every call.
//!
//! ```text
//! ┌──────────────────────────────┐
//! │          Connector           │  connect() per operation / per miss
//! └──────────────────────────────┘
//!        │                 │
//!        ▼                 ▼
//! ┌──────────────┐  ┌──────────────────────┐
//! │ MemoryStore  │  │  RemoteConnection    │
//! │ (in process) │  │  (object_store: S3,  │
//! │              │  │   local directory)   │
//! └──────────────┘  └──────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust
//! use bytes::Bytes;
//! use stratus_store::{Connector, MemoryStore, ObjectStoreClient};
//!
//! let store = MemoryStore::new();
//! let conn = store.connect().unwrap();
//! conn.put("tables", "shop/orders/aria", Bytes::from_static(b"header")).unwrap();
//! assert!(conn.exists("tables", "shop/orders/aria").unwrap());
//! assert_eq!(conn.list_prefix("tables", "shop/orders/").unwrap().len(), 1);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod memory;
mod remote;

use bytes::Bytes;
use stratus_common::config::{StoreBackend, StoreConfig};

pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use remote::{RemoteConnection, RemoteConnector};

/// Blocking access to named blobs in buckets.
///
/// Implementations are connections: one caller uses one for the duration of
/// an operation and never shares it.
pub trait ObjectStoreClient {
    /// Reads a whole object.
    fn get(&self, bucket: &str, name: &str) -> StoreResult<Bytes>;

    /// Creates or replaces an object.
    fn put(&self, bucket: &str, name: &str, data: Bytes) -> StoreResult<()>;

    /// Deletes an object. Deleting a missing object reports `NotFound`.
    fn delete(&self, bucket: &str, name: &str) -> StoreResult<()>;

    /// Lists the names of all objects starting with `prefix`, sorted.
    fn list_prefix(&self, bucket: &str, prefix: &str) -> StoreResult<Vec<String>>;

    /// Checks whether an object exists.
    fn exists(&self, bucket: &str, name: &str) -> StoreResult<bool> {
        match self.get(bucket, name) {
            Ok(_) => Ok(true),
            Err(err) if err.is_not_found() => Ok(false),
            Err(err) => Err(err),
        }
    }
}

impl<T: ObjectStoreClient + ?Sized> ObjectStoreClient for &T {
    fn get(&self, bucket: &str, name: &str) -> StoreResult<Bytes> {
        (**self).get(bucket, name)
    }

    fn put(&self, bucket: &str, name: &str, data: Bytes) -> StoreResult<()> {
        (**self).put(bucket, name, data)
    }

    fn delete(&self, bucket: &str, name: &str) -> StoreResult<()> {
        (**self).delete(bucket, name)
    }

    fn list_prefix(&self, bucket: &str, prefix: &str) -> StoreResult<Vec<String>> {
        (**self).list_prefix(bucket, prefix)
    }

    fn exists(&self, bucket: &str, name: &str) -> StoreResult<bool> {
        (**self).exists(bucket, name)
    }
}

impl<T: ObjectStoreClient + ?Sized> ObjectStoreClient for Box<T> {
    fn get(&self, bucket: &str, name: &str) -> StoreResult<Bytes> {
        (**self).get(bucket, name)
    }

    fn put(&self, bucket: &str, name: &str, data: Bytes) -> StoreResult<()> {
        (**self).put(bucket, name, data)
    }

    fn delete(&self, bucket: &str, name: &str) -> StoreResult<()> {
        (**self).delete(bucket, name)
    }

    fn list_prefix(&self, bucket: &str, prefix: &str) -> StoreResult<Vec<String>> {
        (**self).list_prefix(bucket, prefix)
    }

    fn exists(&self, bucket: &str, name: &str) -> StoreResult<bool> {
        (**self).exists(bucket, name)
    }
}

/// Hands out connections.
///
/// Connectors are shared between threads; connections are not.
pub trait Connector: Send + Sync {
    /// The connection type.
    type Connection: ObjectStoreClient;

    /// Opens a new connection.
    fn connect(&self) -> StoreResult<Self::Connection>;
}

/// A connector for any configured backend.
pub enum AnyConnector {
    /// In-process store.
    Memory(MemoryStore),
    /// `object_store` backed store (S3 or local directory).
    Remote(RemoteConnector),
}

impl AnyConnector {
    /// Builds the connector for `config`.
    pub fn from_config(config: &StoreConfig) -> StoreResult<Self> {
        match config.backend {
            StoreBackend::Memory => Ok(Self::Memory(MemoryStore::new())),
            _ => RemoteConnector::new(config).map(Self::Remote),
        }
    }
}

impl Connector for AnyConnector {
    type Connection = Box<dyn ObjectStoreClient>;

    fn connect(&self) -> StoreResult<Self::Connection> {
        match self {
            Self::Memory(store) => Ok(Box::new(store.connect()?)),
            Self::Remote(remote) => Ok(Box::new(remote.connect()?)),
        }
    }
}
