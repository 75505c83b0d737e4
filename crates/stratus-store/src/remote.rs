//! `object_store` backed client (S3 or a local directory).
//!
//! `object_store` is async; the bridge calls are blocking. The connector owns
//! a small tokio runtime and every connection drives its requests on it with
//! `block_on`. When the caller is itself running inside a tokio runtime the
//! request is driven from a scoped helper thread instead, since `block_on`
//! may not be nested.

use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use futures_util::StreamExt;
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::path::Path;
use object_store::ObjectStore;
use parking_lot::Mutex;
use stratus_common::config::{StoreBackend, StoreConfig};
use tokio::runtime::{Handle, Runtime};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::{Connector, ObjectStoreClient};

type StoreMap = HashMap<String, Arc<dyn ObjectStore>>;

/// Connector for `object_store` backends.
///
/// Clients are built lazily per bucket and reused by later connections; they
/// hold no per-request state.
pub struct RemoteConnector {
    backend: StoreBackend,
    runtime: Arc<Runtime>,
    stores: Arc<Mutex<StoreMap>>,
}

impl RemoteConnector {
    /// Creates a connector for an S3 or local backend.
    pub fn new(config: &StoreConfig) -> StoreResult<Self> {
        if matches!(config.backend, StoreBackend::Memory) {
            return Err(StoreError::connect(
                "memory backend has no remote connector",
            ));
        }

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("stratus-store")
            .enable_all()
            .build()
            .map_err(|e| StoreError::connect(format!("failed to create runtime: {e}")))?;

        Ok(Self {
            backend: config.backend.clone(),
            runtime: Arc::new(runtime),
            stores: Arc::new(Mutex::new(HashMap::new())),
        })
    }
}

impl std::fmt::Debug for RemoteConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteConnector")
            .field("backend", &self.backend)
            .field("buckets", &self.stores.lock().len())
            .finish()
    }
}

impl Connector for RemoteConnector {
    type Connection = RemoteConnection;

    fn connect(&self) -> StoreResult<Self::Connection> {
        Ok(RemoteConnection {
            backend: self.backend.clone(),
            runtime: Arc::clone(&self.runtime),
            stores: Arc::clone(&self.stores),
        })
    }
}

/// A connection to an `object_store` backend.
pub struct RemoteConnection {
    backend: StoreBackend,
    runtime: Arc<Runtime>,
    stores: Arc<Mutex<StoreMap>>,
}

impl RemoteConnection {
    fn store(&self, bucket: &str) -> StoreResult<Arc<dyn ObjectStore>> {
        let mut stores = self.stores.lock();
        if let Some(store) = stores.get(bucket) {
            return Ok(Arc::clone(store));
        }
        let store = build_store(&self.backend, bucket)?;
        debug!(bucket, "opened object store client");
        stores.insert(bucket.to_string(), Arc::clone(&store));
        Ok(store)
    }

    fn block_on<F>(&self, fut: F) -> StoreResult<F::Output>
    where
        F: Future + Send,
        F::Output: Send,
    {
        if Handle::try_current().is_ok() {
            std::thread::scope(|s| {
                s.spawn(|| self.runtime.block_on(fut))
                    .join()
                    .map_err(|_| StoreError::connect("store worker thread panicked"))
            })
        } else {
            Ok(self.runtime.block_on(fut))
        }
    }
}

fn build_store(backend: &StoreBackend, bucket: &str) -> StoreResult<Arc<dyn ObjectStore>> {
    match backend {
        StoreBackend::S3 {
            region,
            endpoint,
            access_key,
            secret_key,
            allow_http,
        } => {
            let mut builder = AmazonS3Builder::new()
                .with_bucket_name(bucket)
                .with_region(region)
                .with_allow_http(*allow_http);
            if let Some(endpoint) = endpoint {
                builder = builder.with_endpoint(endpoint);
            }
            if let Some(key) = access_key {
                builder = builder.with_access_key_id(key);
            }
            if let Some(secret) = secret_key {
                builder = builder.with_secret_access_key(secret);
            }
            let store = builder
                .build()
                .map_err(|e| StoreError::connect(e.to_string()))?;
            Ok(Arc::new(store))
        }
        StoreBackend::Local { root } => {
            let dir: PathBuf = root.join(bucket);
            std::fs::create_dir_all(&dir).map_err(|e| {
                StoreError::connect(format!("cannot create {}: {e}", dir.display()))
            })?;
            let store = LocalFileSystem::new_with_prefix(&dir)
                .map_err(|e| StoreError::connect(e.to_string()))?;
            Ok(Arc::new(store))
        }
        StoreBackend::Memory => Err(StoreError::connect(
            "memory backend has no remote connector",
        )),
    }
}

fn map_error(bucket: &str, name: &str, err: object_store::Error) -> StoreError {
    match err {
        object_store::Error::NotFound { .. } => StoreError::not_found(bucket, name),
        other => StoreError::transport(name, other.to_string()),
    }
}

impl ObjectStoreClient for RemoteConnection {
    fn get(&self, bucket: &str, name: &str) -> StoreResult<Bytes> {
        let store = self.store(bucket)?;
        let location = Path::from(name);
        self.block_on(async {
            let result = store.get(&location).await?;
            result.bytes().await
        })?
        .map_err(|e| map_error(bucket, name, e))
    }

    fn put(&self, bucket: &str, name: &str, data: Bytes) -> StoreResult<()> {
        let store = self.store(bucket)?;
        let location = Path::from(name);
        self.block_on(async { store.put(&location, data.into()).await })?
            .map(|_| ())
            .map_err(|e| map_error(bucket, name, e))
    }

    fn delete(&self, bucket: &str, name: &str) -> StoreResult<()> {
        let store = self.store(bucket)?;
        let location = Path::from(name);
        self.block_on(async { store.delete(&location).await })?
            .map_err(|e| map_error(bucket, name, e))
    }

    fn list_prefix(&self, bucket: &str, prefix: &str) -> StoreResult<Vec<String>> {
        let store = self.store(bucket)?;
        let location = Path::from(prefix);
        let listed = self.block_on(async {
            let mut stream = store.list(Some(&location));
            let mut names = Vec::new();
            while let Some(meta) = stream.next().await {
                names.push(meta?.location.to_string());
            }
            Ok::<_, object_store::Error>(names)
        })?;

        let listed = match listed {
            Ok(names) => names,
            Err(object_store::Error::NotFound { .. }) => Vec::new(),
            Err(e) => return Err(map_error(bucket, prefix, e)),
        };
        let mut names: Vec<String> = listed
            .into_iter()
            .filter(|name| name.starts_with(prefix))
            .collect();
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn local_connector(dir: &TempDir) -> RemoteConnector {
        RemoteConnector::new(&StoreConfig {
            bucket: "b".to_string(),
            backend: StoreBackend::Local {
                root: dir.path().to_path_buf(),
            },
        })
        .unwrap()
    }

    #[test]
    fn test_local_put_get_delete() {
        let dir = TempDir::new().unwrap();
        let conn = local_connector(&dir).connect().unwrap();

        conn.put("b", "db/t/aria", Bytes::from_static(b"header"))
            .unwrap();
        assert!(dir.path().join("b/db/t/aria").exists());
        assert_eq!(
            conn.get("b", "db/t/aria").unwrap(),
            Bytes::from_static(b"header")
        );

        conn.delete("b", "db/t/aria").unwrap();
        assert!(conn.get("b", "db/t/aria").unwrap_err().is_not_found());
        assert!(!conn.exists("b", "db/t/aria").unwrap());
    }

    #[test]
    fn test_local_list_prefix() {
        let dir = TempDir::new().unwrap();
        let conn = local_connector(&dir).connect().unwrap();
        for name in ["db/t/index/000002", "db/t/index/000001", "db/t/data/000001"] {
            conn.put("b", name, Bytes::from_static(b"x")).unwrap();
        }

        assert_eq!(
            conn.list_prefix("b", "db/t/index/").unwrap(),
            vec!["db/t/index/000001", "db/t/index/000002"]
        );
        assert!(conn.list_prefix("b", "db/other/").unwrap().is_empty());
    }

    #[test]
    fn test_blocking_call_inside_runtime() {
        let dir = TempDir::new().unwrap();
        let connector = local_connector(&dir);
        let conn = connector.connect().unwrap();

        let caller = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        let read = caller.block_on(async {
            conn.put("b", "x", Bytes::from_static(b"1")).unwrap();
            conn.get("b", "x").unwrap()
        });
        assert_eq!(read, Bytes::from_static(b"1"));
    }

    #[test]
    fn test_memory_backend_rejected() {
        let config = StoreConfig {
            bucket: "b".to_string(),
            backend: StoreBackend::Memory,
        };
        assert!(RemoteConnector::new(&config).is_err());
    }
}
