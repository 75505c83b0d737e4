//! Bridge configuration structures.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::constants::{
    DEFAULT_STORE_BLOCK_SIZE, MAX_STORE_BLOCK_SIZE, MIN_STORE_BLOCK_SIZE, STORE_BLOCK_SIZE_STEP,
};
use crate::error::{StratusError, StratusResult};
use crate::types::CompressionAlgorithm;

/// Main bridge configuration.
///
/// # Example
///
/// ```rust
/// use stratus_common::config::BridgeConfig;
///
/// let config = BridgeConfig::default();
/// assert_eq!(config.block_size, 4 * 1024 * 1024);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Store block size used when a copy does not name one and the table
    /// has none recorded.
    /// Default: 4194304 (4 MB)
    #[serde(default = "default_block_size")]
    pub block_size: u32,

    /// Compression used when a copy does not name one and the table has
    /// none recorded.
    /// Default: none
    #[serde(default)]
    pub compression: CompressionAlgorithm,

    /// Object store connection settings.
    #[serde(default)]
    pub store: StoreConfig,
}

fn default_block_size() -> u32 {
    DEFAULT_STORE_BLOCK_SIZE
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            block_size: default_block_size(),
            compression: CompressionAlgorithm::None,
            store: StoreConfig::default(),
        }
    }
}

impl BridgeConfig {
    /// Creates a configuration backed by an in-memory store, for tests.
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            store: StoreConfig {
                bucket: "stratus-test".to_string(),
                backend: StoreBackend::Memory,
            },
            ..Default::default()
        }
    }

    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> StratusResult<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| StratusError::local_io(path, e))?;
        Self::from_toml(&content)
    }

    /// Parses configuration from TOML text.
    pub fn from_toml(content: &str) -> StratusResult<Self> {
        toml::from_str(content).map_err(|e| StratusError::InvalidConfig {
            message: e.to_string(),
        })
    }

    /// Serializes the configuration to TOML. Credentials are not written.
    pub fn to_toml(&self) -> StratusResult<String> {
        toml::to_string_pretty(self).map_err(|e| StratusError::InvalidConfig {
            message: e.to_string(),
        })
    }

    /// Validates the configuration.
    pub fn validate(&self) -> StratusResult<()> {
        if !(MIN_STORE_BLOCK_SIZE..=MAX_STORE_BLOCK_SIZE).contains(&self.block_size) {
            return Err(StratusError::InvalidConfig {
                message: format!(
                    "block_size {} must be between {MIN_STORE_BLOCK_SIZE} and {MAX_STORE_BLOCK_SIZE}",
                    self.block_size
                ),
            });
        }
        if self.block_size % STORE_BLOCK_SIZE_STEP != 0 {
            return Err(StratusError::InvalidConfig {
                message: format!(
                    "block_size {} must be a multiple of {STORE_BLOCK_SIZE_STEP}",
                    self.block_size
                ),
            });
        }
        self.store.validate()
    }
}

/// Object store connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Bucket holding all table footprints.
    #[serde(default = "default_bucket")]
    pub bucket: String,

    /// Backend to connect to.
    #[serde(default)]
    pub backend: StoreBackend,
}

fn default_bucket() -> String {
    "stratus".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            bucket: default_bucket(),
            backend: StoreBackend::default(),
        }
    }
}

impl StoreConfig {
    /// Validates the store settings.
    pub fn validate(&self) -> StratusResult<()> {
        if self.bucket.is_empty() {
            return Err(StratusError::InvalidConfig {
                message: "bucket must not be empty".to_string(),
            });
        }
        if let StoreBackend::S3 { region, .. } = &self.backend {
            if region.is_empty() {
                return Err(StratusError::InvalidConfig {
                    message: "s3 backend requires a region".to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Object store backend.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StoreBackend {
    /// S3 or an S3-compatible service.
    S3 {
        /// Region name.
        region: String,
        /// Custom endpoint for S3-compatible services.
        #[serde(default)]
        endpoint: Option<String>,
        /// Access key id.
        #[serde(default, skip_serializing)]
        access_key: Option<String>,
        /// Secret access key.
        #[serde(default, skip_serializing)]
        secret_key: Option<String>,
        /// Allow plain HTTP endpoints.
        #[serde(default)]
        allow_http: bool,
    },
    /// A local directory; each bucket is a subdirectory of `root`.
    Local {
        /// Root directory.
        root: PathBuf,
    },
    /// Process-local in-memory store.
    Memory,
}

impl Default for StoreBackend {
    fn default() -> Self {
        Self::Local {
            root: PathBuf::from("./stratus-store"),
        }
    }
}

impl fmt::Debug for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::S3 {
                region,
                endpoint,
                access_key,
                allow_http,
                ..
            } => f
                .debug_struct("S3")
                .field("region", region)
                .field("endpoint", endpoint)
                .field("access_key", &access_key.as_ref().map(|_| "<redacted>"))
                .field("allow_http", allow_http)
                .finish_non_exhaustive(),
            Self::Local { root } => f.debug_struct("Local").field("root", root).finish(),
            Self::Memory => f.write_str("Memory"),
        }
    }
}
