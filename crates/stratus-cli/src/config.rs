//! Configuration file support for the CLI.
//!
//! Loads and saves the CLI configuration from TOML files. The bridge settings
//! sit at the top level of the file next to the CLI's own keys:
//!
//! ```toml
//! data_dir = "/var/lib/mysql"
//! block_size = 4194304
//! compression = "zlib"
//!
//! [store]
//! bucket = "tables"
//!
//! [store.backend]
//! kind = "s3"
//! region = "eu-west-1"
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use stratus_common::config::BridgeConfig;

/// CLI configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliConfig {
    /// Directory holding `<database>/<table>.MAI` files.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Bridge and store settings.
    #[serde(flatten)]
    pub bridge: BridgeConfig,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            bridge: BridgeConfig::default(),
        }
    }
}

impl CliConfig {
    /// Loads configuration from a file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("invalid configuration in {}", path.display()))?;
        Ok(config)
    }

    /// Saves configuration to a file. Credentials are not written.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Loads the default configuration file.
    ///
    /// Looks in the following locations:
    /// 1. ~/.config/stratus/config.toml
    /// 2. ~/.stratus/config.toml
    /// 3. Returns default if not found
    pub fn load_default() -> Result<Self> {
        if let Some(config_dir) = dirs::config_dir() {
            let path = config_dir.join("stratus").join("config.toml");
            if path.exists() {
                return Self::from_file(&path);
            }
        }

        if let Some(home) = dirs::home_dir() {
            let path = home.join(".stratus").join("config.toml");
            if path.exists() {
                return Self::from_file(&path);
            }
        }

        Ok(Self::default())
    }

    /// Returns the default configuration file path.
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("stratus").join("config.toml"))
    }

    /// Local base path (without extension) of a table.
    pub fn table_base(&self, database: &str, table: &str) -> PathBuf {
        self.data_dir.join(database).join(table)
    }
}
