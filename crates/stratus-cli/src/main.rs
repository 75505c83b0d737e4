//! Stratus Command-Line Interface
//!
//! Moves tables between a local data directory and an object store, and
//! inspects what is stored.
//!
//! # Usage
//!
//! ```bash
//! # Move shop.orders into the store using 1 MB zlib-compressed blocks
//! stratus --bucket tables copy-to shop orders --block-size 1048576 --compression zlib
//!
//! # Bring it back
//! stratus --bucket tables copy-from shop orders
//!
//! # List what is stored for a database
//! stratus --bucket tables ls shop
//!
//! # Dump one decoded block
//! stratus --bucket tables fetch shop orders data 1 -o block.bin
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use stratus_common::config::StoreBackend;
use stratus_common::types::{CompressionAlgorithm, FileKind, TableId};
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

use config::CliConfig;

/// Stratus command-line interface
#[derive(Parser, Debug)]
#[command(
    name = "stratus",
    version,
    about = "Move tables into and out of an object store",
    long_about = "Copies paged tables between a local data directory and an object store bucket.\n\n\
                  Settings come from the configuration file and can be overridden with flags\n\
                  or environment variables."
)]
struct Args {
    /// Configuration file path
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Bucket holding the tables
    #[arg(short = 'b', long, env = "STRATUS_BUCKET", global = true)]
    bucket: Option<String>,

    /// Store backend
    #[arg(long, value_enum, env = "STRATUS_BACKEND", global = true)]
    backend: Option<BackendArg>,

    /// Root directory of the local backend
    #[arg(long, value_name = "DIR", env = "STRATUS_ROOT", global = true)]
    root: Option<PathBuf>,

    /// S3 region
    #[arg(long, env = "AWS_REGION", global = true)]
    region: Option<String>,

    /// Endpoint of an S3-compatible service
    #[arg(long, env = "STRATUS_ENDPOINT", global = true)]
    endpoint: Option<String>,

    /// Access key id (use AWS_ACCESS_KEY_ID env var for security)
    #[arg(long, env = "AWS_ACCESS_KEY_ID", hide_env_values = true, global = true)]
    access_key: Option<String>,

    /// Secret access key (use AWS_SECRET_ACCESS_KEY env var for security)
    #[arg(long, env = "AWS_SECRET_ACCESS_KEY", hide_env_values = true, global = true)]
    secret_key: Option<String>,

    /// Local data directory holding `<database>/<table>` files
    #[arg(short = 'D', long, value_name = "DIR", env = "STRATUS_DATA_DIR", global = true)]
    data_dir: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

/// Store backend argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum BackendArg {
    /// Amazon S3 or an S3-compatible service
    S3,
    /// A local directory
    Local,
    /// In-process memory, discarded on exit (read-only commands only)
    Memory,
}

/// Compression argument
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CompressionArg {
    /// Store blocks as they are
    None,
    /// Compress blocks with zlib
    Zlib,
}

impl From<CompressionArg> for CompressionAlgorithm {
    fn from(arg: CompressionArg) -> Self {
        match arg {
            CompressionArg::None => CompressionAlgorithm::None,
            CompressionArg::Zlib => CompressionAlgorithm::Zlib,
        }
    }
}

/// File kind argument
#[derive(Debug, Clone, Copy, ValueEnum)]
enum FileKindArg {
    /// The index file
    Index,
    /// The data file
    Data,
}

impl From<FileKindArg> for FileKind {
    fn from(arg: FileKindArg) -> Self {
        match arg {
            FileKindArg::Index => FileKind::Index,
            FileKindArg::Data => FileKind::Data,
        }
    }
}

/// Table selection shared by the table commands.
#[derive(ClapArgs, Debug)]
struct TableArgs {
    /// Database name
    database: String,

    /// Table name
    table: String,

    /// Local path of the table without extension
    /// (default: <data-dir>/<database>/<table>)
    #[arg(long, value_name = "PATH")]
    path: Option<PathBuf>,
}

impl TableArgs {
    fn table_id(&self) -> Result<TableId> {
        Ok(TableId::new(&self.database, &self.table)?)
    }

    fn local_base(&self, config: &CliConfig) -> PathBuf {
        self.path
            .clone()
            .unwrap_or_else(|| config.table_base(&self.database, &self.table))
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Copy a local table into the store and remove its local files
    CopyTo {
        #[command(flatten)]
        table: TableArgs,

        /// Replace a table already in the store
        #[arg(short = 'f', long)]
        force: bool,

        /// Store block size in bytes
        #[arg(long)]
        block_size: Option<u32>,

        /// Block compression
        #[arg(long, value_enum)]
        compression: Option<CompressionArg>,
    },

    /// Recreate a local table from the store
    CopyFrom {
        #[command(flatten)]
        table: TableArgs,

        /// Overwrite existing local files
        #[arg(short = 'f', long)]
        force: bool,
    },

    /// Delete a table from the store
    Delete {
        /// Database name
        database: String,

        /// Table name
        table: String,
    },

    /// List stored objects
    Ls {
        /// Database name
        database: Option<String>,

        /// Table name
        table: Option<String>,
    },

    /// Fetch and decode one block object
    Fetch {
        /// Database name
        database: String,

        /// Table name
        table: String,

        /// File the block belongs to
        #[arg(value_enum)]
        kind: FileKindArg,

        /// Block number, starting at 1
        block: u64,

        /// Write the decoded block to this file
        #[arg(short = 'o', long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Print the effective configuration
    Config {
        /// Also save it to this file
        #[arg(long, value_name = "FILE")]
        save: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let args = Args::parse();

    init_logging(args.verbose);

    let config = load_config(&args)?;
    debug!(?config, "effective configuration");

    commands::execute(&config, args.command)
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("stratus=debug,stratus_bridge=debug,stratus_store=debug")
    } else {
        EnvFilter::new("stratus=warn,stratus_bridge=warn,stratus_store=warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();
}

fn load_config(args: &Args) -> Result<CliConfig> {
    let mut config = match &args.config {
        Some(path) => CliConfig::from_file(path)?,
        None => CliConfig::load_default()?,
    };

    if let Some(bucket) = &args.bucket {
        config.bridge.store.bucket.clone_from(bucket);
    }
    if let Some(dir) = &args.data_dir {
        config.data_dir.clone_from(dir);
    }
    if let Some(backend) = args.backend {
        config.bridge.store.backend = select_backend(backend, &config.bridge.store.backend);
    }
    apply_backend_flags(args, &mut config.bridge.store.backend);

    config
        .bridge
        .validate()
        .context("invalid configuration")?;
    Ok(config)
}

/// Switches backend kind, keeping settings of the current one when the kind
/// does not change.
fn select_backend(arg: BackendArg, current: &StoreBackend) -> StoreBackend {
    match (arg, current) {
        (BackendArg::S3, StoreBackend::S3 { .. })
        | (BackendArg::Local, StoreBackend::Local { .. })
        | (BackendArg::Memory, StoreBackend::Memory) => current.clone(),
        (BackendArg::S3, _) => StoreBackend::S3 {
            region: String::new(),
            endpoint: None,
            access_key: None,
            secret_key: None,
            allow_http: false,
        },
        (BackendArg::Local, _) => StoreBackend::default(),
        (BackendArg::Memory, _) => StoreBackend::Memory,
    }
}

fn apply_backend_flags(args: &Args, backend: &mut StoreBackend) {
    match backend {
        StoreBackend::S3 {
            region,
            endpoint,
            access_key,
            secret_key,
            allow_http,
        } => {
            if let Some(r) = &args.region {
                region.clone_from(r);
            }
            if let Some(e) = &args.endpoint {
                *allow_http |= e.starts_with("http://");
                *endpoint = Some(e.clone());
            }
            if args.access_key.is_some() {
                access_key.clone_from(&args.access_key);
            }
            if args.secret_key.is_some() {
                secret_key.clone_from(&args.secret_key);
            }
        }
        StoreBackend::Local { root } => {
            if let Some(r) = &args.root {
                root.clone_from(r);
            }
        }
        StoreBackend::Memory => {}
    }
}
