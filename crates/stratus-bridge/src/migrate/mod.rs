//! Migration orchestration.
//!
//! Moves a whole table between local files and its store footprint:
//!
//! ```text
//!            copy_to_store                         store footprint
//! t.MAI ──┬── header ── to_store_format ──────────► db/t/aria
//!         └── blocks ── envelope::encode ─────────► db/t/index/000001..
//! t.MAD ───── blocks ── envelope::encode ─────────► db/t/data/000001..
//! t.frm ───── mark_store_engine ──────────────────► db/t/frm
//!
//!            copy_from_store reverses every arrow
//!            delete_footprint removes blocks, schema, then the descriptor
//! ```
//!
//! Each direction is a fixed sequence of [`MigrationStep`]s. The first failing
//! step aborts the direction; nothing already written is undone, and the
//! returned error names the step.
//!
//! [`MigrationStep`]: stratus_common::types::MigrationStep

mod delete;
mod from_store;
mod to_store;

pub use delete::{delete_footprint, DeleteReport};
pub use from_store::copy_from_store;
pub use to_store::copy_to_store;

use std::ffi::OsString;
use std::fmt;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use stratus_common::config::BridgeConfig;
use stratus_common::constants::{DATA_FILE_EXT, INDEX_FILE_EXT, SCHEMA_FILE_EXT};
use stratus_common::types::{CompressionAlgorithm, FileKind};

/// Paths of a local table: `<base>.MAI`, `<base>.MAD` and `<base>.frm`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalTable {
    base: PathBuf,
}

impl LocalTable {
    /// Creates a local table from its path without extension, e.g.
    /// `/var/lib/db/shop/orders`.
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    /// Returns the base path.
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Path of the index file.
    pub fn index_path(&self) -> PathBuf {
        self.with_ext(INDEX_FILE_EXT)
    }

    /// Path of the data file.
    pub fn data_path(&self) -> PathBuf {
        self.with_ext(DATA_FILE_EXT)
    }

    /// Path of the schema file.
    pub fn schema_path(&self) -> PathBuf {
        self.with_ext(SCHEMA_FILE_EXT)
    }

    /// Path of the file holding `kind` blocks.
    pub fn path(&self, kind: FileKind) -> PathBuf {
        match kind {
            FileKind::Index => self.index_path(),
            FileKind::Data => self.data_path(),
        }
    }

    // Appends rather than replaces, so table names containing dots survive.
    fn with_ext(&self, ext: &str) -> PathBuf {
        let mut path: OsString = self.base.clone().into_os_string();
        path.push(".");
        path.push(ext);
        PathBuf::from(path)
    }
}

/// Options of a copy in either direction.
///
/// Without an explicit block size, the block size and compression recorded
/// in the table header are used as a pair; a header with none recorded falls
/// back to the configured defaults. An explicit compression always wins.
#[derive(Debug, Clone)]
pub struct CopyOptions {
    /// Overwrite an existing destination.
    pub force: bool,
    /// Requested store block size.
    pub block_size: Option<u32>,
    /// Requested compression.
    pub compression: Option<CompressionAlgorithm>,
    default_block_size: u32,
    default_compression: CompressionAlgorithm,
}

impl CopyOptions {
    /// Creates options using the defaults of `config`.
    pub fn new(config: &BridgeConfig) -> Self {
        Self {
            force: false,
            block_size: None,
            compression: None,
            default_block_size: config.block_size,
            default_compression: config.compression,
        }
    }

    /// Sets `force`.
    #[must_use]
    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Requests a store block size.
    #[must_use]
    pub fn block_size(mut self, block_size: u32) -> Self {
        self.block_size = Some(block_size);
        self
    }

    /// Requests a compression algorithm.
    #[must_use]
    pub fn compression(mut self, compression: CompressionAlgorithm) -> Self {
        self.compression = Some(compression);
        self
    }

    /// Store block size and compression to use given the values recorded
    /// in the header (block size 0 when none).
    pub(crate) fn effective_settings(
        &self,
        recorded_block_size: u32,
        recorded_compression: CompressionAlgorithm,
    ) -> (u32, CompressionAlgorithm) {
        let (block_size, compression) = match self.block_size {
            Some(block_size) => (block_size, self.default_compression),
            None if recorded_block_size != 0 => (recorded_block_size, recorded_compression),
            None => (self.default_block_size, self.default_compression),
        };
        (block_size, self.compression.unwrap_or(compression))
    }
}

impl Default for CopyOptions {
    fn default() -> Self {
        Self::new(&BridgeConfig::default())
    }
}

/// Per-file transfer counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileTransfer {
    /// Block objects written or read.
    pub blocks: u64,
    /// Local file bytes moved, excluding the index header.
    pub bytes: u64,
    /// Bytes as stored in the object store.
    pub stored_bytes: u64,
}

impl FileTransfer {
    fn record(&mut self, local: usize, stored: usize) {
        self.blocks += 1;
        self.bytes += local as u64;
        self.stored_bytes += stored as u64;
    }
}

/// Outcome of a successful copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyReport {
    /// Store block size used.
    pub block_size: u32,
    /// Compression used.
    pub compression: CompressionAlgorithm,
    /// Size of the descriptor object.
    pub descriptor_bytes: u64,
    /// Index blocks.
    pub index: FileTransfer,
    /// Data blocks.
    pub data: FileTransfer,
    /// True if the schema was copied.
    pub schema_copied: bool,
}

impl CopyReport {
    fn new(block_size: u32, compression: CompressionAlgorithm) -> Self {
        Self {
            block_size,
            compression,
            descriptor_bytes: 0,
            index: FileTransfer::default(),
            data: FileTransfer::default(),
            schema_copied: false,
        }
    }

    fn file_mut(&mut self, kind: FileKind) -> &mut FileTransfer {
        match kind {
            FileKind::Index => &mut self.index,
            FileKind::Data => &mut self.data,
        }
    }
}

impl fmt::Display for CopyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} index blocks, {} data blocks ({} bytes, {} stored), block size {}, compression {}, schema {}",
            self.index.blocks,
            self.data.blocks,
            self.index.bytes + self.data.bytes,
            self.index.stored_bytes + self.data.stored_bytes,
            self.block_size,
            self.compression,
            if self.schema_copied { "copied" } else { "skipped" }
        )
    }
}

/// Fills `buf` from `reader`, stopping early only at end of file.
fn read_chunk<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
