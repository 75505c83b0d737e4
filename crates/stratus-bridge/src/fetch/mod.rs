//! Block fetch hook.
//!
//! Satisfies a page cache miss for a store-resident table by reading the one
//! block object that holds the missing page:
//!
//! ```text
//! page cache miss (file kind, page)
//!        │
//!        ▼
//! block_number_for_page ──► ObjectName ──► conn.get ──► envelope::decode
//!                                                              │
//!                                                              ▼
//!                                                   bytes for the cache
//! ```
//!
//! The fetcher holds only immutable table geometry and atomic counters, so
//! one instance serves every thread. Each caller brings its own connection.

mod stats;

pub use stats::FetchStats;

use std::io;

use bytes::Bytes;
use stratus_common::error::{StratusError, StratusResult};
use stratus_common::types::{BlockNumber, CompressionAlgorithm, FileKind, PageNumber};
use stratus_store::ObjectStoreClient;
use tracing::{debug, error};

use crate::address::{block_number_for_page, TableFootprint};
use crate::envelope;
use crate::header::{DescriptorLayout, TableCapabilities};

/// Read geometry of one local file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableGeometry {
    /// Leading pages not stored as block objects.
    pub head_blocks: u64,
    /// log2 of the local page size.
    pub page_shift: u32,
    /// Store block size.
    pub big_block_size: u64,
}

impl TableGeometry {
    /// Geometry of the index and data files of a stored table.
    pub fn for_table(caps: &TableCapabilities, store_block_size: u32) -> (Self, Self) {
        let page_shift = caps.block_size.trailing_zeros();
        let big_block_size = u64::from(store_block_size);
        (
            Self {
                head_blocks: caps.head_blocks(),
                page_shift,
                big_block_size,
            },
            Self {
                head_blocks: 0,
                page_shift,
                big_block_size,
            },
        )
    }

    /// Number of local pages per block object.
    #[inline]
    pub fn pages_per_block(&self) -> u64 {
        self.big_block_size >> self.page_shift
    }

    /// First page held by `block`.
    #[inline]
    pub fn first_page(&self, block: BlockNumber) -> PageNumber {
        PageNumber::new(self.head_blocks + (block.as_u64() - 1) * self.pages_per_block())
    }
}

/// Reads block objects of one store-resident table.
#[derive(Debug)]
pub struct BlockFetcher {
    footprint: TableFootprint,
    index: TableGeometry,
    data: TableGeometry,
    compression: CompressionAlgorithm,
    stats: FetchStats,
}

impl BlockFetcher {
    /// Opens a table by reading its descriptor object.
    pub fn open<C>(conn: &C, footprint: TableFootprint) -> StratusResult<Self>
    where
        C: ObjectStoreClient + ?Sized,
    {
        let name = footprint.descriptor();
        let descriptor = conn
            .get(footprint.bucket(), name.as_str())
            .map_err(|err| {
                if err.is_not_found() {
                    StratusError::TableNotFound {
                        bucket: footprint.bucket().to_string(),
                        table: footprint.table().clone(),
                    }
                } else {
                    err.into()
                }
            })?;

        let layout = DescriptorLayout::validate(&descriptor)?;
        let caps = TableCapabilities::parse(&descriptor)
            .map_err(|e| StratusError::corruption(format!("descriptor {name}: {e}")))?;

        Self::with_geometry(footprint, &caps, layout.store_block_size, layout.compression)
            .map_err(|e| StratusError::corruption(format!("descriptor {name}: {e}")))
    }

    /// Builds a fetcher from already known table properties.
    ///
    /// `store_block_size` must be a non-zero multiple of the local block
    /// size, else `InvalidArgument`.
    pub fn with_geometry(
        footprint: TableFootprint,
        caps: &TableCapabilities,
        store_block_size: u32,
        compression: CompressionAlgorithm,
    ) -> StratusResult<Self> {
        if store_block_size == 0 || store_block_size % caps.block_size != 0 {
            return Err(StratusError::invalid_argument(format!(
                "store block size {store_block_size} is not a multiple of the local block size {}",
                caps.block_size
            )));
        }
        let (index, data) = TableGeometry::for_table(caps, store_block_size);
        debug!(
            table = %footprint,
            head_blocks = index.head_blocks,
            block_size = store_block_size,
            %compression,
            "opened store table"
        );
        Ok(Self {
            footprint,
            index,
            data,
            compression,
            stats: FetchStats::new(),
        })
    }

    /// Returns the table footprint.
    pub fn footprint(&self) -> &TableFootprint {
        &self.footprint
    }

    /// Returns the geometry of one file.
    pub fn geometry(&self, kind: FileKind) -> &TableGeometry {
        match kind {
            FileKind::Index => &self.index,
            FileKind::Data => &self.data,
        }
    }

    /// Returns the table compression.
    pub fn compression(&self) -> CompressionAlgorithm {
        self.compression
    }

    /// Returns the fetch statistics.
    pub fn stats(&self) -> &FetchStats {
        &self.stats
    }

    /// Reads the block holding `page` of the given file.
    ///
    /// `page` must start a block; pages inside the head blocks are rejected.
    pub fn fetch_block<C>(&self, conn: &C, kind: FileKind, page: PageNumber) -> StratusResult<Bytes>
    where
        C: ObjectStoreClient + ?Sized,
    {
        self.stats.record_request();
        let geometry = self.geometry(kind);
        if page.as_u64() < geometry.head_blocks {
            self.stats.record_failure();
            return Err(StratusError::invalid_argument(format!(
                "page {page} of {kind} file lies in the {} head blocks",
                geometry.head_blocks
            )));
        }

        let block = block_number_for_page(
            page,
            geometry.head_blocks,
            geometry.page_shift,
            geometry.big_block_size,
        );
        self.read_block(conn, kind, block).map_err(|err| {
            self.stats.record_failure();
            err
        })
    }

    /// Reads one block object by number.
    pub fn read_block<C>(&self, conn: &C, kind: FileKind, block: BlockNumber) -> StratusResult<Bytes>
    where
        C: ObjectStoreClient + ?Sized,
    {
        let name = self.footprint.block(kind, block);
        let raw = conn.get(self.footprint.bucket(), name.as_str())?;
        let stored = raw.len();
        let bytes = envelope::decode(raw, self.compression.uses_envelope())
            .map_err(|e| StratusError::corruption(format!("{name}: {e}")))?;
        self.stats.record_read(stored, bytes.len());
        debug!(object = %name, stored, size = bytes.len(), "fetched block");
        Ok(bytes)
    }
}

/// The page cache side of the fetch hook.
///
/// The cache only learns that the read failed; the error kind is logged.
pub trait BigBlockRead {
    /// Reads the block holding `page` of the given file.
    fn read_big_block(
        &self,
        conn: &dyn ObjectStoreClient,
        kind: FileKind,
        page: PageNumber,
    ) -> io::Result<Bytes>;
}

impl BigBlockRead for BlockFetcher {
    fn read_big_block(
        &self,
        conn: &dyn ObjectStoreClient,
        kind: FileKind,
        page: PageNumber,
    ) -> io::Result<Bytes> {
        self.fetch_block(conn, kind, page).map_err(|err| {
            error!(
                table = %self.footprint,
                %kind,
                %page,
                error_kind = %err.kind(),
                error = %err,
                "block fetch failed"
            );
            io::Error::other(err)
        })
    }
}
