//! Object naming and page-to-block addressing.
//!
//! A table footprint lives under `<database>/<table>/` in one bucket:
//!
//! ```text
//! shop/orders/aria            descriptor (index file header)
//! shop/orders/frm             schema descriptor (optional)
//! shop/orders/index/000001    index file bytes [header_size, header_size + bs)
//! shop/orders/index/000002    ...
//! shop/orders/data/000001     data file bytes [0, bs)
//! ```
//!
//! Everything here is pure; nothing touches the store.

use std::fmt;

use stratus_common::constants::{
    BLOCK_SUFFIX_WIDTH, DESCRIPTOR_OBJECT, NAME_SEPARATOR, SCHEMA_OBJECT,
};
use stratus_common::types::{BlockNumber, FileKind, PageNumber, TableId};

/// Name of one object in a bucket.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectName(String);

impl ObjectName {
    /// Name of a block object: `<db>/<table>/<kind>/<suffix>`.
    #[must_use]
    pub fn block(table: &TableId, kind: FileKind, block: BlockNumber) -> Self {
        debug_assert!(block.is_valid(), "block numbers start at 1");
        let mut name = block_prefix(table, kind);
        name.push_str(&block_suffix(block));
        Self(name)
    }

    /// Name of the descriptor object: `<db>/<table>/aria`.
    #[must_use]
    pub fn descriptor(table: &TableId) -> Self {
        Self(format!(
            "{}{NAME_SEPARATOR}{}{NAME_SEPARATOR}{DESCRIPTOR_OBJECT}",
            table.database(),
            table.table()
        ))
    }

    /// Name of the schema object: `<db>/<table>/frm`.
    #[must_use]
    pub fn schema(table: &TableId) -> Self {
        Self(format!(
            "{}{NAME_SEPARATOR}{}{NAME_SEPARATOR}{SCHEMA_OBJECT}",
            table.database(),
            table.table()
        ))
    }

    /// Returns the name as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ObjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectName({})", self.0)
    }
}

impl fmt::Display for ObjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ObjectName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Listing prefix for all blocks of one file: `<db>/<table>/<kind>/`.
#[must_use]
pub fn block_prefix(table: &TableId, kind: FileKind) -> String {
    format!(
        "{}{NAME_SEPARATOR}{}{NAME_SEPARATOR}{}{NAME_SEPARATOR}",
        table.database(),
        table.table(),
        kind.as_str()
    )
}

/// Listing prefix for the whole footprint: `<db>/<table>/`.
#[must_use]
pub fn table_prefix(table: &TableId) -> String {
    format!(
        "{}{NAME_SEPARATOR}{}{NAME_SEPARATOR}",
        table.database(),
        table.table()
    )
}

/// Decimal block number, zero padded to six digits. Wider numbers keep all
/// their digits.
#[must_use]
pub fn block_suffix(block: BlockNumber) -> String {
    format!("{:0width$}", block.as_u64(), width = BLOCK_SUFFIX_WIDTH)
}

/// Maps a cache page to the block object holding it.
///
/// `((page - head_blocks) << page_shift) / big_block_size + 1`
///
/// The caller guarantees `page >= head_blocks` and that the page starts on a
/// block boundary.
#[inline]
#[must_use]
pub fn block_number_for_page(
    page: PageNumber,
    head_blocks: u64,
    page_shift: u32,
    big_block_size: u64,
) -> BlockNumber {
    debug_assert!(page.as_u64() >= head_blocks, "page inside the head blocks");
    debug_assert!(big_block_size > 0);
    let offset = (page.as_u64() - head_blocks) << page_shift;
    debug_assert_eq!(offset % big_block_size, 0, "page not block aligned");
    BlockNumber::new(offset / big_block_size + 1)
}

/// A table's store-side identity: bucket plus `(database, table)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableFootprint {
    bucket: String,
    table: TableId,
}

impl TableFootprint {
    /// Creates a footprint handle.
    pub fn new(bucket: impl Into<String>, table: TableId) -> Self {
        Self {
            bucket: bucket.into(),
            table,
        }
    }

    /// Returns the bucket.
    #[inline]
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Returns the table identity.
    #[inline]
    pub fn table(&self) -> &TableId {
        &self.table
    }

    /// Name of the descriptor object.
    pub fn descriptor(&self) -> ObjectName {
        ObjectName::descriptor(&self.table)
    }

    /// Name of the schema object.
    pub fn schema(&self) -> ObjectName {
        ObjectName::schema(&self.table)
    }

    /// Name of one block object.
    pub fn block(&self, kind: FileKind, block: BlockNumber) -> ObjectName {
        ObjectName::block(&self.table, kind, block)
    }

    /// Listing prefix for the blocks of one file.
    pub fn block_prefix(&self, kind: FileKind) -> String {
        block_prefix(&self.table, kind)
    }
}

impl fmt::Display for TableFootprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.bucket, self.table)
    }
}
