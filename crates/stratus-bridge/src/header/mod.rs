//! Header format conversion.
//!
//! The index file header and the schema file belong to the local engine. The
//! bridge treats both as byte buffers and only touches a handful of fields at
//! fixed offsets:
//!
//! ```text
//! index header
//! +--------------------+---------------------------------------------------+
//! | state header (24)  | ... file lengths @89/@97 ... | base info @base_pos |
//! |   base_pos @12 ----+------------------------------>                     |
//! +--------------------+---------------------------------------------------+
//!
//! base info                          owned by the bridge?
//!   +0    key start (u64 BE)         no, read only
//!   +84   local block size (u16 BE)  no, read only
//!   +90   born transactional         no, read only
//!   +107  compression algorithm      yes
//!   +119  store block size (u24 BE)  yes
//!
//! schema file
//!   +3    engine identity            yes (41 = store, 42 = local)
//! ```
//!
//! The converters are infallible and panic on a buffer too short to hold the
//! fields: the local headers handed to them are produced by the engine. Headers
//! read back from the store are checked with [`DescriptorLayout::validate`]
//! before conversion.

mod capabilities;

pub use capabilities::{read_capabilities, TableCapabilities};

use stratus_common::constants::{
    BASE_COMPRESSION_OFFSET, BASE_INFO_SPAN, BASE_POS_OFFSET, BASE_STORE_BLOCK_SIZE_OFFSET,
    FILE_LENGTHS_OFFSET, LOCAL_ENGINE_ID, MAX_U24, MIN_DESCRIPTOR_SIZE, SCHEMA_ENGINE_OFFSET,
    STORE_ENGINE_ID,
};
use stratus_common::error::{StratusError, StratusResult};
use stratus_common::types::CompressionAlgorithm;

/// Offset of the base info block inside an index header.
#[inline]
pub fn base_offset(header: &[u8]) -> usize {
    usize::from(u16::from_be_bytes([
        header[BASE_POS_OFFSET],
        header[BASE_POS_OFFSET + 1],
    ]))
}

fn owned_base(header: &[u8]) -> usize {
    assert!(
        header.len() >= BASE_POS_OFFSET + 2,
        "index header of {} bytes has no base info pointer",
        header.len()
    );
    let base = base_offset(header);
    assert!(
        header.len() >= base + BASE_INFO_SPAN,
        "index header of {} bytes ends inside base info at {base}",
        header.len()
    );
    base
}

/// Records the store block size and compression algorithm in an index
/// header.
///
/// # Panics
///
/// Panics if the header is too short or `block_size` does not fit 24 bits.
pub fn to_store_format(header: &mut [u8], block_size: u32, compression: CompressionAlgorithm) {
    assert!(block_size <= MAX_U24, "block size {block_size} exceeds 24 bits");
    let base = owned_base(header);
    header[base + BASE_COMPRESSION_OFFSET] = compression.as_u8();
    write_u24_be(&mut header[base + BASE_STORE_BLOCK_SIZE_OFFSET..], block_size);
}

/// Clears the store block size and compression algorithm of an index header.
///
/// # Panics
///
/// Panics if the header is too short.
pub fn to_local_format(header: &mut [u8]) {
    let base = owned_base(header);
    header[base + BASE_COMPRESSION_OFFSET] = 0;
    write_u24_be(&mut header[base + BASE_STORE_BLOCK_SIZE_OFFSET..], 0);
}

/// Marks a schema file as describing a store-resident table.
///
/// # Panics
///
/// Panics if the buffer does not reach the engine identity byte.
pub fn mark_store_engine(schema: &mut [u8]) {
    schema[SCHEMA_ENGINE_OFFSET] = STORE_ENGINE_ID;
}

/// Marks a schema file as describing a local table.
///
/// # Panics
///
/// Panics if the buffer does not reach the engine identity byte.
pub fn mark_local_engine(schema: &mut [u8]) {
    schema[SCHEMA_ENGINE_OFFSET] = LOCAL_ENGINE_ID;
}

/// Returns the engine identity byte of a schema file, if present.
pub fn engine_id(schema: &[u8]) -> Option<u8> {
    schema.get(SCHEMA_ENGINE_OFFSET).copied()
}

fn read_u24_be(buf: &[u8]) -> u32 {
    u32::from_be_bytes([0, buf[0], buf[1], buf[2]])
}

fn write_u24_be(buf: &mut [u8], value: u32) {
    buf[..3].copy_from_slice(&value.to_be_bytes()[1..]);
}

fn read_u64_be(buf: &[u8], at: usize) -> u64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&buf[at..at + 8]);
    u64::from_be_bytes(raw)
}

/// Fields of a descriptor object read back from the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescriptorLayout {
    /// Offset of the base info block.
    pub base_offset: usize,
    /// Length of the local index file, header included.
    pub index_length: u64,
    /// Length of the local data file.
    pub data_length: u64,
    /// Compression recorded by the copy that produced the descriptor.
    pub compression: CompressionAlgorithm,
    /// Store block size recorded by the copy that produced the descriptor.
    pub store_block_size: u32,
}

impl DescriptorLayout {
    /// Checks that a descriptor holds every field the bridge reads or patches
    /// and returns their values.
    pub fn validate(descriptor: &[u8]) -> StratusResult<Self> {
        if descriptor.len() < MIN_DESCRIPTOR_SIZE {
            return Err(StratusError::corruption(format!(
                "descriptor of {} bytes is shorter than {MIN_DESCRIPTOR_SIZE}",
                descriptor.len()
            )));
        }
        let base = base_offset(descriptor);
        if descriptor.len() < base + BASE_INFO_SPAN {
            return Err(StratusError::corruption(format!(
                "descriptor of {} bytes ends inside base info at {base}",
                descriptor.len()
            )));
        }

        let compression_byte = descriptor[base + BASE_COMPRESSION_OFFSET];
        let compression = CompressionAlgorithm::from_u8(compression_byte).ok_or_else(|| {
            StratusError::corruption(format!(
                "descriptor records unknown compression algorithm {compression_byte}"
            ))
        })?;

        Ok(Self {
            base_offset: base,
            index_length: read_u64_be(descriptor, FILE_LENGTHS_OFFSET),
            data_length: read_u64_be(descriptor, FILE_LENGTHS_OFFSET + 8),
            compression,
            store_block_size: read_u24_be(&descriptor[base + BASE_STORE_BLOCK_SIZE_OFFSET..]),
        })
    }
}
