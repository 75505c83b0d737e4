//! System-wide constants for Stratus.
//!
//! Object naming and the compression envelope are bit-exact wire formats.
//! Header offsets are owned jointly with the local table format and must not
//! change independently of it.

// =============================================================================
// Object Naming
// =============================================================================

/// Last path segment of the descriptor object (`<db>/<table>/aria`).
pub const DESCRIPTOR_OBJECT: &str = "aria";

/// Last path segment of the schema object (`<db>/<table>/frm`).
pub const SCHEMA_OBJECT: &str = "frm";

/// Minimum width of a block number suffix. Longer numbers keep all digits.
pub const BLOCK_SUFFIX_WIDTH: usize = 6;

/// Object name separator.
pub const NAME_SEPARATOR: char = '/';

// =============================================================================
// Compression Envelope
// =============================================================================

/// Size of the envelope prefixed to compressed-table blocks: flag + u24 length.
pub const ENVELOPE_HEADER_SIZE: usize = 4;

/// Raw (flag 0) blocks must be a multiple of this many bytes.
pub const RAW_BLOCK_ALIGNMENT: usize = 1024;

/// Payloads shorter than this are never compressed.
pub const MIN_COMPRESS_LENGTH: usize = 50;

/// Largest value representable by a 3-byte length field.
pub const MAX_U24: u32 = 0x00FF_FFFF;

// =============================================================================
// Store Block Size
// =============================================================================

/// Default store block size (4 MB).
pub const DEFAULT_STORE_BLOCK_SIZE: u32 = 4 * 1024 * 1024;

/// Minimum store block size accepted in configuration (64 KB).
pub const MIN_STORE_BLOCK_SIZE: u32 = 64 * 1024;

/// Maximum store block size accepted in configuration.
///
/// The header stores the block size in 3 bytes, so 16 MB itself does not fit;
/// the largest 8 KB multiple below it is used.
pub const MAX_STORE_BLOCK_SIZE: u32 = 16 * 1024 * 1024 - STORE_BLOCK_SIZE_STEP;

/// Configured block sizes must be a multiple of this value (8 KB).
pub const STORE_BLOCK_SIZE_STEP: u32 = 8 * 1024;

// =============================================================================
// Local Table Header Layout
// =============================================================================

/// Size of the fixed state header at the start of the index file.
pub const STATE_HEADER_SIZE: usize = 24;

/// Offset of the u16 big-endian pointer to the base info block.
pub const BASE_POS_OFFSET: usize = 12;

/// Offset of the data file type byte inside the state header.
pub const DATA_FILE_TYPE_OFFSET: usize = 22;

/// Data file type of the page-oriented (block record) row format.
pub const BLOCK_RECORD_FILE_TYPE: u8 = 3;

/// Size of a stored log sequence number.
pub const LSN_STORE_SIZE: usize = 7;

/// Offset of the recorded index file length (u64 big endian); the data file
/// length follows immediately.
pub const FILE_LENGTHS_OFFSET: usize = STATE_HEADER_SIZE + 4 + LSN_STORE_SIZE * 3 + 8 * 5;

/// Smallest descriptor that still holds both recorded file lengths.
pub const MIN_DESCRIPTOR_SIZE: usize = FILE_LENGTHS_OFFSET + 16;

/// Offset of `key_start` (u64 big endian) inside the base info block.
pub const BASE_KEY_START_OFFSET: usize = 0;

/// Offset of the local block size (u16 big endian) inside the base info block.
pub const BASE_BLOCK_SIZE_OFFSET: usize = 84;

/// Offset of the born-transactional flag inside the base info block.
pub const BASE_TRANSACTIONAL_OFFSET: usize = 90;

/// Offset of the compression algorithm byte inside the base info block.
pub const BASE_COMPRESSION_OFFSET: usize = 107;

/// Offset of the store block size (u24 big endian) inside the base info block.
pub const BASE_STORE_BLOCK_SIZE_OFFSET: usize = 119;

/// Number of base info bytes this crate reads or writes.
pub const BASE_INFO_SPAN: usize = BASE_STORE_BLOCK_SIZE_OFFSET + 3;

// =============================================================================
// Schema Descriptor
// =============================================================================

/// Offset of the engine identity byte in the schema file.
pub const SCHEMA_ENGINE_OFFSET: usize = 3;

/// Engine identity of a store-resident table.
pub const STORE_ENGINE_ID: u8 = 41;

/// Engine identity of a local (disk-resident) table.
pub const LOCAL_ENGINE_ID: u8 = 42;

// =============================================================================
// Local File Extensions
// =============================================================================

/// Extension of the local index file.
pub const INDEX_FILE_EXT: &str = "MAI";

/// Extension of the local data file.
pub const DATA_FILE_EXT: &str = "MAD";

/// Extension of the local schema file.
pub const SCHEMA_FILE_EXT: &str = "frm";
