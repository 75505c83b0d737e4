//! Read-only view of the local table capabilities.

use std::io::{self, Read};
use std::path::Path;

use stratus_common::constants::{
    BASE_BLOCK_SIZE_OFFSET, BASE_COMPRESSION_OFFSET, BASE_INFO_SPAN, BASE_KEY_START_OFFSET,
    BASE_STORE_BLOCK_SIZE_OFFSET, BASE_TRANSACTIONAL_OFFSET, BLOCK_RECORD_FILE_TYPE,
    DATA_FILE_TYPE_OFFSET, RAW_BLOCK_ALIGNMENT, STATE_HEADER_SIZE,
};
use stratus_common::error::{StratusError, StratusResult};
use stratus_common::types::CompressionAlgorithm;

use super::{base_offset, read_u24_be, read_u64_be};

/// Values of a local index header that decide whether and how a table can be
/// stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableCapabilities {
    /// Length of the index file header (key start offset).
    pub header_size: u64,
    /// Local on-disk block size.
    pub block_size: u32,
    /// True if the table was created transactional.
    pub transactional: bool,
    /// Row storage format.
    pub data_file_type: u8,
    /// Store block size recorded in the header; 0 if none.
    pub store_block_size: u32,
    /// Compression recorded in the header.
    pub compression: CompressionAlgorithm,
}

impl TableCapabilities {
    /// Parses capabilities from the start of an index file.
    ///
    /// `header` must hold at least the state header and the base info block.
    pub fn parse(header: &[u8]) -> StratusResult<Self> {
        if header.len() < STATE_HEADER_SIZE {
            return Err(StratusError::unsupported(format!(
                "index header of {} bytes is shorter than the state header",
                header.len()
            )));
        }
        let base = base_offset(header);
        if header.len() < base + BASE_INFO_SPAN {
            return Err(StratusError::unsupported(format!(
                "index header of {} bytes ends inside base info at {base}",
                header.len()
            )));
        }
        let info = &header[base..];

        let block_size = u32::from(u16::from_be_bytes([
            info[BASE_BLOCK_SIZE_OFFSET],
            info[BASE_BLOCK_SIZE_OFFSET + 1],
        ]));
        if block_size == 0 || !block_size.is_power_of_two() {
            return Err(StratusError::unsupported(format!(
                "local block size {block_size} is not a power of two"
            )));
        }

        let compression_byte = info[BASE_COMPRESSION_OFFSET];
        let compression = CompressionAlgorithm::from_u8(compression_byte).ok_or_else(|| {
            StratusError::unsupported(format!("unknown compression algorithm {compression_byte}"))
        })?;

        Ok(Self {
            header_size: read_u64_be(info, BASE_KEY_START_OFFSET),
            block_size,
            transactional: info[BASE_TRANSACTIONAL_OFFSET] != 0,
            data_file_type: header[DATA_FILE_TYPE_OFFSET],
            store_block_size: read_u24_be(&info[BASE_STORE_BLOCK_SIZE_OFFSET..]),
            compression,
        })
    }

    /// Returns true if rows are stored in the page-oriented format.
    #[inline]
    pub fn is_page_format(&self) -> bool {
        self.data_file_type == BLOCK_RECORD_FILE_TYPE
    }

    /// Fails with `UnsupportedFormat` unless the table can be stored.
    pub fn check_migratable(&self) -> StratusResult<()> {
        if self.transactional || !self.is_page_format() {
            return Err(StratusError::unsupported(format!(
                "table must be non-transactional with page row format \
                 (transactional: {}, data file type: {})",
                self.transactional, self.data_file_type
            )));
        }
        // Every stored chunk, including the last one of a file, must be a
        // whole number of envelope alignment units.
        if self.block_size as usize % RAW_BLOCK_ALIGNMENT != 0 {
            return Err(StratusError::unsupported(format!(
                "local block size {} is not a multiple of {RAW_BLOCK_ALIGNMENT}",
                self.block_size
            )));
        }
        if self.header_size % u64::from(self.block_size) != 0 {
            return Err(StratusError::unsupported(format!(
                "header size {} is not a multiple of block size {}",
                self.header_size, self.block_size
            )));
        }
        Ok(())
    }

    /// Number of local pages covered by the header.
    #[inline]
    pub fn head_blocks(&self) -> u64 {
        self.header_size / u64::from(self.block_size)
    }

    /// Aligns a requested store block size down to a whole number of local
    /// blocks.
    pub fn align_block_size(&self, requested: u32) -> StratusResult<u32> {
        let aligned = requested / self.block_size * self.block_size;
        if aligned == 0 {
            return Err(StratusError::invalid_argument(format!(
                "block size {requested} is smaller than the local block size {}",
                self.block_size
            )));
        }
        Ok(aligned)
    }
}

/// Reads the capabilities from the start of an index file.
///
/// Reads the state header first to locate the base info block, then only as
/// far as the end of the base info. `path` names the file in errors.
pub fn read_capabilities<R: Read>(mut reader: R, path: &Path) -> StratusResult<TableCapabilities> {
    let mut header = vec![0u8; STATE_HEADER_SIZE];
    read_header(&mut reader, &mut header, path)?;

    let end = base_offset(&header) + BASE_INFO_SPAN;
    if end > header.len() {
        let start = header.len();
        header.resize(end, 0);
        read_header(&mut reader, &mut header[start..], path)?;
    }
    TableCapabilities::parse(&header)
}

fn read_header<R: Read>(reader: &mut R, buf: &mut [u8], path: &Path) -> StratusResult<()> {
    reader.read_exact(buf).map_err(|err| {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            StratusError::unsupported(format!(
                "{} is too short to hold an index header",
                path.display()
            ))
        } else {
            StratusError::local_io(path, err)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use stratus_common::ErrorKind;

    const BASE: usize = 256;
    const KEY_START: u64 = 8192;

    fn index_header(block_size: u16, transactional: bool, file_type: u8) -> Vec<u8> {
        let mut h = vec![0u8; 512];
        h[12..14].copy_from_slice(&(BASE as u16).to_be_bytes());
        h[DATA_FILE_TYPE_OFFSET] = file_type;
        h[BASE..BASE + 8].copy_from_slice(&KEY_START.to_be_bytes());
        h[BASE + BASE_BLOCK_SIZE_OFFSET..BASE + BASE_BLOCK_SIZE_OFFSET + 2]
            .copy_from_slice(&block_size.to_be_bytes());
        h[BASE + BASE_TRANSACTIONAL_OFFSET] = u8::from(transactional);
        h
    }

    #[test]
    fn test_parse() {
        let caps = TableCapabilities::parse(&index_header(1024, false, 3)).unwrap();
        assert_eq!(caps.header_size, 8192);
        assert_eq!(caps.block_size, 1024);
        assert_eq!(caps.head_blocks(), 8);
        assert_eq!(caps.store_block_size, 0);
        assert_eq!(caps.compression, CompressionAlgorithm::None);
        assert!(caps.is_page_format());
        assert!(caps.check_migratable().is_ok());
    }

    #[test]
    fn test_not_migratable() {
        let caps = TableCapabilities::parse(&index_header(1024, true, 3)).unwrap();
        assert_eq!(
            caps.check_migratable().unwrap_err().kind(),
            ErrorKind::UnsupportedFormat
        );

        let caps = TableCapabilities::parse(&index_header(1024, false, 1)).unwrap();
        assert_eq!(
            caps.check_migratable().unwrap_err().kind(),
            ErrorKind::UnsupportedFormat
        );

        let err = TableCapabilities::parse(&index_header(1000, false, 3)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedFormat);
    }

    #[test]
    fn test_small_local_blocks_not_migratable() {
        // A 512-byte tail chunk could not be stored raw inside an envelope.
        let caps = TableCapabilities::parse(&index_header(512, false, 3)).unwrap();
        let err = caps.check_migratable().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedFormat);
        assert!(err.to_string().contains("512"));

        let caps = TableCapabilities::parse(&index_header(2048, false, 3)).unwrap();
        assert!(caps.check_migratable().is_ok());
    }

    #[test]
    fn test_align_block_size() {
        let caps = TableCapabilities::parse(&index_header(8192, false, 3)).unwrap();
        assert_eq!(caps.align_block_size(4 * 1024 * 1024).unwrap(), 4 * 1024 * 1024);
        assert_eq!(caps.align_block_size(20_000).unwrap(), 16384);
        assert_eq!(
            caps.align_block_size(4096).unwrap_err().kind(),
            ErrorKind::InvalidArgument
        );
    }

    #[test]
    fn test_read_capabilities() {
        let mut file = index_header(512, false, 3);
        file.extend_from_slice(&[7u8; 1024]);
        let path = Path::new("t.MAI");
        let caps = read_capabilities(Cursor::new(file), path).unwrap();
        assert_eq!(caps.block_size, 512);

        let short = read_capabilities(Cursor::new(vec![0u8; 10]), path).unwrap_err();
        assert_eq!(short.kind(), ErrorKind::UnsupportedFormat);
        assert!(short.to_string().contains("t.MAI"));

        let truncated = index_header(512, false, 3)[..300].to_vec();
        assert!(read_capabilities(Cursor::new(truncated), path).is_err());
    }
}
