//! Builds local index/data/schema file triples the bridge accepts.
//!
//! The index header is filled with a byte pattern so tests can check that
//! everything outside the fields the bridge owns survives a round trip.

use std::fs;
use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use stratus_bridge::LocalTable;
use stratus_common::constants::{
    BASE_BLOCK_SIZE_OFFSET, BASE_COMPRESSION_OFFSET, BASE_KEY_START_OFFSET, BASE_POS_OFFSET,
    BASE_STORE_BLOCK_SIZE_OFFSET, BASE_TRANSACTIONAL_OFFSET, BLOCK_RECORD_FILE_TYPE,
    DATA_FILE_TYPE_OFFSET, FILE_LENGTHS_OFFSET, LOCAL_ENGINE_ID, SCHEMA_ENGINE_OFFSET,
};
use stratus_common::types::CompressionAlgorithm;

/// Offset of the base info in fixture headers.
pub const FIXTURE_BASE_POS: u16 = 256;

/// Builder for a local table.
#[derive(Debug, Clone)]
pub struct TableBuilder {
    header_size: usize,
    local_block_size: u16,
    index_body: usize,
    data_len: usize,
    schema_len: Option<usize>,
    transactional: bool,
    data_file_type: u8,
    compressible: bool,
    recorded_block_size: u32,
    recorded_compression: CompressionAlgorithm,
    seed: u64,
}

impl Default for TableBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TableBuilder {
    /// A 1 KB header with 1 KB local blocks, 3 KB of index blocks, 2 KB of
    /// data and a 64-byte schema file.
    pub fn new() -> Self {
        Self {
            header_size: 1024,
            local_block_size: 1024,
            index_body: 3 * 1024,
            data_len: 2 * 1024,
            schema_len: Some(64),
            transactional: false,
            data_file_type: BLOCK_RECORD_FILE_TYPE,
            compressible: false,
            recorded_block_size: 0,
            recorded_compression: CompressionAlgorithm::None,
            seed: 7,
        }
    }

    /// Sets the header size (also the key start recorded in the header).
    pub fn header_size(mut self, size: usize) -> Self {
        self.header_size = size;
        self
    }

    /// Sets the local block size.
    pub fn local_block_size(mut self, size: u16) -> Self {
        self.local_block_size = size;
        self
    }

    /// Sets the number of index bytes following the header.
    pub fn index_body(mut self, len: usize) -> Self {
        self.index_body = len;
        self
    }

    /// Sets the data file length.
    pub fn data_len(mut self, len: usize) -> Self {
        self.data_len = len;
        self
    }

    /// Sets the schema file length, or no schema file.
    pub fn schema_len(mut self, len: Option<usize>) -> Self {
        self.schema_len = len;
        self
    }

    /// Marks the table transactional.
    pub fn transactional(mut self, transactional: bool) -> Self {
        self.transactional = transactional;
        self
    }

    /// Sets the data file type.
    pub fn data_file_type(mut self, file_type: u8) -> Self {
        self.data_file_type = file_type;
        self
    }

    /// Fills the files with a repeating pattern instead of random bytes.
    pub fn compressible(mut self, compressible: bool) -> Self {
        self.compressible = compressible;
        self
    }

    /// Records a store block size and compression in the header.
    pub fn recorded(mut self, block_size: u32, compression: CompressionAlgorithm) -> Self {
        self.recorded_block_size = block_size;
        self.recorded_compression = compression;
        self
    }

    /// Sets the random seed.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Builds the index header alone.
    pub fn header(&self) -> Vec<u8> {
        let mut header: Vec<u8> = (0..self.header_size)
            .map(|i| (i % 200) as u8 + 1)
            .collect();
        header[BASE_POS_OFFSET..BASE_POS_OFFSET + 2].copy_from_slice(&FIXTURE_BASE_POS.to_be_bytes());
        header[DATA_FILE_TYPE_OFFSET] = self.data_file_type;
        let index_len = (self.header_size + self.index_body) as u64;
        header[FILE_LENGTHS_OFFSET..FILE_LENGTHS_OFFSET + 8].copy_from_slice(&index_len.to_be_bytes());
        header[FILE_LENGTHS_OFFSET + 8..FILE_LENGTHS_OFFSET + 16]
            .copy_from_slice(&(self.data_len as u64).to_be_bytes());

        let base = usize::from(FIXTURE_BASE_POS);
        let key_start = base + BASE_KEY_START_OFFSET;
        header[key_start..key_start + 8].copy_from_slice(&(self.header_size as u64).to_be_bytes());
        let block_size = base + BASE_BLOCK_SIZE_OFFSET;
        header[block_size..block_size + 2].copy_from_slice(&self.local_block_size.to_be_bytes());
        header[base + BASE_TRANSACTIONAL_OFFSET] = u8::from(self.transactional);
        header[base + BASE_COMPRESSION_OFFSET] = self.recorded_compression.as_u8();
        let store_block_size = base + BASE_STORE_BLOCK_SIZE_OFFSET;
        header[store_block_size..store_block_size + 3]
            .copy_from_slice(&self.recorded_block_size.to_be_bytes()[1..]);
        header
    }

    /// Writes the table as `<dir>/<name>.MAI`, `.MAD` and `.frm`.
    pub fn write(&self, dir: &Path, name: &str) -> LocalFixture {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut body = |len: usize| -> Vec<u8> {
            if self.compressible {
                (0..len).map(|i| (i % 61) as u8).collect()
            } else {
                let mut buf = vec![0u8; len];
                rng.fill_bytes(&mut buf);
                buf
            }
        };

        let mut index = self.header();
        index.extend(body(self.index_body));
        let data = body(self.data_len);
        let schema = self.schema_len.map(|len| {
            let mut schema: Vec<u8> = (0..len).map(|i| (i * 3) as u8).collect();
            if len > SCHEMA_ENGINE_OFFSET {
                schema[SCHEMA_ENGINE_OFFSET] = LOCAL_ENGINE_ID;
            }
            schema
        });

        let table = LocalTable::new(dir.join(name));
        fs::write(table.index_path(), &index).expect("write index file");
        fs::write(table.data_path(), &data).expect("write data file");
        if let Some(schema) = &schema {
            fs::write(table.schema_path(), schema).expect("write schema file");
        }

        LocalFixture {
            table,
            index,
            data,
            schema,
        }
    }
}

/// A table written to disk together with the bytes it was written with.
#[derive(Debug, Clone)]
pub struct LocalFixture {
    /// Local paths.
    pub table: LocalTable,
    /// Index file contents.
    pub index: Vec<u8>,
    /// Data file contents.
    pub data: Vec<u8>,
    /// Schema file contents, if written.
    pub schema: Option<Vec<u8>>,
}

impl LocalFixture {
    /// Base path of the table.
    pub fn base(&self) -> PathBuf {
        self.table.base().to_path_buf()
    }

    /// Asserts the local files hold exactly the fixture bytes.
    pub fn assert_restored(&self) {
        assert_eq!(fs::read(self.table.index_path()).expect("read index"), self.index);
        assert_eq!(fs::read(self.table.data_path()).expect("read data"), self.data);
        if let Some(schema) = &self.schema {
            assert_eq!(&fs::read(self.table.schema_path()).expect("read schema"), schema);
        }
    }
}
