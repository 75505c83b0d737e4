//! Per-block compression envelope.
//!
//! Block objects of a table with compression enabled carry a 4-byte prefix:
//!
//! ```text
//! +------+----------------------+-------------------------+
//! | flag | original length (LE) | payload                 |
//! | 1 B  | 3 B                  | stored bytes            |
//! +------+----------------------+-------------------------+
//! flag 0: payload is the raw block, length field is 0
//! flag 1: payload is zlib data inflating to exactly `original length` bytes
//! ```
//!
//! The flag is per block: a compressed table may hold raw blocks wherever
//! compression did not pay off.

use std::io::{Read, Write};

use bytes::{BufMut, Bytes, BytesMut};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use stratus_common::constants::{
    ENVELOPE_HEADER_SIZE, MAX_U24, MIN_COMPRESS_LENGTH, RAW_BLOCK_ALIGNMENT,
};
use stratus_common::StratusError;
use thiserror::Error;

/// Flag byte of a block stored raw.
pub const FLAG_RAW: u8 = 0;
/// Flag byte of a block stored compressed.
pub const FLAG_COMPRESSED: u8 = 1;

/// Envelope decoding failures. All of them mean the object is corrupt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvelopeError {
    /// The object is shorter than the envelope header.
    #[error("block of {len} bytes is shorter than the envelope header")]
    Truncated {
        /// Object length.
        len: usize,
    },

    /// The flag byte is neither 0 nor 1.
    #[error("invalid envelope flag {0}")]
    InvalidFlag(u8),

    /// A raw block is not a whole number of 1 KiB units.
    #[error("uncompressed block of {len} bytes is not a multiple of {RAW_BLOCK_ALIGNMENT}")]
    Misaligned {
        /// Payload length.
        len: usize,
    },

    /// The compressed payload could not be inflated.
    #[error("decompression failed: {0}")]
    Decompress(String),

    /// Inflated length differs from the recorded original length.
    #[error("decompressed {actual} bytes, header records {expected}")]
    LengthMismatch {
        /// Length recorded in the envelope.
        expected: usize,
        /// Length actually produced.
        actual: usize,
    },
}

impl From<EnvelopeError> for StratusError {
    fn from(err: EnvelopeError) -> Self {
        StratusError::corruption(err.to_string())
    }
}

/// Block compression codec.
pub trait BlockCompressor: Send + Sync {
    /// Compresses `payload`; `None` means compression did not succeed and the
    /// block is stored raw.
    fn compress(&self, payload: &[u8]) -> Option<Vec<u8>>;

    /// Inflates `stored`, which must produce exactly `original_len` bytes.
    fn decompress(&self, stored: &[u8], original_len: usize) -> Result<Vec<u8>, EnvelopeError>;
}

/// zlib compressor.
///
/// Short payloads, payloads that do not shrink and payloads too long for the
/// 3-byte length field are reported as not compressed.
#[derive(Debug, Clone, Copy)]
pub struct Zlib {
    level: Compression,
}

impl Zlib {
    /// Creates a compressor with the given zlib level (0-9).
    pub fn new(level: u32) -> Self {
        Self {
            level: Compression::new(level),
        }
    }
}

impl Default for Zlib {
    fn default() -> Self {
        Self {
            level: Compression::default(),
        }
    }
}

impl BlockCompressor for Zlib {
    fn compress(&self, payload: &[u8]) -> Option<Vec<u8>> {
        if payload.len() < MIN_COMPRESS_LENGTH || payload.len() > MAX_U24 as usize {
            return None;
        }
        let mut encoder = ZlibEncoder::new(Vec::with_capacity(payload.len() / 2), self.level);
        encoder.write_all(payload).ok()?;
        let compressed = encoder.finish().ok()?;
        (compressed.len() < payload.len()).then_some(compressed)
    }

    fn decompress(&self, stored: &[u8], original_len: usize) -> Result<Vec<u8>, EnvelopeError> {
        let mut out = Vec::with_capacity(original_len);
        // One byte past the expected length is enough to detect an overrun.
        ZlibDecoder::new(stored)
            .take(original_len as u64 + 1)
            .read_to_end(&mut out)
            .map_err(|e| EnvelopeError::Decompress(e.to_string()))?;
        if out.len() != original_len {
            return Err(EnvelopeError::LengthMismatch {
                expected: original_len,
                actual: out.len(),
            });
        }
        Ok(out)
    }
}

/// Decoded envelope header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvelopeHeader {
    /// Flag byte.
    pub flag: u8,
    /// Original length; 0 for raw blocks.
    pub original_length: u32,
}

impl EnvelopeHeader {
    /// Parses the first four bytes of a block object.
    pub fn parse(raw: &[u8]) -> Result<Self, EnvelopeError> {
        if raw.len() < ENVELOPE_HEADER_SIZE {
            return Err(EnvelopeError::Truncated { len: raw.len() });
        }
        Ok(Self {
            flag: raw[0],
            original_length: u32::from_le_bytes([raw[1], raw[2], raw[3], 0]),
        })
    }

    /// Returns true if the payload is compressed.
    #[inline]
    pub fn is_compressed(&self) -> bool {
        self.flag == FLAG_COMPRESSED
    }

    fn write(&self, buf: &mut BytesMut) {
        buf.put_u8(self.flag);
        buf.put_slice(&self.original_length.to_le_bytes()[..3]);
    }
}

/// Encodes a block with the default zlib compressor.
pub fn encode(payload: Bytes, compression_requested: bool) -> Bytes {
    encode_with(&Zlib::default(), payload, compression_requested)
}

/// Encodes a block.
///
/// Without compression the payload is stored as is, with no envelope.
pub fn encode_with(
    compressor: &dyn BlockCompressor,
    payload: Bytes,
    compression_requested: bool,
) -> Bytes {
    if !compression_requested {
        return payload;
    }

    let (header, body) = match compressor.compress(&payload) {
        Some(compressed) => (
            EnvelopeHeader {
                flag: FLAG_COMPRESSED,
                original_length: payload.len() as u32,
            },
            Bytes::from(compressed),
        ),
        None => (
            EnvelopeHeader {
                flag: FLAG_RAW,
                original_length: 0,
            },
            payload,
        ),
    };

    let mut buf = BytesMut::with_capacity(ENVELOPE_HEADER_SIZE + body.len());
    header.write(&mut buf);
    buf.put_slice(&body);
    buf.freeze()
}

/// Decodes a block with the default zlib compressor.
pub fn decode(raw: Bytes, compression_expected: bool) -> Result<Bytes, EnvelopeError> {
    decode_with(&Zlib::default(), raw, compression_expected)
}

/// Decodes a block object back to the local block bytes.
pub fn decode_with(
    compressor: &dyn BlockCompressor,
    raw: Bytes,
    compression_expected: bool,
) -> Result<Bytes, EnvelopeError> {
    if !compression_expected {
        return Ok(raw);
    }

    let header = EnvelopeHeader::parse(&raw)?;
    let payload = raw.slice(ENVELOPE_HEADER_SIZE..);
    match header.flag {
        FLAG_RAW => {
            if payload.len() % RAW_BLOCK_ALIGNMENT != 0 {
                return Err(EnvelopeError::Misaligned { len: payload.len() });
            }
            Ok(payload)
        }
        FLAG_COMPRESSED => compressor
            .decompress(&payload, header.original_length as usize)
            .map(Bytes::from),
        other => Err(EnvelopeError::InvalidFlag(other)),
    }
}
