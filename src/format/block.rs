//! Block file (`data_N`) header.

use super::{le_i32, le_u32};
use crate::error::{BlockfileError, Result};

/// Magic number at the start of every `data_N` file.
pub const BLOCK_MAGIC: u32 = 0xC104_CAC3;

/// Size of the header (including the allocation bitmap) before block 0.
pub const BLOCK_HEADER_SIZE: usize = 8192;

/// Number of leading header bytes [`BlockFileHeader::parse`] needs.
pub const BLOCK_HEADER_PREFIX: usize = 24;

/// The fixed fields of a block file header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockFileHeader {
    /// Magic number (always [`BLOCK_MAGIC`] once parsed)
    pub magic: u32,
    /// Format version
    pub version: u32,
    /// The `N` of this `data_N`
    pub this_file: i16,
    /// Next file of the same block size, 0 if none
    pub next_file: i16,
    /// Block size in bytes
    pub entry_size: i32,
    /// Blocks in use
    pub num_entries: i32,
    /// Block capacity
    pub max_entries: i32,
}

impl BlockFileHeader {
    /// Parse the leading [`BLOCK_HEADER_PREFIX`] bytes of a block file.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < BLOCK_HEADER_PREFIX {
            return Err(BlockfileError::corrupt(format!(
                "block file header is {} bytes, expected at least {}",
                bytes.len(),
                BLOCK_HEADER_PREFIX
            )));
        }
        let magic = le_u32(bytes, 0);
        if magic != BLOCK_MAGIC {
            return Err(BlockfileError::corrupt(format!(
                "block file magic {:#010x} != {:#010x}",
                magic, BLOCK_MAGIC
            )));
        }
        Ok(Self {
            magic,
            version: le_u32(bytes, 4),
            this_file: i16::from_le_bytes([bytes[8], bytes[9]]),
            next_file: i16::from_le_bytes([bytes[10], bytes[11]]),
            entry_size: le_i32(bytes, 12),
            num_entries: le_i32(bytes, 16),
            max_entries: le_i32(bytes, 20),
        })
    }
}
