//! Packed cache addresses.
//!
//! A [`CacheAddr`] is a 32-bit value naming either a run of blocks inside a
//! `data_N` block file or a whole external `f_XXXXXX` file:
//!
//! ```text
//!  31 | 30..28    | 27..0
//!  1  | file type | external: file number
//!
//!  31 | 30..28    | 27..26 | 25..24       | 23..16      | 15..0
//!  1  | file type | 0      | num blocks-1 | data_N file | start block
//! ```
//!
//! Bit 31 clear means "no record"; a fully zero address terminates chains.

use std::fmt;

use serde::Serialize;

use super::block::BLOCK_HEADER_SIZE;

const INITIALIZED_MASK: u32 = 0x8000_0000;
const FILE_TYPE_MASK: u32 = 0x7000_0000;
const FILE_TYPE_OFFSET: u32 = 28;
const FILE_NAME_MASK: u32 = 0x0FFF_FFFF;
const NUM_BLOCKS_MASK: u32 = 0x0300_0000;
const NUM_BLOCKS_OFFSET: u32 = 24;
const FILE_SELECTOR_MASK: u32 = 0x00FF_0000;
const FILE_SELECTOR_OFFSET: u32 = 16;
const START_BLOCK_MASK: u32 = 0x0000_FFFF;

/// Maximum number of contiguous blocks one address can span.
pub const MAX_BLOCKS: u32 = 4;

/// Kind of file an address points into, with its block size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FileType {
    /// A standalone `f_XXXXXX` file.
    External,
    /// Eviction ranking nodes (36-byte blocks).
    Rankings,
    /// 256-byte blocks; entry records live here.
    Block256,
    /// 1 KiB blocks.
    Block1K,
    /// 4 KiB blocks.
    Block4K,
    /// 8-byte blocks.
    BlockFiles,
    /// 104-byte blocks.
    BlockEntries,
    /// 48-byte blocks.
    BlockEvicted,
}

impl FileType {
    fn from_bits(bits: u32) -> Self {
        match bits & 0x7 {
            0 => Self::External,
            1 => Self::Rankings,
            2 => Self::Block256,
            3 => Self::Block1K,
            4 => Self::Block4K,
            5 => Self::BlockFiles,
            6 => Self::BlockEntries,
            _ => Self::BlockEvicted,
        }
    }

    fn bits(self) -> u32 {
        match self {
            Self::External => 0,
            Self::Rankings => 1,
            Self::Block256 => 2,
            Self::Block1K => 3,
            Self::Block4K => 4,
            Self::BlockFiles => 5,
            Self::BlockEntries => 6,
            Self::BlockEvicted => 7,
        }
    }

    /// Size of one block, or 0 for external files.
    #[must_use]
    pub fn block_size(self) -> u32 {
        match self {
            Self::External => 0,
            Self::Rankings => 36,
            Self::Block256 => 256,
            Self::Block1K => 1024,
            Self::Block4K => 4096,
            Self::BlockFiles => 8,
            Self::BlockEntries => 104,
            Self::BlockEvicted => 48,
        }
    }
}

/// Where an initialized address points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    /// A whole external file.
    External {
        /// Number rendered into the `f_XXXXXX` file name
        file_number: u32,
    },
    /// A run of blocks in a `data_N` file.
    Block {
        /// Block size class
        file_type: FileType,
        /// The `N` in `data_N`
        file_number: u32,
        /// Index of the first block after the file header
        start_block: u32,
        /// Number of contiguous blocks (1..=4)
        num_blocks: u32,
    },
}

impl Location {
    /// File name inside the cache directory.
    #[must_use]
    pub fn file_name(&self) -> String {
        match self {
            Self::External { file_number } => format!("f_{:06x}", file_number),
            Self::Block { file_number, .. } => format!("data_{}", file_number),
        }
    }

    /// Byte offset of the first addressed byte (0 for external files).
    #[must_use]
    pub fn offset(&self) -> u64 {
        match self {
            Self::External { .. } => 0,
            Self::Block {
                file_type,
                start_block,
                ..
            } => BLOCK_HEADER_SIZE as u64 + u64::from(*start_block) * u64::from(file_type.block_size()),
        }
    }

    /// Number of addressable bytes, or `None` for external files whose
    /// length is only known from the file itself.
    #[must_use]
    pub fn len(&self) -> Option<u64> {
        match self {
            Self::External { .. } => None,
            Self::Block {
                file_type,
                num_blocks,
                ..
            } => Some(u64::from(*num_blocks) * u64::from(file_type.block_size())),
        }
    }
}

/// A packed cache address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(transparent)]
pub struct CacheAddr(u32);

impl CacheAddr {
    /// The empty address.
    pub const NULL: Self = Self(0);

    /// Wrap a raw on-disk value.
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Build an address for an external `f_XXXXXX` file.
    #[must_use]
    pub fn for_external(file_number: u32) -> Self {
        Self(INITIALIZED_MASK | (file_number & FILE_NAME_MASK))
    }

    /// Build an address for `num_blocks` blocks of `data_{file_number}`.
    ///
    /// `num_blocks` is clamped to `1..=4`.
    #[must_use]
    pub fn for_block(file_type: FileType, file_number: u8, start_block: u16, num_blocks: u32) -> Self {
        let blocks = num_blocks.clamp(1, MAX_BLOCKS) - 1;
        Self(
            INITIALIZED_MASK
                | (file_type.bits() << FILE_TYPE_OFFSET)
                | (blocks << NUM_BLOCKS_OFFSET)
                | (u32::from(file_number) << FILE_SELECTOR_OFFSET)
                | u32::from(start_block),
        )
    }

    /// The raw on-disk value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Whether the address names a real record (bit 31 set).
    #[must_use]
    pub const fn is_initialized(self) -> bool {
        self.0 & INITIALIZED_MASK != 0
    }

    /// Whether the address is entirely zero.
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    /// The file type bits.
    #[must_use]
    pub fn file_type(self) -> FileType {
        FileType::from_bits((self.0 & FILE_TYPE_MASK) >> FILE_TYPE_OFFSET)
    }

    /// Decode the location, or `None` if the address is not initialized.
    #[must_use]
    pub fn location(self) -> Option<Location> {
        if !self.is_initialized() {
            return None;
        }
        let file_type = self.file_type();
        if file_type == FileType::External {
            return Some(Location::External {
                file_number: self.0 & FILE_NAME_MASK,
            });
        }
        Some(Location::Block {
            file_type,
            file_number: (self.0 & FILE_SELECTOR_MASK) >> FILE_SELECTOR_OFFSET,
            start_block: self.0 & START_BLOCK_MASK,
            num_blocks: ((self.0 & NUM_BLOCKS_MASK) >> NUM_BLOCKS_OFFSET) + 1,
        })
    }
}

impl fmt::Debug for CacheAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CacheAddr({:#010x})", self.0)
    }
}

impl fmt::Display for CacheAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}
