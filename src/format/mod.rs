//! Bit-exact layouts of the blockfile cache format.
//!
//! All multi-byte fields are little-endian.
//!
//! ```text
//! index                          data_N (block files)
//! ┌──────────────────────┐       ┌──────────────────────────┐
//! │ header (368 bytes)   │       │ header (8192 bytes)      │
//! │ magic 0xC103CAC3     │       │ magic 0xC104CAC3         │
//! ├──────────────────────┤       ├──────────────────────────┤
//! │ table[table_len]     │──────▶│ block 0 │ block 1 │ ...  │
//! │ one CacheAddr / slot │       └──────────────────────────┘
//! └──────────────────────┘        f_XXXXXX: external streams
//! ```
//!
//! - [`addr`]: packed 32-bit addresses
//! - [`hash`]: key hash selecting a table slot
//! - [`index`]: index file header and slot arithmetic
//! - [`block`]: block file header
//! - [`entry`]: entry records, data stream descriptors

pub mod addr;
pub mod block;
pub mod entry;
pub mod hash;
pub mod index;

pub use addr::{CacheAddr, FileType, Location};
pub use block::{BlockFileHeader, BLOCK_HEADER_SIZE, BLOCK_MAGIC};
pub use entry::{CacheDataStream, CacheEntry, EntryState, StreamKind};
pub use hash::super_fast_hash;
pub use index::{slot_for_hash, IndexHeader, INDEX_HEADER_SIZE, INDEX_MAGIC};

/// Read a little-endian `u32` at `offset`. The caller guarantees bounds.
pub(crate) fn le_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

pub(crate) fn le_i32(bytes: &[u8], offset: usize) -> i32 {
    le_u32(bytes, offset) as i32
}

pub(crate) fn le_u64(bytes: &[u8], offset: usize) -> u64 {
    u64::from(le_u32(bytes, offset)) | (u64::from(le_u32(bytes, offset + 4)) << 32)
}
