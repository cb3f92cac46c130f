//! Record access for the hash table and block files.
//!
//! Everything above this module (scanner, resolver, body extraction) reads
//! the cache only through [`RecordStore`], so an alternate backing (an image
//! extracted from a disk dump, an in-memory copy) can be plugged in without
//! touching chain logic.
//!
//! * [`disk`]: [`DiskStore`], scoped read-only access to a cache directory.

pub mod disk;
#[cfg(test)]
pub(crate) mod memory;

pub use disk::DiskStore;

use crate::error::Result;
use crate::format::{CacheAddr, CacheDataStream, CacheEntry};

/// Read access to one cache's table and records.
pub trait RecordStore {
    /// Number of slots in the hash table.
    fn table_len(&self) -> Result<u32>;

    /// Read a single table slot.
    fn read_slot(&self, slot: u32) -> Result<CacheAddr>;

    /// Read every table slot in order.
    fn read_table(&self) -> Result<Vec<CacheAddr>>;

    /// Read the entry record stored at `addr`, including an out-of-line key.
    fn read_entry(&self, addr: CacheAddr) -> Result<CacheEntry>;

    /// Read the raw bytes of a data stream.
    fn read_stream(&self, stream: &CacheDataStream) -> Result<Vec<u8>>;
}

impl<S: RecordStore + ?Sized> RecordStore for &S {
    fn table_len(&self) -> Result<u32> {
        (**self).table_len()
    }

    fn read_slot(&self, slot: u32) -> Result<CacheAddr> {
        (**self).read_slot(slot)
    }

    fn read_table(&self) -> Result<Vec<CacheAddr>> {
        (**self).read_table()
    }

    fn read_entry(&self, addr: CacheAddr) -> Result<CacheEntry> {
        (**self).read_entry(addr)
    }

    fn read_stream(&self, stream: &CacheDataStream) -> Result<Vec<u8>> {
        (**self).read_stream(stream)
    }
}
