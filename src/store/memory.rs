//! In-memory [`RecordStore`] that counts every read, for unit tests.

use std::cell::Cell;
use std::collections::HashMap;

use super::RecordStore;
use crate::error::{BlockfileError, Result};
use crate::format::{
    super_fast_hash, CacheAddr, CacheDataStream, CacheEntry, EntryState, FileType, StreamKind,
};

#[derive(Debug, Default)]
pub(crate) struct MemoryStore {
    pub table: Vec<CacheAddr>,
    pub entries: HashMap<CacheAddr, CacheEntry>,
    pub streams: HashMap<CacheAddr, Vec<u8>>,
    pub slot_reads: Cell<usize>,
    pub table_reads: Cell<usize>,
    pub entry_reads: Cell<usize>,
    next_block: u16,
}

impl MemoryStore {
    pub fn new(table_len: usize) -> Self {
        Self {
            table: vec![CacheAddr::NULL; table_len],
            ..Default::default()
        }
    }

    fn allocate(&mut self, file_type: FileType) -> CacheAddr {
        self.next_block += 1;
        CacheAddr::for_block(file_type, 1, self.next_block, 1)
    }

    /// Add an entry with an explicit hash; `next` is left null.
    pub fn add_entry(&mut self, key: &str, hash: u32, creation_time: u64) -> CacheAddr {
        let address = self.allocate(FileType::Block256);
        self.entries.insert(
            address,
            CacheEntry {
                address,
                hash,
                next: CacheAddr::NULL,
                rankings_node: CacheAddr::NULL,
                reuse_count: 0,
                refetch_count: 0,
                state: EntryState::Normal,
                creation_time,
                key: key.as_bytes().to_vec(),
                streams: Vec::new(),
                flags: 0,
            },
        );
        address
    }

    /// Add an entry and chain it at the tail of its slot.
    pub fn insert(&mut self, key: &str, creation_time: u64) -> CacheAddr {
        let hash = super_fast_hash(key.as_bytes());
        let address = self.add_entry(key, hash, creation_time);
        let slot = crate::format::slot_for_hash(hash, self.table.len() as u32) as usize;
        self.append_to_slot(slot, address);
        address
    }

    pub fn append_to_slot(&mut self, slot: usize, address: CacheAddr) {
        let head = self.table[slot];
        if head.is_null() {
            self.table[slot] = address;
            return;
        }
        let mut tail = head;
        while !self.entries[&tail].next.is_null() {
            tail = self.entries[&tail].next;
        }
        self.link(tail, address);
    }

    pub fn link(&mut self, from: CacheAddr, to: CacheAddr) {
        if let Some(entry) = self.entries.get_mut(&from) {
            entry.next = to;
        }
    }

    pub fn add_stream(&mut self, entry: CacheAddr, index: usize, data: &[u8]) {
        let addr = self.allocate(FileType::Block1K);
        self.streams.insert(addr, data.to_vec());
        if let Some(entry) = self.entries.get_mut(&entry) {
            entry.streams.push(CacheDataStream {
                index,
                kind: StreamKind::for_index(index),
                size: data.len() as u32,
                addr,
            });
            entry.streams.sort_by_key(|s| s.index);
        }
    }
}

impl RecordStore for MemoryStore {
    fn table_len(&self) -> Result<u32> {
        Ok(self.table.len() as u32)
    }

    fn read_slot(&self, slot: u32) -> Result<CacheAddr> {
        self.slot_reads.set(self.slot_reads.get() + 1);
        self.table
            .get(slot as usize)
            .copied()
            .ok_or_else(|| BlockfileError::corrupt(format!("slot {} out of range", slot)))
    }

    fn read_table(&self) -> Result<Vec<CacheAddr>> {
        self.table_reads.set(self.table_reads.get() + 1);
        Ok(self.table.clone())
    }

    fn read_entry(&self, addr: CacheAddr) -> Result<CacheEntry> {
        self.entry_reads.set(self.entry_reads.get() + 1);
        self.entries
            .get(&addr)
            .cloned()
            .ok_or_else(|| BlockfileError::corrupt(format!("no entry at {}", addr)))
    }

    fn read_stream(&self, stream: &CacheDataStream) -> Result<Vec<u8>> {
        self.streams
            .get(&stream.addr)
            .cloned()
            .ok_or_else(|| BlockfileError::corrupt(format!("no stream at {}", stream.addr)))
    }
}
