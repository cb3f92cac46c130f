//! Chain walking and the full key catalogue.
//!
//! Each populated table slot heads a singly linked chain of entry records
//! connected by their `next` addresses. [`ChainWalk`] yields every record of
//! one chain, head to terminal record; [`build_key_index`] runs one walk per
//! populated slot and collects every key it sees.
//!
//! # Example
//!
//! ```no_run
//! use blockcache::config::ReaderContext;
//! use blockcache::scan::build_key_index;
//! use blockcache::store::DiskStore;
//! use std::path::Path;
//!
//! let ctx = ReaderContext::default();
//! let store = DiskStore::open(Path::new("Cache"), &ctx)?;
//! let index = build_key_index(&store, &ctx)?;
//! for (key, record) in index.iter() {
//!     println!("{} created {:?}", key, record.created_at());
//! }
//! # Ok::<(), blockcache::BlockfileError>(())
//! ```

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use crate::config::ReaderContext;
use crate::error::{BlockfileError, Result};
use crate::format::index::time_from_internal;
use crate::format::{CacheAddr, CacheEntry};
use crate::store::RecordStore;

/// Iterator over the records of one collision chain.
///
/// Ends when a record's `next` is not an initialized address. Yields an error
/// (and then stops) if a record cannot be read, an address repeats, or the
/// walk exceeds its step limit. Restart a walk by constructing a new one
/// from the same head.
pub struct ChainWalk<'s, S: RecordStore + ?Sized> {
    store: &'s S,
    next: CacheAddr,
    visited: HashSet<CacheAddr>,
    max_steps: usize,
    done: bool,
}

impl<'s, S: RecordStore + ?Sized> ChainWalk<'s, S> {
    /// Walk the chain starting at `head`, visiting at most `max_steps` records.
    pub fn new(store: &'s S, head: CacheAddr, max_steps: usize) -> Self {
        Self {
            store,
            next: head,
            visited: HashSet::new(),
            max_steps,
            done: false,
        }
    }

    /// Number of records yielded so far.
    #[must_use]
    pub fn steps(&self) -> usize {
        self.visited.len()
    }

    fn fail(&mut self, err: BlockfileError) -> Option<Result<CacheEntry>> {
        self.done = true;
        Some(Err(err))
    }
}

impl<S: RecordStore + ?Sized> Iterator for ChainWalk<'_, S> {
    type Item = Result<CacheEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || !self.next.is_initialized() {
            return None;
        }
        let addr = self.next;

        if self.visited.len() >= self.max_steps {
            return self.fail(BlockfileError::corrupt(format!(
                "chain longer than {} records at {}",
                self.max_steps, addr
            )));
        }
        if !self.visited.insert(addr) {
            return self.fail(BlockfileError::corrupt(format!(
                "chain cycle: {} visited twice",
                addr
            )));
        }

        match self.store.read_entry(addr) {
            Ok(entry) => {
                self.next = entry.next;
                Some(Ok(entry))
            }
            Err(e) => self.fail(e),
        }
    }
}

/// Key and creation time of one catalogued entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyRecord {
    /// The key, decoded as UTF-8 with invalid sequences replaced
    pub key: String,
    /// The key exactly as stored
    #[serde(skip)]
    pub raw_key: Vec<u8>,
    /// Creation time, microseconds since 1601-01-01 UTC
    pub creation_time: u64,
}

impl KeyRecord {
    fn from_entry(entry: &CacheEntry) -> Self {
        Self {
            key: entry.key_str().into_owned(),
            raw_key: entry.key.clone(),
            creation_time: entry.creation_time,
        }
    }

    /// Creation time as a UTC timestamp.
    #[must_use]
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        time_from_internal(self.creation_time)
    }
}

/// Snapshot of every key reachable from the hash table.
///
/// Keys are told apart by their stored bytes, so two keys that are not valid
/// UTF-8 and decode to the same replacement string are still counted twice.
/// Built fresh by each scan and owned by the caller; nothing refers back to
/// the cache files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyIndex {
    entries: HashMap<Vec<u8>, KeyRecord>,
}

impl KeyIndex {
    /// Number of distinct keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no keys were found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up a key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&KeyRecord> {
        self.get_raw(key.as_bytes())
    }

    /// Look up a key by its stored bytes.
    #[must_use]
    pub fn get_raw(&self, key: &[u8]) -> Option<&KeyRecord> {
        self.entries.get(key)
    }

    /// Whether `key` was found.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key.as_bytes())
    }

    /// Iterate over `(key, record)` pairs in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &KeyRecord)> {
        self.entries.values().map(|record| (record.key.as_str(), record))
    }

    /// All keys, sorted.
    #[must_use]
    pub fn sorted_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.entries.values().map(|r| r.key.as_str()).collect();
        keys.sort_unstable();
        keys
    }

    /// Consume the index into its map, keyed by stored key bytes.
    #[must_use]
    pub fn into_inner(self) -> HashMap<Vec<u8>, KeyRecord> {
        self.entries
    }

    /// Serialize as a JSON object keyed by cache key.
    ///
    /// Non-UTF-8 keys appear in their lossy form.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    fn insert(&mut self, entry: &CacheEntry) {
        let record = KeyRecord::from_entry(entry);
        self.entries.insert(record.raw_key.clone(), record);
    }
}

impl Serialize for KeyIndex {
    fn serialize<Ser: Serializer>(&self, serializer: Ser) -> std::result::Result<Ser::Ok, Ser::Error> {
        serializer.collect_map(self.entries.values().map(|record| (&record.key, record)))
    }
}

/// Walk every populated slot and catalogue every reachable entry.
///
/// Any read error or corruption aborts the scan; a partial catalogue is
/// never returned.
pub fn build_key_index<S: RecordStore + ?Sized>(store: &S, ctx: &ReaderContext) -> Result<KeyIndex> {
    let table = store.read_table()?;
    let max_steps = ctx.config().max_chain_length;
    let mut index = KeyIndex::default();
    let mut populated = 0usize;
    let mut records = 0usize;

    for (slot, head) in table.iter().enumerate() {
        if !head.is_initialized() {
            continue;
        }
        populated += 1;
        for entry in ChainWalk::new(store, *head, max_steps) {
            let entry = entry.map_err(|e| {
                log::debug!(target: ctx.target(), "Scan aborted in slot {}: {}", slot, e);
                e
            })?;
            index.insert(&entry);
            records += 1;
        }
    }

    log::info!(
        target: ctx.target(),
        "Scanned {} slots: {} populated, {} records, {} distinct keys",
        table.len(),
        populated,
        records,
        index.len()
    );
    Ok(index)
}
