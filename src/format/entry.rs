//! Entry records and their data stream descriptors.
//!
//! An entry occupies one to four 256-byte blocks of a block file:
//!
//! ```text
//! 0   hash            u32     40  data_size[4]   i32 x4
//! 4   next            addr    56  data_addr[4]   addr x4
//! 8   rankings_node   addr    72  flags          u32
//! 12  reuse_count     i32     76  pad            u32 x4
//! 16  refetch_count   i32     92  self_hash      u32
//! 20  state           i32     96  key bytes (inline, up to the record end)
//! 24  creation_time   u64
//! 32  key_len         i32
//! 36  long_key        addr
//! ```

use std::borrow::Cow;

use chrono::{DateTime, Utc};

use super::addr::CacheAddr;
use super::index::time_from_internal;
use super::{le_i32, le_u32, le_u64};
use crate::error::{BlockfileError, Result};

/// Size of one entry block.
pub const ENTRY_BLOCK_SIZE: usize = 256;

/// Offset of the inline key within an entry record.
pub const KEY_OFFSET: usize = 96;

/// Number of data streams an entry can reference.
pub const NUM_STREAMS: usize = 4;

/// Lifecycle state recorded by the writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    /// Live entry.
    Normal,
    /// Evicted; only the key and rankings survive.
    Evicted,
    /// Marked for deletion.
    Doomed,
    /// A value this reader does not know.
    Unknown(i32),
}

impl EntryState {
    fn from_raw(raw: i32) -> Self {
        match raw {
            0 => Self::Normal,
            1 => Self::Evicted,
            2 => Self::Doomed,
            other => Self::Unknown(other),
        }
    }
}

/// Role of a data stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    /// Serialized HTTP response info, including the raw header block.
    HttpHeader,
    /// Opaque bytes: the body, or side data written by the browser.
    Unknown,
}

impl StreamKind {
    /// The HTTP cache writes response info into stream 0 and payloads after it.
    #[must_use]
    pub fn for_index(index: usize) -> Self {
        if index == 0 {
            Self::HttpHeader
        } else {
            Self::Unknown
        }
    }
}

/// A typed pointer to one contiguous stored byte range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheDataStream {
    /// Stream slot in the entry (0..4)
    pub index: usize,
    /// Role of the stream
    pub kind: StreamKind,
    /// Recorded length in bytes
    pub size: u32,
    /// Where the bytes live
    pub addr: CacheAddr,
}

/// A stored record reached through the hash table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// Address this entry was read from
    pub address: CacheAddr,
    /// Hash of the key as computed by the writer
    pub hash: u32,
    /// Next entry in the same slot's chain
    pub next: CacheAddr,
    /// Eviction ranking node
    pub rankings_node: CacheAddr,
    /// Times the entry was reused
    pub reuse_count: i32,
    /// Times the entry was refetched
    pub refetch_count: i32,
    /// Writer-side lifecycle state
    pub state: EntryState,
    /// Creation time, microseconds since 1601-01-01 UTC
    pub creation_time: u64,
    /// Key bytes (usually a URL, possibly with a partition prefix)
    pub key: Vec<u8>,
    /// Populated data streams, in slot order
    pub streams: Vec<CacheDataStream>,
    /// Writer flags
    pub flags: u32,
}

impl CacheEntry {
    /// The key decoded as UTF-8, replacing invalid sequences.
    #[must_use]
    pub fn key_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.key)
    }

    /// Creation time as a UTC timestamp.
    #[must_use]
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        time_from_internal(self.creation_time)
    }

    /// The first stream carrying HTTP response info.
    #[must_use]
    pub fn header_stream(&self) -> Option<&CacheDataStream> {
        self.streams.iter().find(|s| s.kind == StreamKind::HttpHeader)
    }

    /// The first opaque stream, which holds the body.
    #[must_use]
    pub fn body_stream(&self) -> Option<&CacheDataStream> {
        self.streams.iter().find(|s| s.kind == StreamKind::Unknown)
    }

    /// The stream stored in slot `index`, if populated.
    #[must_use]
    pub fn stream(&self, index: usize) -> Option<&CacheDataStream> {
        self.streams.iter().find(|s| s.index == index)
    }
}

/// An entry record as laid out on disk, before any out-of-line key is read.
#[derive(Debug, Clone)]
pub struct EntryRecord {
    /// The entry; `key` is empty when `long_key` is set.
    pub entry: CacheEntry,
    /// Address and length of a key stored outside the record.
    pub long_key: Option<(CacheAddr, usize)>,
}

impl EntryRecord {
    /// Parse an entry record read from `address`.
    ///
    /// `bytes` must cover every block the address spans.
    pub fn parse(address: CacheAddr, bytes: &[u8]) -> Result<Self> {
        if bytes.len() < ENTRY_BLOCK_SIZE {
            return Err(BlockfileError::corrupt(format!(
                "entry at {} is {} bytes, expected at least {}",
                address,
                bytes.len(),
                ENTRY_BLOCK_SIZE
            )));
        }

        let key_len = le_i32(bytes, 32);
        let key_len = usize::try_from(key_len).map_err(|_| {
            BlockfileError::corrupt(format!("entry at {} has key length {}", address, key_len))
        })?;
        let long_key_addr = CacheAddr::new(le_u32(bytes, 36));

        let (key, long_key) = if long_key_addr.is_initialized() {
            (Vec::new(), Some((long_key_addr, key_len)))
        } else {
            let end = KEY_OFFSET + key_len;
            if end > bytes.len() {
                return Err(BlockfileError::corrupt(format!(
                    "entry at {} has a {}-byte inline key but only {} bytes of record",
                    address,
                    key_len,
                    bytes.len() - KEY_OFFSET
                )));
            }
            (bytes[KEY_OFFSET..end].to_vec(), None)
        };

        let mut streams = Vec::with_capacity(NUM_STREAMS);
        for index in 0..NUM_STREAMS {
            let size = le_i32(bytes, 40 + index * 4);
            let addr = CacheAddr::new(le_u32(bytes, 56 + index * 4));
            if size < 0 {
                return Err(BlockfileError::corrupt(format!(
                    "entry at {} has negative size {} for stream {}",
                    address, size, index
                )));
            }
            if size == 0 || !addr.is_initialized() {
                continue;
            }
            streams.push(CacheDataStream {
                index,
                kind: StreamKind::for_index(index),
                size: size as u32,
                addr,
            });
        }

        Ok(Self {
            entry: CacheEntry {
                address,
                hash: le_u32(bytes, 0),
                next: CacheAddr::new(le_u32(bytes, 4)),
                rankings_node: CacheAddr::new(le_u32(bytes, 8)),
                reuse_count: le_i32(bytes, 12),
                refetch_count: le_i32(bytes, 16),
                state: EntryState::from_raw(le_i32(bytes, 20)),
                creation_time: le_u64(bytes, 24),
                key,
                streams,
                flags: le_u32(bytes, 72),
            },
            long_key,
        })
    }
}
