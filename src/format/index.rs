//! Index file header and hash table arithmetic.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::addr::CacheAddr;
use super::{le_i32, le_u32, le_u64};
use crate::error::{BlockfileError, Result};

/// Magic number at the start of the `index` file.
pub const INDEX_MAGIC: u32 = 0xC103_CAC3;

/// Size of the header region preceding the hash table (92 words).
pub const INDEX_HEADER_SIZE: usize = 368;

/// Table size used by writers that leave `table_len` zero.
pub const DEFAULT_TABLE_LEN: u32 = 0x10000;

/// Microseconds between 1601-01-01 and 1970-01-01.
const WINDOWS_EPOCH_DELTA_MICROS: i64 = 11_644_473_600_000_000;

/// Parsed `index` file header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexHeader {
    /// Magic number (always [`INDEX_MAGIC`] once parsed)
    pub magic: u32,
    /// Format version, `major << 16 | minor`
    pub version: u32,
    /// Number of entries the writer believes are stored
    pub num_entries: i32,
    /// Total stored bytes according to the writer
    pub num_bytes: i32,
    /// Highest external file number handed out
    pub last_file: i32,
    /// Writer instance id
    pub this_id: i32,
    /// Address of the stats record
    pub stats: CacheAddr,
    /// Raw table length field (0 means default)
    pub table_len_raw: i32,
    /// Non-zero if the writer crashed while the cache was open
    pub crash: i32,
    /// Experiment id
    pub experiment: i32,
    /// Creation time, microseconds since 1601-01-01 UTC
    pub create_time: u64,
}

impl IndexHeader {
    /// Parse the first [`INDEX_HEADER_SIZE`] bytes of an `index` file.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < INDEX_HEADER_SIZE {
            return Err(BlockfileError::corrupt(format!(
                "index header is {} bytes, expected {}",
                bytes.len(),
                INDEX_HEADER_SIZE
            )));
        }
        let magic = le_u32(bytes, 0);
        if magic != INDEX_MAGIC {
            return Err(BlockfileError::corrupt(format!(
                "index magic {:#010x} != {:#010x}",
                magic, INDEX_MAGIC
            )));
        }
        let table_len_raw = le_i32(bytes, 28);
        if table_len_raw < 0 {
            return Err(BlockfileError::corrupt(format!(
                "negative table length {}",
                table_len_raw
            )));
        }

        Ok(Self {
            magic,
            version: le_u32(bytes, 4),
            num_entries: le_i32(bytes, 8),
            num_bytes: le_i32(bytes, 12),
            last_file: le_i32(bytes, 16),
            this_id: le_i32(bytes, 20),
            stats: CacheAddr::new(le_u32(bytes, 24)),
            table_len_raw,
            crash: le_i32(bytes, 32),
            experiment: le_i32(bytes, 36),
            create_time: le_u64(bytes, 40),
        })
    }

    /// Effective number of slots in the hash table.
    #[must_use]
    pub fn table_len(&self) -> u32 {
        if self.table_len_raw == 0 {
            DEFAULT_TABLE_LEN
        } else {
            self.table_len_raw as u32
        }
    }

    /// `(major, minor)` format version.
    #[must_use]
    pub fn version_parts(&self) -> (u16, u16) {
        ((self.version >> 16) as u16, (self.version & 0xFFFF) as u16)
    }

    /// Creation time as a UTC timestamp.
    #[must_use]
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        time_from_internal(self.create_time)
    }
}

/// Select the table slot for a key hash.
///
/// Tables are powers of two in every writer seen in practice, so the hash is
/// masked; other sizes fall back to a modulo.
#[must_use]
pub fn slot_for_hash(hash: u32, table_len: u32) -> u32 {
    if table_len.is_power_of_two() {
        hash & (table_len - 1)
    } else {
        hash % table_len.max(1)
    }
}

/// Byte offset of `slot` in the `index` file.
#[must_use]
pub fn slot_offset(slot: u32) -> u64 {
    INDEX_HEADER_SIZE as u64 + u64::from(slot) * 4
}

/// Convert a cache timestamp (microseconds since 1601) to UTC.
///
/// Zero means "unset" and yields `None`.
#[must_use]
pub fn time_from_internal(micros: u64) -> Option<DateTime<Utc>> {
    if micros == 0 {
        return None;
    }
    let unix_micros = i64::try_from(micros).ok()? - WINDOWS_EPOCH_DELTA_MICROS;
    let secs = unix_micros.div_euclid(1_000_000);
    let nanos = (unix_micros.rem_euclid(1_000_000) * 1_000) as u32;
    DateTime::from_timestamp(secs, nanos)
}
