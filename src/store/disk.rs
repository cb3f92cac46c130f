//! [`RecordStore`] over a cache directory on disk.
//!
//! Every read opens the file it needs read-only, seeks, reads, and drops the
//! handle before returning. Nothing is locked: the browser that owns the
//! cache may keep writing while we read, and a handle must never outlive the
//! call that opened it.

use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use super::RecordStore;
use crate::config::ReaderContext;
use crate::error::{BlockfileError, Result};
use crate::format::block::BLOCK_HEADER_PREFIX;
use crate::format::entry::EntryRecord;
use crate::format::index::slot_offset;
use crate::format::{
    BlockFileHeader, CacheAddr, CacheDataStream, CacheEntry, FileType, IndexHeader, Location,
    INDEX_HEADER_SIZE,
};

/// Name of the index file inside a cache directory.
pub const INDEX_FILE: &str = "index";

/// Name of the first block file, whose presence marks a cache directory.
pub const FIRST_BLOCK_FILE: &str = "data_0";

/// Read buffer for streaming the hash table.
const TABLE_CHUNK: usize = 64 * 1024;

/// Scoped, read-only access to one cache directory.
///
/// The index header is read once by [`DiskStore::open`]; a store is meant to
/// live for a single reader operation.
#[derive(Debug)]
pub struct DiskStore<'a> {
    dir: PathBuf,
    header: IndexHeader,
    ctx: &'a ReaderContext,
}

impl<'a> DiskStore<'a> {
    /// Read the index header of `dir`.
    pub fn open(dir: &Path, ctx: &'a ReaderContext) -> Result<Self> {
        let index_path = dir.join(INDEX_FILE);
        let bytes = read_exact_at(&index_path, 0, INDEX_HEADER_SIZE)?;
        let header = IndexHeader::parse(&bytes)?;
        let (major, minor) = header.version_parts();
        log::debug!(
            target: ctx.target(),
            "Opened cache {} (version {}.{}, {} slots, {} entries)",
            dir.display(),
            major,
            minor,
            header.table_len(),
            header.num_entries
        );
        Ok(Self {
            dir: dir.to_path_buf(),
            header,
            ctx,
        })
    }

    /// The cache directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The parsed index header.
    #[must_use]
    pub fn header(&self) -> &IndexHeader {
        &self.header
    }

    fn index_path(&self) -> PathBuf {
        self.dir.join(INDEX_FILE)
    }

    /// Read `len` bytes at `addr`, which may name block storage or an
    /// external file.
    fn read_addr(&self, addr: CacheAddr, len: usize) -> Result<Vec<u8>> {
        let location = addr
            .location()
            .ok_or_else(|| BlockfileError::corrupt(format!("address {} is not initialized", addr)))?;
        let path = self.dir.join(location.file_name());

        match location {
            Location::External { .. } => self.read_external(&path, addr, len),
            Location::Block { file_type, .. } => {
                let capacity = location.len().unwrap_or(0);
                if len as u64 > capacity {
                    return Err(BlockfileError::corrupt(format!(
                        "{} bytes requested at {} but the address spans {}",
                        len, addr, capacity
                    )));
                }
                let mut file = open_cache_file(&path, addr)?;
                let mut prefix = [0u8; BLOCK_HEADER_PREFIX];
                file.read_exact(&mut prefix)
                    .map_err(|e| BlockfileError::io(&path, e))?;
                let header = BlockFileHeader::parse(&prefix)?;
                if header.entry_size != file_type.block_size() as i32 {
                    return Err(BlockfileError::corrupt(format!(
                        "address {} expects {}-byte blocks but {} holds {}-byte blocks",
                        addr,
                        file_type.block_size(),
                        path.display(),
                        header.entry_size
                    )));
                }
                read_from(&mut file, &path, location.offset(), len)
            }
        }
    }

    /// External files may be shorter than recorded while the owner is still
    /// writing them; return what is there.
    fn read_external(&self, path: &Path, addr: CacheAddr, len: usize) -> Result<Vec<u8>> {
        let file = open_cache_file(path, addr)?;
        let file_len = file.metadata().map_err(|e| BlockfileError::io(path, e))?.len();
        let mut buf = Vec::with_capacity(len.min(usize::try_from(file_len).unwrap_or(usize::MAX)));
        file.take(len as u64)
            .read_to_end(&mut buf)
            .map_err(|e| BlockfileError::io(path, e))?;
        if buf.len() < len {
            log::debug!(
                target: self.ctx.target(),
                "{} holds {} of {} recorded bytes",
                path.display(),
                buf.len(),
                len
            );
        }
        Ok(buf)
    }

    fn check_stream_size(&self, len: u64, what: &str, addr: CacheAddr) -> Result<()> {
        let limit = self.ctx.config().max_stream_size;
        if len > limit {
            return Err(BlockfileError::corrupt(format!(
                "{} at {} is {} bytes, above the {} byte limit",
                what, addr, len, limit
            )));
        }
        Ok(())
    }
}

impl RecordStore for DiskStore<'_> {
    fn table_len(&self) -> Result<u32> {
        Ok(self.header.table_len())
    }

    fn read_slot(&self, slot: u32) -> Result<CacheAddr> {
        let table_len = self.header.table_len();
        if slot >= table_len {
            return Err(BlockfileError::corrupt(format!(
                "slot {} outside a table of {} slots",
                slot, table_len
            )));
        }
        let bytes = read_exact_at(&self.index_path(), slot_offset(slot), 4)?;
        Ok(CacheAddr::new(u32::from_le_bytes([
            bytes[0], bytes[1], bytes[2], bytes[3],
        ])))
    }

    fn read_table(&self) -> Result<Vec<CacheAddr>> {
        // The slot count comes from the header and is untrusted: slots are
        // streamed and the buffer only grows with bytes actually present.
        let path = self.index_path();
        let table_len = self.header.table_len() as usize;
        let file = File::open(&path).map_err(|e| BlockfileError::io(&path, e))?;
        let file_len = file
            .metadata()
            .map_err(|e| BlockfileError::io(&path, e))?
            .len();
        let available = file_len.saturating_sub(slot_offset(0)) / 4;

        let mut reader = BufReader::with_capacity(TABLE_CHUNK, file);
        reader
            .seek(SeekFrom::Start(slot_offset(0)))
            .map_err(|e| BlockfileError::io(&path, e))?;

        let mut table = Vec::with_capacity(table_len.min(usize::try_from(available).unwrap_or(usize::MAX)));
        let mut slot = [0u8; 4];
        for _ in 0..table_len {
            reader
                .read_exact(&mut slot)
                .map_err(|e| BlockfileError::io(&path, e))?;
            table.push(CacheAddr::new(u32::from_le_bytes(slot)));
        }
        Ok(table)
    }

    fn read_entry(&self, addr: CacheAddr) -> Result<CacheEntry> {
        let location = addr
            .location()
            .ok_or_else(|| BlockfileError::corrupt(format!("entry address {} is not initialized", addr)))?;
        if addr.file_type() != FileType::Block256 {
            return Err(BlockfileError::corrupt(format!(
                "entry address {} points into {:?} storage",
                addr,
                addr.file_type()
            )));
        }
        let len = location.len().unwrap_or(0) as usize;
        let bytes = self.read_addr(addr, len)?;
        let record = EntryRecord::parse(addr, &bytes)?;
        let mut entry = record.entry;

        if let Some((key_addr, key_len)) = record.long_key {
            self.check_stream_size(key_len as u64, "long key", key_addr)?;
            entry.key = self.read_addr(key_addr, key_len)?;
        }

        log::trace!(
            target: self.ctx.target(),
            "Read entry {} (hash {:#010x}, next {})",
            addr,
            entry.hash,
            entry.next
        );
        Ok(entry)
    }

    fn read_stream(&self, stream: &CacheDataStream) -> Result<Vec<u8>> {
        self.check_stream_size(u64::from(stream.size), "stream", stream.addr)?;
        self.read_addr(stream.addr, stream.size as usize)
    }
}

/// Open a file named by `addr`; a missing file means the address is bogus.
fn open_cache_file(path: &Path, addr: CacheAddr) -> Result<File> {
    File::open(path).map_err(|e| {
        if e.kind() == io::ErrorKind::NotFound {
            BlockfileError::corrupt(format!(
                "address {} refers to missing file {}",
                addr,
                path.display()
            ))
        } else {
            BlockfileError::io(path, e)
        }
    })
}

fn read_from(file: &mut File, path: &Path, offset: u64, len: usize) -> Result<Vec<u8>> {
    file.seek(SeekFrom::Start(offset))
        .map_err(|e| BlockfileError::io(path, e))?;
    let mut buf = vec![0u8; len];
    file.read_exact(&mut buf)
        .map_err(|e| BlockfileError::io(path, e))?;
    Ok(buf)
}

/// Open `path`, read exactly `len` bytes at `offset`, and close it.
pub(crate) fn read_exact_at(path: &Path, offset: u64, len: usize) -> Result<Vec<u8>> {
    let mut file = File::open(path).map_err(|e| BlockfileError::io(path, e))?;
    read_from(&mut file, path, offset, len)
}
