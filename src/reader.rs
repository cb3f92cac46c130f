//! The public reader surface.
//!
//! [`CacheFormat`] is the capability a higher-level cache façade dispatches
//! to; [`BlockfileCache`] implements it for the blockfile format. Other
//! on-disk variants implement the same trait and the caller picks one.
//!
//! # Example
//!
//! ```no_run
//! use blockcache::{BlockfileCache, CacheFormat};
//! use std::path::Path;
//!
//! let cache = BlockfileCache::with_defaults();
//! let dir = Path::new("/home/me/.config/chromium/Default/Cache");
//!
//! if cache.is_cache_directory(dir) {
//!     if let Some(entry) = cache.lookup(dir, "https://example.com/")? {
//!         let body = cache.fetch_body(&entry)?;
//!         println!("{} bytes", body.map_or(0, |b| b.len()));
//!     }
//! }
//! # Ok::<(), blockcache::BlockfileError>(())
//! ```

use std::path::{Path, PathBuf};

use crate::body::{self, HttpHeaders};
use crate::config::{ReaderConfig, ReaderContext};
use crate::error::{BlockfileError, Result};
use crate::format::{CacheEntry, IndexHeader};
use crate::resolve;
use crate::scan::{self, KeyIndex};
use crate::store::{DiskStore, RecordStore};
use crate::validate;

/// Operations a browser disk cache reader offers.
pub trait CacheFormat {
    /// Whether `path` holds a cache of this format. Never fails.
    fn is_cache_directory(&self, path: &Path) -> bool;

    /// Catalogue every key reachable in the cache at `path`.
    fn build_key_index(&self, path: &Path) -> Result<KeyIndex>;

    /// Resolve `key` in the cache at `path`.
    fn lookup(&self, path: &Path, key: &str) -> Result<Option<EntryHandle>>;

    /// Fetch the decoded body of a resolved entry.
    fn fetch_body(&self, entry: &EntryHandle) -> Result<Option<Vec<u8>>>;
}

/// A resolved entry together with the directory it was read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryHandle {
    dir: PathBuf,
    entry: CacheEntry,
}

impl EntryHandle {
    /// The cache directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The entry record.
    #[must_use]
    pub fn entry(&self) -> &CacheEntry {
        &self.entry
    }

    /// Consume the handle into its entry record.
    #[must_use]
    pub fn into_entry(self) -> CacheEntry {
        self.entry
    }
}

/// Reader for blockfile caches.
///
/// Holds only immutable configuration; every operation opens, reads, and
/// releases the files it needs, so one instance can serve many threads.
#[derive(Debug, Clone, Default)]
pub struct BlockfileCache {
    ctx: ReaderContext,
}

impl BlockfileCache {
    /// Create a reader with an explicit context.
    #[must_use]
    pub fn new(ctx: ReaderContext) -> Self {
        Self { ctx }
    }

    /// Create a reader with default configuration.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(ReaderContext::new(ReaderConfig::default()))
    }

    /// The reader's context.
    #[must_use]
    pub fn context(&self) -> &ReaderContext {
        &self.ctx
    }

    /// Parse the index header of the cache at `path`.
    pub fn index_header(&self, path: &Path) -> Result<IndexHeader> {
        Ok(self.open(path)?.header().clone())
    }

    /// Parse the HTTP response headers stored with an entry.
    pub fn response_headers(&self, entry: &EntryHandle) -> Result<Option<HttpHeaders>> {
        let store = DiskStore::open(entry.dir(), &self.ctx)?;
        body::response_headers(&store, entry.entry())
    }

    /// Read the raw, undecoded bytes of stream `index` of an entry.
    pub fn read_stream(&self, entry: &EntryHandle, index: usize) -> Result<Option<Vec<u8>>> {
        let Some(stream) = entry.entry().stream(index) else {
            return Ok(None);
        };
        let store = DiskStore::open(entry.dir(), &self.ctx)?;
        store.read_stream(stream).map(Some)
    }

    fn open(&self, path: &Path) -> Result<DiskStore<'_>> {
        if !validate::is_cache_directory(path, &self.ctx) {
            return Err(BlockfileError::NotACacheDirectory(path.to_path_buf()));
        }
        DiskStore::open(path, &self.ctx)
    }
}

impl CacheFormat for BlockfileCache {
    fn is_cache_directory(&self, path: &Path) -> bool {
        validate::is_cache_directory(path, &self.ctx)
    }

    fn build_key_index(&self, path: &Path) -> Result<KeyIndex> {
        let store = self.open(path)?;
        scan::build_key_index(&store, &self.ctx)
    }

    fn lookup(&self, path: &Path, key: &str) -> Result<Option<EntryHandle>> {
        let store = self.open(path)?;
        Ok(resolve::lookup(&store, key, &self.ctx)?.map(|entry| EntryHandle {
            dir: path.to_path_buf(),
            entry,
        }))
    }

    fn fetch_body(&self, entry: &EntryHandle) -> Result<Option<Vec<u8>>> {
        let store = DiskStore::open(entry.dir(), &self.ctx)?;
        body::extract_body(&store, entry.entry(), &self.ctx)
    }
}
