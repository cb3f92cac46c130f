//! blockcache - Blockfile Disk Cache Reader
//!
//! A read-only reader for the hash-indexed, block-file-based disk cache that
//! Chromium-family browsers keep on disk: recognize a cache directory,
//! catalogue or look up its keys through the on-disk hash table, and return
//! stored bodies with their `Content-Encoding` reversed.
//!
//! The cache may be owned and written by a running browser while it is read;
//! files are only ever opened read-only, one operation at a time.

pub mod body;
pub mod config;
pub mod error;
pub mod format;
pub mod logging;
pub mod reader;
pub mod resolve;
pub mod scan;
pub mod store;
pub mod validate;

pub use config::{ReaderConfig, ReaderContext};
pub use error::{BlockfileError, Result};
pub use format::{CacheAddr, CacheDataStream, CacheEntry, StreamKind};
pub use reader::{BlockfileCache, CacheFormat, EntryHandle};
pub use scan::{KeyIndex, KeyRecord};
