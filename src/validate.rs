//! Cheap recognition of cache directories.
//!
//! Callers may probe many directories (every profile of every installed
//! browser), so the check reads exactly four bytes from each of two files
//! and never fails: anything unexpected is simply "not a cache".

use std::path::Path;

use crate::config::ReaderContext;
use crate::format::{BLOCK_MAGIC, INDEX_MAGIC};
use crate::store::disk::{read_exact_at, FIRST_BLOCK_FILE, INDEX_FILE};

/// Whether `path` is a blockfile cache directory.
///
/// True only if `path` is a directory whose `index` starts with
/// `0xC103CAC3` and whose `data_0` starts with `0xC104CAC3`
/// (little-endian).
///
/// # Example
///
/// ```no_run
/// use blockcache::config::ReaderContext;
/// use blockcache::validate::is_cache_directory;
/// use std::path::Path;
///
/// let ctx = ReaderContext::default();
/// if is_cache_directory(Path::new("/home/me/.cache/chromium/Default/Cache"), &ctx) {
///     println!("found a cache");
/// }
/// ```
#[must_use]
pub fn is_cache_directory(path: &Path, ctx: &ReaderContext) -> bool {
    if !path.is_dir() {
        log::debug!(target: ctx.target(), "{} is not a directory", path.display());
        return false;
    }
    magic_matches(&path.join(INDEX_FILE), INDEX_MAGIC, ctx)
        && magic_matches(&path.join(FIRST_BLOCK_FILE), BLOCK_MAGIC, ctx)
}

fn magic_matches(file: &Path, expected: u32, ctx: &ReaderContext) -> bool {
    match read_exact_at(file, 0, 4) {
        Ok(bytes) => {
            let found = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
            if found != expected {
                log::debug!(
                    target: ctx.target(),
                    "{}: magic {:#010x}, expected {:#010x}",
                    file.display(),
                    found,
                    expected
                );
            }
            found == expected
        }
        Err(e) => {
            log::debug!(target: ctx.target(), "{}", e);
            false
        }
    }
}
