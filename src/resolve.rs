//! Point lookup of a single key.
//!
//! The key's hash selects exactly one table slot; only that slot's chain is
//! walked. An empty slot answers "absent" without touching any block file.

use crate::config::ReaderContext;
use crate::error::Result;
use crate::format::{slot_for_hash, super_fast_hash, CacheEntry};
use crate::scan::ChainWalk;
use crate::store::RecordStore;

/// Resolve `key` to its entry record.
///
/// Records match on the stored hash; with
/// [`verify_keys`](crate::config::ReaderConfig::verify_keys) enabled the
/// stored key bytes must also equal `key`, so two keys whose hashes collide
/// are told apart.
///
/// # Errors
///
/// I/O failures and chain corruption (cycles, overlong chains, bad
/// addresses) are returned rather than reported as "not found".
pub fn lookup<S: RecordStore + ?Sized>(
    store: &S,
    key: &str,
    ctx: &ReaderContext,
) -> Result<Option<CacheEntry>> {
    let hash = super_fast_hash(key.as_bytes());
    let table_len = store.table_len()?;
    let slot = slot_for_hash(hash, table_len);
    let head = store.read_slot(slot)?;

    if !head.is_initialized() {
        log::trace!(target: ctx.target(), "Slot {} empty for {}", slot, key);
        return Ok(None);
    }

    let config = ctx.config();
    let mut walk = ChainWalk::new(store, head, config.max_chain_length);
    let mut found = None;
    for entry in walk.by_ref() {
        let entry = entry?;
        if entry.hash != hash {
            continue;
        }
        if config.verify_keys && entry.key != key.as_bytes() {
            log::debug!(
                target: ctx.target(),
                "Hash {:#010x} collision: wanted {}, found {}",
                hash,
                key,
                entry.key_str()
            );
            continue;
        }
        found = Some(entry);
        break;
    }

    match &found {
        Some(_) => log::trace!(
            target: ctx.target(),
            "Found {} in slot {} after {} records",
            key,
            slot,
            walk.steps()
        ),
        None => log::trace!(
            target: ctx.target(),
            "{} not in slot {} ({} records walked)",
            key,
            slot,
            walk.steps()
        ),
    }
    Ok(found)
}
