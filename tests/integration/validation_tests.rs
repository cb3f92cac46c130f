use crate::common::{CacheFixture, BLOCK_MAGIC, INDEX_MAGIC};
use blockcache::{BlockfileCache, CacheFormat};
use std::fs::{self, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use tempfile::tempdir;

fn flip_byte(path: &std::path::Path, offset: u64) {
    let bytes = fs::read(path).unwrap();
    let mut file = OpenOptions::new().write(true).open(path).unwrap();
    file.seek(SeekFrom::Start(offset)).unwrap();
    file.write_all(&[bytes[offset as usize] ^ 0xFF]).unwrap();
}

#[test]
fn test_fixture_is_recognized() {
    let dir = CacheFixture::new(16).build();
    assert!(BlockfileCache::with_defaults().is_cache_directory(dir.path()));
}

#[test]
fn test_magic_only_directory_is_recognized() {
    // Validation looks at nothing beyond the two magic numbers.
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("index"), INDEX_MAGIC.to_le_bytes()).unwrap();
    fs::write(dir.path().join("data_0"), BLOCK_MAGIC.to_le_bytes()).unwrap();
    assert!(BlockfileCache::with_defaults().is_cache_directory(dir.path()));
}

#[test]
fn test_flipping_any_index_magic_byte_rejects() {
    let cache = BlockfileCache::with_defaults();
    for offset in 0..4 {
        let dir = CacheFixture::new(16).build();
        flip_byte(&dir.path().join("index"), offset);
        assert!(!cache.is_cache_directory(dir.path()), "index byte {}", offset);
    }
}

#[test]
fn test_flipping_any_data_0_magic_byte_rejects() {
    let cache = BlockfileCache::with_defaults();
    for offset in 0..4 {
        let dir = CacheFixture::new(16).build();
        flip_byte(&dir.path().join("data_0"), offset);
        assert!(!cache.is_cache_directory(dir.path()), "data_0 byte {}", offset);
    }
}

#[test]
fn test_missing_data_0_rejects() {
    let dir = CacheFixture::new(16).build();
    fs::remove_file(dir.path().join("data_0")).unwrap();
    assert!(!BlockfileCache::with_defaults().is_cache_directory(dir.path()));
}

#[test]
fn test_nonexistent_path_rejects() {
    let cache = BlockfileCache::with_defaults();
    assert!(!cache.is_cache_directory(std::path::Path::new("/non/existent/cache/12345")));
}

#[test]
fn test_simple_cache_format_rejects() {
    // The "simple" cache backend uses an index file with a different magic.
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("index"), 0x656E_7465_7220_7265u64.to_le_bytes()).unwrap();
    fs::write(dir.path().join("data_0"), BLOCK_MAGIC.to_le_bytes()).unwrap();
    assert!(!BlockfileCache::with_defaults().is_cache_directory(dir.path()));
}
