use crate::common::CacheFixture;
use blockcache::config::{ReaderConfig, ReaderContext};
use blockcache::format::{super_fast_hash, CacheAddr, FileType};
use blockcache::{BlockfileCache, BlockfileError, CacheFormat};
use std::fs::{self, OpenOptions};
use std::io::{Seek, SeekFrom, Write};

fn overwrite(path: &std::path::Path, offset: u64, bytes: &[u8]) {
    let mut file = OpenOptions::new().write(true).open(path).unwrap();
    file.seek(SeekFrom::Start(offset)).unwrap();
    file.write_all(bytes).unwrap();
}

#[test]
fn test_cycle_in_scan_is_corrupt() {
    let mut fixture = CacheFixture::new(8);
    let a = fixture.insert("https://a.example/", 1);
    let slot = fixture.slot_of("https://a.example/");
    let b = fixture.add_entry_with_hash("https://b.example/", slot, 2);
    fixture.append_to_slot(slot, b);
    fixture.link(b, a);
    let dir = fixture.build();

    let result = BlockfileCache::with_defaults().build_key_index(dir.path());
    assert!(matches!(result, Err(BlockfileError::CorruptIndex(_))));
}

#[test]
fn test_chain_longer_than_limit_is_corrupt() {
    let mut fixture = CacheFixture::new(4);
    for i in 0..10 {
        let addr = fixture.add_entry_with_hash(&format!("https://chain.test/{}", i), 1, i);
        fixture.append_to_slot(1, addr);
    }
    let dir = fixture.build();

    let strict = BlockfileCache::new(ReaderContext::new(ReaderConfig {
        max_chain_length: 5,
        ..Default::default()
    }));
    assert!(matches!(
        strict.build_key_index(dir.path()),
        Err(BlockfileError::CorruptIndex(_))
    ));

    let index = BlockfileCache::with_defaults()
        .build_key_index(dir.path())
        .unwrap();
    assert_eq!(index.len(), 10);
}

#[test]
fn test_missing_block_file_is_corrupt() {
    let mut fixture = CacheFixture::new(8);
    fixture.insert("https://example.com/", 1);
    let dir = fixture.build();
    fs::remove_file(dir.path().join("data_1")).unwrap();

    let result = BlockfileCache::with_defaults().build_key_index(dir.path());
    assert!(matches!(result, Err(BlockfileError::CorruptIndex(_))));
}

#[test]
fn test_block_file_with_bad_magic_is_corrupt() {
    let mut fixture = CacheFixture::new(8);
    fixture.insert("https://example.com/", 1);
    let dir = fixture.build();
    overwrite(&dir.path().join("data_1"), 0, &[0, 0, 0, 0]);

    let result = BlockfileCache::with_defaults().build_key_index(dir.path());
    assert!(matches!(result, Err(BlockfileError::CorruptIndex(_))));
}

#[test]
fn test_block_file_with_wrong_entry_size_is_corrupt() {
    let mut fixture = CacheFixture::new(8);
    fixture.insert("https://example.com/", 1);
    let dir = fixture.build();
    overwrite(&dir.path().join("data_1"), 12, &4096u32.to_le_bytes());

    let result = BlockfileCache::with_defaults().build_key_index(dir.path());
    assert!(matches!(result, Err(BlockfileError::CorruptIndex(_))));
}

#[test]
fn test_entry_address_in_wrong_storage_is_corrupt() {
    let key = "https://example.com/";
    let mut fixture = CacheFixture::new(8);
    let slot = fixture.slot_of(key);
    fixture.set_slot(slot, CacheAddr::for_block(FileType::Block1K, 2, 0, 1));
    let dir = fixture.build();

    let result = BlockfileCache::with_defaults().lookup(dir.path(), key);
    assert!(matches!(result, Err(BlockfileError::CorruptIndex(_))));
}

#[test]
fn test_oversized_stream_is_corrupt() {
    let key = "https://example.com/huge";
    let mut fixture = CacheFixture::new(8);
    let addr = fixture.insert(key, 1);
    let stream = fixture.add_external_stream(addr, 1, b"tiny");
    fixture.set_stream(addr, 1, 200 * 1024 * 1024, stream);
    let dir = fixture.build();

    let cache = BlockfileCache::with_defaults();
    let handle = cache.lookup(dir.path(), key).unwrap().unwrap();
    assert!(matches!(
        cache.fetch_body(&handle),
        Err(BlockfileError::CorruptIndex(_))
    ));
}

#[test]
fn test_stream_larger_than_its_blocks_is_corrupt() {
    let key = "https://example.com/";
    let mut fixture = CacheFixture::new(8);
    let addr = fixture.insert(key, 1);
    fixture.set_stream(addr, 1, 5000, CacheAddr::for_block(FileType::Block1K, 2, 0, 1));
    let dir = fixture.build();

    let cache = BlockfileCache::with_defaults();
    let handle = cache.lookup(dir.path(), key).unwrap().unwrap();
    let err = cache.fetch_body(&handle).unwrap_err();
    assert!(err.is_corruption());
}

#[test]
fn test_collision_with_different_key_is_not_a_match() {
    let key = "https://example.com/wanted";
    let mut fixture = CacheFixture::new(8);
    let slot = fixture.slot_of(key);
    // Same stored hash as the key being looked up, different key bytes.
    let impostor = fixture.add_entry_with_hash("https://example.com/impostor", super_fast_hash(key.as_bytes()), 1);
    fixture.append_to_slot(slot, impostor);
    let dir = fixture.build();

    let cache = BlockfileCache::with_defaults();
    assert!(cache.lookup(dir.path(), key).unwrap().is_none());

    let trusting = BlockfileCache::new(ReaderContext::new(ReaderConfig {
        verify_keys: false,
        ..Default::default()
    }));
    let handle = trusting.lookup(dir.path(), key).unwrap().unwrap();
    assert_eq!(handle.entry().key_str(), "https://example.com/impostor");
}

#[test]
fn test_oversized_table_length_is_an_error() {
    let key = "https://example.com/";
    let mut fixture = CacheFixture::new(64);
    fixture.insert(key, 1);
    let dir = fixture.build();
    // Header field 28 holds the slot count; claim far more slots than the file has.
    overwrite(&dir.path().join("index"), 28, &0x7FFF_FFFFu32.to_le_bytes());

    let cache = BlockfileCache::with_defaults();
    match cache.build_key_index(dir.path()) {
        Err(BlockfileError::Io { source, .. }) => {
            assert_eq!(source.kind(), std::io::ErrorKind::UnexpectedEof);
        }
        other => panic!("Expected Io error, got {:?}", other),
    }
    assert!(cache.lookup(dir.path(), key).is_err());
}
