use crate::common::{gzip, http_headers, CacheFixture};
use blockcache::config::{ReaderConfig, ReaderContext};
use blockcache::{BlockfileCache, CacheFormat};
use std::io::Write;
use tempfile::TempDir;

const KEY: &str = "https://example.com/app.js";

fn page(len: usize) -> Vec<u8> {
    (0..len).map(|i| b"abcdefghijklmnopqrstuvwxyz\n"[i % 27]).collect()
}

fn cache_with(encoding: Option<&str>, body: &[u8]) -> TempDir {
    let mut lines = vec!["HTTP/1.1 200 OK", "Content-Type: application/javascript"];
    let encoding_line;
    if let Some(encoding) = encoding {
        encoding_line = format!("Content-Encoding: {}", encoding);
        lines.push(&encoding_line);
    }
    let mut fixture = CacheFixture::new(64);
    let addr = fixture.insert(KEY, 1);
    fixture.add_stream(addr, 0, &http_headers(&lines));
    fixture.add_stream(addr, 1, body);
    fixture.build()
}

fn fetch(cache: &BlockfileCache, dir: &TempDir) -> Option<Vec<u8>> {
    let handle = cache.lookup(dir.path(), KEY).unwrap().unwrap();
    cache.fetch_body(&handle).unwrap()
}

#[test]
fn test_gzip_body_round_trip() {
    let plain = page(3000);
    let dir = cache_with(Some("gzip"), &gzip(&plain));
    assert_eq!(fetch(&BlockfileCache::with_defaults(), &dir), Some(plain));
}

#[test]
fn test_deflate_body() {
    let plain = page(800);
    let mut enc = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
    enc.write_all(&plain).unwrap();
    let dir = cache_with(Some("deflate"), &enc.finish().unwrap());

    assert_eq!(fetch(&BlockfileCache::with_defaults(), &dir), Some(plain));
}

#[test]
fn test_zstd_body() {
    let plain = page(2000);
    let compressed = zstd::stream::encode_all(plain.as_slice(), 3).unwrap();
    let dir = cache_with(Some("zstd"), &compressed);

    assert_eq!(fetch(&BlockfileCache::with_defaults(), &dir), Some(plain));
}

#[test]
fn test_identity_body_is_raw() {
    let plain = page(100);
    let dir = cache_with(None, &plain);
    assert_eq!(fetch(&BlockfileCache::with_defaults(), &dir), Some(plain));
}

#[test]
fn test_unknown_encoding_is_raw() {
    let dir = cache_with(Some("x-snappy"), b"opaque bytes");
    assert_eq!(
        fetch(&BlockfileCache::with_defaults(), &dir),
        Some(b"opaque bytes".to_vec())
    );
}

#[test]
fn test_large_body_in_external_file() {
    let plain = page(50_000);
    let dir = cache_with(None, &plain);
    assert!(dir.path().join("f_000001").exists());

    assert_eq!(fetch(&BlockfileCache::with_defaults(), &dir), Some(plain));
}

#[test]
fn test_short_external_file_returns_available_bytes() {
    let mut fixture = CacheFixture::new(16);
    let addr = fixture.insert(KEY, 1);
    let stream = fixture.add_external_stream(addr, 1, b"partial");
    // The writer has recorded more bytes than it has flushed.
    fixture.set_stream(addr, 1, 4096, stream);
    let dir = fixture.build();

    assert_eq!(
        fetch(&BlockfileCache::with_defaults(), &dir),
        Some(b"partial".to_vec())
    );
}

#[test]
fn test_entry_without_body() {
    let mut fixture = CacheFixture::new(16);
    let addr = fixture.insert(KEY, 1);
    fixture.add_stream(addr, 0, &http_headers(&["HTTP/1.1 204 No Content"]));
    let dir = fixture.build();

    assert_eq!(fetch(&BlockfileCache::with_defaults(), &dir), None);
}

#[test]
fn test_response_headers() {
    let dir = cache_with(Some("gzip"), &gzip(b"x"));
    let cache = BlockfileCache::with_defaults();
    let handle = cache.lookup(dir.path(), KEY).unwrap().unwrap();

    let headers = cache.response_headers(&handle).unwrap().unwrap();
    assert_eq!(headers.status_code(), Some(200));
    assert_eq!(headers.content_encoding(), Some("gzip"));
    assert_eq!(headers.get("CONTENT-TYPE"), Some("application/javascript"));
}

#[test]
fn test_read_stream_is_undecoded() {
    let compressed = gzip(&page(500));
    let dir = cache_with(Some("gzip"), &compressed);
    let cache = BlockfileCache::with_defaults();
    let handle = cache.lookup(dir.path(), KEY).unwrap().unwrap();

    assert_eq!(cache.read_stream(&handle, 1).unwrap(), Some(compressed));
    assert_eq!(cache.read_stream(&handle, 2).unwrap(), None);
}

#[test]
fn test_decoding_disabled_by_config() {
    let compressed = gzip(&page(500));
    let dir = cache_with(Some("gzip"), &compressed);
    let cache = BlockfileCache::new(ReaderContext::new(ReaderConfig {
        decode_bodies: false,
        ..Default::default()
    }));

    assert_eq!(fetch(&cache, &dir), Some(compressed));
}
