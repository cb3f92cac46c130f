//! Body extraction and transport decoding.
//!
//! A resolved entry's body is its first opaque
//! ([`StreamKind::Unknown`](crate::format::StreamKind::Unknown))
//! stream. If the entry also has a header stream declaring a
//! `Content-Encoding`, the raw body is decoded before being returned.
//!
//! Decoding never fails a lookup: an unknown coding, a body that does not
//! decode (typically because the owner is still writing it), or one that
//! expands past `max_decoded_size` yields the raw bytes with a warning.
//!
//! - [`headers`]: HTTP header block parsing
//! - [`decode`]: gzip/deflate/br/zstd decoders

pub mod decode;
pub mod headers;

pub use decode::ContentEncoding;
pub use headers::HttpHeaders;

use crate::config::ReaderContext;
use crate::error::Result;
use crate::format::CacheEntry;
use crate::store::RecordStore;

/// Fetch and decode the body of `entry`.
///
/// Returns `Ok(None)` if the entry has no body stream.
pub fn extract_body<S: RecordStore + ?Sized>(
    store: &S,
    entry: &CacheEntry,
    ctx: &ReaderContext,
) -> Result<Option<Vec<u8>>> {
    let Some(body_stream) = entry.body_stream() else {
        log::debug!(target: ctx.target(), "{} has no body stream", entry.key_str());
        return Ok(None);
    };
    let raw = store.read_stream(body_stream)?;

    if !ctx.config().decode_bodies {
        return Ok(Some(raw));
    }

    let Some(headers) = response_headers(store, entry)? else {
        return Ok(Some(raw));
    };
    let Some(value) = headers.content_encoding() else {
        return Ok(Some(raw));
    };

    let Some(encoding) = ContentEncoding::from_header(value) else {
        log::warn!(
            target: ctx.target(),
            "Unsupported content-encoding {:?} for {}; returning raw body",
            value,
            entry.key_str()
        );
        return Ok(Some(raw));
    };

    match encoding.decode(&raw, ctx.config().max_decoded_size) {
        Ok(decoded) => {
            log::trace!(
                target: ctx.target(),
                "Decoded {:?} body of {}: {} -> {} bytes",
                encoding,
                entry.key_str(),
                raw.len(),
                decoded.len()
            );
            Ok(Some(decoded))
        }
        Err(e) => {
            log::warn!(
                target: ctx.target(),
                "Failed to decode {:?} body of {}: {}; returning raw body",
                encoding,
                entry.key_str(),
                e
            );
            Ok(Some(raw))
        }
    }
}

/// Parse the entry's header stream, if it has one that holds HTTP headers.
pub fn response_headers<S: RecordStore + ?Sized>(
    store: &S,
    entry: &CacheEntry,
) -> Result<Option<HttpHeaders>> {
    match entry.header_stream() {
        Some(stream) => Ok(HttpHeaders::parse(&store.read_stream(stream)?)),
        None => Ok(None),
    }
}
